//! The C-ABI forwarding layer. `malloc`/`free`/`realloc`/`show_alloc_mem`
//! are thin wrappers around the `ft_*_impl` entry points, so a host linking
//! directly against the implementation (bypassing whatever `libc` names
//! dynamic interposition may have shadowed) gets the same behavior.

use crate::allocator;

#[no_mangle]
pub extern "C" fn ft_malloc_impl(size: u64) -> *mut u8 {
    allocator::allocate(size as usize)
}

#[no_mangle]
pub extern "C" fn ft_free_impl(ptr: *mut u8) {
    allocator::release(ptr);
}

#[no_mangle]
pub extern "C" fn ft_realloc_impl(ptr: *mut u8, size: u64) -> *mut u8 {
    allocator::reallocate(ptr, size as usize)
}

#[no_mangle]
pub extern "C" fn ft_show_alloc_mem_impl() {
    allocator::dump();
}

#[no_mangle]
pub extern "C" fn malloc(size: usize) -> *mut u8 {
    ft_malloc_impl(size as u64)
}

#[no_mangle]
pub extern "C" fn free(ptr: *mut u8) {
    ft_free_impl(ptr);
}

#[no_mangle]
pub extern "C" fn realloc(ptr: *mut u8, size: usize) -> *mut u8 {
    ft_realloc_impl(ptr, size as u64)
}

#[no_mangle]
pub extern "C" fn show_alloc_mem() {
    ft_show_alloc_mem_impl();
}

#[cfg(debug_assertions)]
mod debug_exports {
    use crate::align::{align_up, ceil_to_pages, ALIGNMENT};
    use crate::allocator;
    use crate::arena::GLOBAL_ARENA;
    use crate::block::HEADER_SIZE as BLOCK_HEADER_SIZE;
    use crate::class::{Class, MIN_BLOCKS_PER_ZONE, SMALL_MAX, TINY_MAX};
    use crate::zone::{self, HEADER_SIZE as ZONE_HEADER_SIZE};

    fn class_from_i32(class: i32) -> Option<Class> {
        match class {
            1 => Some(Class::Tiny),
            2 => Some(Class::Small),
            3 => Some(Class::Large),
            _ => None,
        }
    }

    #[no_mangle]
    pub extern "C" fn ft_debug_alloc(size: i32) -> *mut u8 {
        if size < 0 {
            return std::ptr::null_mut();
        }
        allocator::allocate(size as usize)
    }

    #[no_mangle]
    pub extern "C" fn ft_debug_count_zones(class: i32) -> i32 {
        let Some(class) = class_from_i32(class) else {
            return -1;
        };
        let arena = GLOBAL_ARENA.lock();
        match class {
            Class::Large => {
                let mut count = 0;
                let mut block = arena.large_blocks();
                while !block.is_null() {
                    count += 1;
                    block = unsafe { (*block).next };
                }
                count
            }
            _ => arena.zone_count(class) as i32,
        }
    }

    #[no_mangle]
    pub extern "C" fn ft_debug_zone_roundtrip(class: i32) -> i64 {
        let Some(class) = class_from_i32(class) else {
            return -1;
        };
        if class == Class::Large {
            return -1;
        }
        let zone = zone::create(class);
        if zone.is_null() {
            return -1;
        }
        let ok = unsafe { zone::is_single_free_block(zone) };
        unsafe { zone::destroy(zone) };
        i64::from(ok)
    }

    #[no_mangle]
    pub extern "C" fn ft_page_size() -> i32 {
        sys_alloc::page_size() as i32
    }

    #[no_mangle]
    pub extern "C" fn ft_align_up_test(x: i64, a: i32) -> i64 {
        align_up(x as usize, a as usize) as i64
    }

    #[no_mangle]
    pub extern "C" fn ft_ceil_pages_test(x: i64) -> i64 {
        ceil_to_pages(x as usize, sys_alloc::page_size()) as i64
    }

    #[no_mangle]
    pub extern "C" fn ft_zone_header_size() -> i32 {
        ZONE_HEADER_SIZE as i32
    }

    #[no_mangle]
    pub extern "C" fn ft_block_header_size() -> i32 {
        BLOCK_HEADER_SIZE as i32
    }

    #[no_mangle]
    pub extern "C" fn ft_alignment_const() -> i32 {
        ALIGNMENT as i32
    }

    /// # Safety
    ///
    /// `tiny_out` and `small_out` must each be null or point at a valid,
    /// writable `i32`.
    #[no_mangle]
    pub unsafe extern "C" fn ft_tiny_small_thresholds(tiny_out: *mut i32, small_out: *mut i32) {
        unsafe {
            if !tiny_out.is_null() {
                tiny_out.write(TINY_MAX as i32);
            }
            if !small_out.is_null() {
                small_out.write(SMALL_MAX as i32);
            }
        }
    }

    #[no_mangle]
    pub extern "C" fn ft_min_blocks_per_zone() -> i32 {
        MIN_BLOCKS_PER_ZONE as i32
    }
}
