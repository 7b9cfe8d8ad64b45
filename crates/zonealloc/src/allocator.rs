//! Lock-acquiring public entry points: `allocate`, `release`, `reallocate`,
//! `dump`. These back `ft_malloc_impl`/`ft_free_impl`/`ft_realloc_impl`/
//! `ft_show_alloc_mem_impl` at the ABI boundary (see `shim.rs`).

use crate::align::{align_up, ALIGNMENT};
use crate::arena::{Arena, GLOBAL_ARENA};
use crate::block::BlockHeader;
use crate::class::{classify, large_mapping_size, Class};
use crate::writer::DumpWriter;
use crate::zone;

/// Implements `malloc`: returns null for a zero-size request or on OS
/// mapping failure, otherwise a payload pointer aligned to
/// [`ALIGNMENT`](crate::align::ALIGNMENT) bytes.
#[must_use]
pub fn allocate(n: usize) -> *mut u8 {
    if n == 0 {
        return std::ptr::null_mut();
    }
    let padded = align_up(n, ALIGNMENT);
    let class = classify(n);

    let mut arena = GLOBAL_ARENA.lock();
    match class {
        Class::Tiny | Class::Small => unsafe { allocate_from_class(&mut arena, class, padded) },
        Class::Large => unsafe { allocate_large(&mut arena, padded) },
    }
}

unsafe fn allocate_from_class(arena: &mut Arena, class: Class, padded: usize) -> *mut u8 {
    let mut zone_ptr = arena.zones(class);
    while !zone_ptr.is_null() {
        let block = unsafe { zone::find_fit(zone_ptr, padded) };
        if !block.is_null() {
            unsafe {
                zone::split_if_worthwhile(block, padded);
                (*block).is_free = false;
                return BlockHeader::payload_ptr(block);
            }
        }
        zone_ptr = unsafe { (*zone_ptr).next_zone };
    }

    let new_zone = zone::create(class);
    if new_zone.is_null() {
        return std::ptr::null_mut();
    }
    unsafe { arena.push_zone(class, new_zone) };

    let block = unsafe { zone::find_fit(new_zone, padded) };
    debug_assert!(
        !block.is_null(),
        "a freshly created zone must fit one class-max request"
    );
    unsafe {
        zone::split_if_worthwhile(block, padded);
        (*block).is_free = false;
        BlockHeader::payload_ptr(block)
    }
}

unsafe fn allocate_large(arena: &mut Arena, padded: usize) -> *mut u8 {
    let page_size = sys_alloc::page_size();
    let mapping_size = large_mapping_size(padded, page_size);

    let mapped = unsafe { sys_alloc::MmapOptions::new().len(mapping_size).map_anon() };
    let Ok(mapping) = mapped else {
        tracing::warn!(mapping_size, "LARGE mmap failed");
        return std::ptr::null_mut();
    };

    let (base, mapped_size) = mapping.into_raw();
    debug_assert_eq!(mapped_size, mapping_size);
    let block = base.cast::<BlockHeader>();
    unsafe {
        block.write(BlockHeader {
            payload_size: padded,
            is_free: false,
            next: std::ptr::null_mut(),
            zone: std::ptr::null_mut(),
        });
        arena.push_large(block);
    }

    tracing::debug!(mapping_size, "LARGE block created");
    unsafe { BlockHeader::payload_ptr(block) }
}

/// Implements `free`: a no-op for a null, foreign/misaligned, or
/// already-free pointer — never crashes.
pub fn release(p: *mut u8) {
    if p.is_null() {
        return;
    }
    let mut arena = GLOBAL_ARENA.lock();
    let Some(block) = arena.locate(p) else {
        tracing::warn!("free() called with an unrecognized pointer");
        return;
    };
    unsafe { release_located(&mut arena, block) };
}

unsafe fn release_located(arena: &mut Arena, block: *mut BlockHeader) {
    if unsafe { (*block).is_free } {
        return;
    }

    let zone = unsafe { (*block).zone };
    if zone.is_null() {
        unsafe { arena.unlink_large(block) };
        let page_size = sys_alloc::page_size();
        let region_size = large_mapping_size(unsafe { (*block).payload_size }, page_size);
        let mapping = unsafe { sys_alloc::Mmap::from_raw(block.cast::<u8>(), region_size) };
        drop(mapping);
        tracing::debug!(region_size, "LARGE block released");
        return;
    }

    unsafe {
        (*block).is_free = true;
        zone::coalesce_forward(block);

        let class = (*zone).class;
        if zone::is_single_free_block(zone) && arena.zone_count(class) > 1 {
            arena.unlink_zone(class, zone);
            zone::destroy(zone);
        }
    }
}

/// Implements `realloc`.
///
/// `p == null` behaves as [`allocate`]; `n == 0` behaves as [`release`] and
/// returns null. Otherwise grows in place when the existing block already
/// fits, or allocates fresh, copies, and releases the old block.
#[must_use]
pub fn reallocate(p: *mut u8, n: usize) -> *mut u8 {
    if p.is_null() {
        return allocate(n);
    }
    if n == 0 {
        release(p);
        return std::ptr::null_mut();
    }

    let old_payload = {
        let arena = GLOBAL_ARENA.lock();
        let Some(block) = arena.locate(p) else {
            return std::ptr::null_mut();
        };
        unsafe { (*block).payload_size }
    };

    let padded = align_up(n, ALIGNMENT);
    if padded <= old_payload {
        return p;
    }

    let q = allocate(n);
    if q.is_null() {
        return std::ptr::null_mut();
    }
    unsafe {
        std::ptr::copy_nonoverlapping(p, q, old_payload.min(n));
    }
    release(p);
    q
}

/// Implements `show_alloc_mem`: prints TINY zones, then SMALL zones, then
/// LARGE blocks, each in arena order, followed by a grand total of all
/// USED payload bytes.
pub fn dump() {
    let arena = GLOBAL_ARENA.lock();
    let mut writer = DumpWriter::new();
    let mut total: usize = 0;

    for (label, class) in [("TINY", Class::Tiny), ("SMALL", Class::Small)] {
        let mut zone_ptr = arena.zones(class);
        while !zone_ptr.is_null() {
            writer.zone_header(label, zone_ptr as usize);

            let mut block = unsafe { (*zone_ptr).first_block };
            while !block.is_null() {
                let block_ref = unsafe { &*block };
                if !block_ref.is_free {
                    let start = unsafe { BlockHeader::payload_ptr(block) } as usize;
                    writer.block_line(start, block_ref.payload_size);
                    total += block_ref.payload_size;
                }
                block = block_ref.next;
            }

            zone_ptr = unsafe { (*zone_ptr).next_zone };
        }
    }

    let mut block = arena.large_blocks();
    while !block.is_null() {
        let block_ref = unsafe { &*block };
        writer.zone_header("LARGE", block as usize);
        let start = unsafe { BlockHeader::payload_ptr(block) } as usize;
        writer.block_line(start, block_ref.payload_size);
        total += block_ref.payload_size;
        block = block_ref.next;
    }

    writer.total_line(total);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_size_allocate_returns_null() {
        assert!(allocate(0).is_null());
    }

    #[test]
    fn release_of_null_is_a_no_op() {
        release(std::ptr::null_mut());
    }

    #[test]
    fn allocate_is_aligned_and_usable() {
        let p = allocate(64);
        assert!(!p.is_null());
        assert_eq!(p as usize % ALIGNMENT, 0);
        unsafe {
            std::ptr::write_bytes(p, 0xAB, 64);
        }
        release(p);
    }

    #[test]
    fn reallocate_null_behaves_as_allocate() {
        let p = reallocate(std::ptr::null_mut(), 48);
        assert!(!p.is_null());
        release(p);
    }

    #[test]
    fn reallocate_to_zero_frees_and_returns_null() {
        let p = allocate(48);
        assert!(!p.is_null());
        assert!(reallocate(p, 0).is_null());
    }

    #[test]
    fn grow_preserves_prefix_bytes() {
        let p = allocate(100);
        assert!(!p.is_null());
        unsafe {
            std::ptr::write_bytes(p, 0xAB, 100);
        }
        let q = reallocate(p, 3000);
        assert!(!q.is_null());
        let copied = unsafe { std::slice::from_raw_parts(q, 100) };
        assert!(copied.iter().all(|&b| b == 0xAB));
        release(q);
    }

    #[test]
    fn large_allocation_roundtrips() {
        let p = allocate(5_000_000);
        assert!(!p.is_null());
        assert_eq!(p as usize % ALIGNMENT, 0);
        release(p);
    }

    #[test]
    fn misaligned_free_is_rejected_without_corrupting_state() {
        let p = allocate(128);
        assert!(!p.is_null());
        release(unsafe { p.add(10) });
        release(p);
    }

    #[test]
    fn dump_does_not_panic_with_live_allocations() {
        let a = allocate(32);
        let b = allocate(5_000_000);
        dump();
        release(a);
        release(b);
    }
}
