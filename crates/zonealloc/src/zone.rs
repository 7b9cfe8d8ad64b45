//! A page-aligned region holding every block of a single size class.
//!
//! A zone is one `mmap` region: a [`ZoneHeader`] followed by a run of
//! contiguous [`BlockHeader`]s in address order — the intrusive singly
//! linked list the arena walks on every allocation and release.

use crate::align::ALIGNMENT;
use crate::block::{BlockHeader, HEADER_SIZE as BLOCK_HEADER_SIZE};
use crate::class::{zone_size, Class};

/// Metadata at the start of every TINY/SMALL zone.
#[repr(C)]
pub struct ZoneHeader {
    /// Size class every block in this zone belongs to.
    pub class: Class,
    /// Total bytes of the mapped region, a multiple of the page size.
    pub region_size: usize,
    /// First block in the address-ordered intrusive list.
    pub first_block: *mut BlockHeader,
    /// Next zone of the same class in the arena, or null.
    pub next_zone: *mut ZoneHeader,
}

/// Size of [`ZoneHeader`] including its tail padding.
pub const HEADER_SIZE: usize = std::mem::size_of::<ZoneHeader>();

const _: () = assert!(HEADER_SIZE % ALIGNMENT == 0);

/// Maps a fresh zone for `class` and carves it into one free block
/// spanning the whole usable area.
///
/// Returns null if the OS mapping call fails.
pub fn create(class: Class) -> *mut ZoneHeader {
    let page_size = sys_alloc::page_size();
    let region_size = zone_size(class, page_size);

    let mapped = unsafe {
        sys_alloc::MmapOptions::new()
            .len(region_size)
            .map_anon()
    };
    let Ok(mapping) = mapped else {
        tracing::warn!(region_size, "zone mmap failed");
        return std::ptr::null_mut();
    };

    let (base, mapped_size) = mapping.into_raw();
    debug_assert_eq!(mapped_size, region_size);
    let zone = base.cast::<ZoneHeader>();
    let first_block = unsafe { base.add(HEADER_SIZE).cast::<BlockHeader>() };
    let usable = region_size - HEADER_SIZE;

    unsafe {
        zone.write(ZoneHeader {
            class,
            region_size,
            first_block,
            next_zone: std::ptr::null_mut(),
        });
        first_block.write(BlockHeader {
            payload_size: usable - BLOCK_HEADER_SIZE,
            is_free: true,
            next: std::ptr::null_mut(),
            zone,
        });
    }

    tracing::debug!(?class, region_size, "zone created");
    zone
}

/// Unmaps a zone's entire region, returning it to the OS.
///
/// # Safety
///
/// `zone` must be a currently mapped zone header produced by [`create`],
/// with no live references to it or its blocks remaining.
pub unsafe fn destroy(zone: *mut ZoneHeader) {
    let region_size = unsafe { (*zone).region_size };
    let mapping = unsafe { sys_alloc::Mmap::from_raw(zone.cast::<u8>(), region_size) };
    drop(mapping);
    tracing::debug!(region_size, "zone destroyed");
}

/// First-fit search: the first free block whose padded payload is at
/// least `padded_size` bytes, in address order.
///
/// # Safety
///
/// `zone` must be a valid, currently mapped zone header.
pub unsafe fn find_fit(zone: *mut ZoneHeader, padded_size: usize) -> *mut BlockHeader {
    let mut current = unsafe { (*zone).first_block };
    while !current.is_null() {
        let block = unsafe { &*current };
        if block.is_free && block.payload_size >= padded_size {
            return current;
        }
        current = block.next;
    }
    std::ptr::null_mut()
}

/// Splits `block` if its leftover padded payload (after serving
/// `padded_size`) is large enough to host its own header plus at least one
/// alignment unit of payload. Inserts the remainder as a new free block
/// immediately after `block` in the list.
///
/// # Safety
///
/// `block` must be a valid, free block with `payload_size >= padded_size`.
pub unsafe fn split_if_worthwhile(block: *mut BlockHeader, padded_size: usize) {
    let remainder = unsafe { (*block).payload_size } - padded_size;
    if remainder < BLOCK_HEADER_SIZE + ALIGNMENT {
        return;
    }

    unsafe {
        let zone = (*block).zone;
        let new_block_ptr = BlockHeader::payload_ptr(block)
            .add(padded_size)
            .cast::<BlockHeader>();
        new_block_ptr.write(BlockHeader {
            payload_size: remainder - BLOCK_HEADER_SIZE,
            is_free: true,
            next: (*block).next,
            zone,
        });
        (*block).next = new_block_ptr;
        (*block).payload_size = padded_size;
    }
}

/// Merges `block` with its immediate successor if that successor is also
/// free. Forward-only: sufficient because the list is address-ordered and
/// every release walks forward from the freed block, so predecessors pick
/// up the merge on their own release.
///
/// # Safety
///
/// `block` must be a valid, currently free block in its zone's list.
pub unsafe fn coalesce_forward(block: *mut BlockHeader) {
    unsafe {
        let next = (*block).next;
        if next.is_null() || !(*next).is_free {
            return;
        }
        (*block).payload_size += BLOCK_HEADER_SIZE + (*next).payload_size;
        (*block).next = (*next).next;
    }
}

/// Whether a zone's entire block list has collapsed to a single free
/// block spanning the whole usable payload area.
///
/// # Safety
///
/// `zone` must be a valid, currently mapped zone header.
#[must_use]
pub unsafe fn is_single_free_block(zone: *mut ZoneHeader) -> bool {
    unsafe {
        let first = (*zone).first_block;
        if first.is_null() || !(*first).is_free || !(*first).next.is_null() {
            return false;
        }
        let usable = (*zone).region_size - HEADER_SIZE;
        (*first).payload_size == usable - BLOCK_HEADER_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::align_up;

    #[test]
    fn create_yields_one_free_block_spanning_the_zone() {
        let zone = create(Class::Tiny);
        assert!(!zone.is_null());
        unsafe {
            assert!(is_single_free_block(zone));
            destroy(zone);
        }
    }

    #[test]
    fn find_fit_split_and_coalesce_roundtrip() {
        let zone = create(Class::Tiny);
        assert!(!zone.is_null());
        unsafe {
            let requested = align_up(32, ALIGNMENT);
            let block = find_fit(zone, requested);
            assert!(!block.is_null());
            let original_payload = (*block).payload_size;
            split_if_worthwhile(block, requested);
            assert_eq!((*block).payload_size, requested);
            (*block).is_free = false;

            // A remainder block should exist and be free, since the zone
            // is far larger than one TINY block.
            let remainder = (*block).next;
            assert!(!remainder.is_null());
            assert!((*remainder).is_free);
            assert_eq!(
                (*block).payload_size + BLOCK_HEADER_SIZE + (*remainder).payload_size,
                original_payload
            );

            // Freeing and coalescing forward restores a single free block.
            (*block).is_free = true;
            coalesce_forward(block);
            assert!(is_single_free_block(zone));

            destroy(zone);
        }
    }

    #[test]
    fn zone_header_size_is_alignment_multiple() {
        assert_eq!(HEADER_SIZE % ALIGNMENT, 0);
    }
}
