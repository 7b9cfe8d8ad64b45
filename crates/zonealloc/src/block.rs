//! The allocation unit: a header immediately followed by the user payload.
//!
//! `BlockHeader` is shared by TINY, SMALL, and LARGE allocations. For
//! TINY/SMALL it is one slot inside a `ZoneHeader`'s intrusive list; for
//! LARGE it is the sole block inside its own `mmap` region (`next` is
//! always null and `zone` is always null).

use crate::align::{align_up, ALIGNMENT};
use crate::zone::ZoneHeader;

/// Header prepended to every allocation.
///
/// `#[repr(C)]` with a fixed field order so `HEADER_SIZE` is stable and,
/// crucially, a multiple of [`ALIGNMENT`] — the payload that immediately
/// follows a header is therefore 16-byte aligned as long as the block's
/// start address is, which zone layout guarantees (see `zone.rs`).
#[repr(C)]
pub struct BlockHeader {
    /// Bytes the caller requested, rounded up to the alignment unit.
    pub payload_size: usize,
    /// `true` if this slot is free and reusable.
    pub is_free: bool,
    /// Next block in the same zone's address-ordered list, or null.
    pub next: *mut BlockHeader,
    /// Owning zone, or null for a LARGE block.
    pub zone: *mut ZoneHeader,
}

/// Size of [`BlockHeader`] including its tail padding.
pub const HEADER_SIZE: usize = std::mem::size_of::<BlockHeader>();

const _: () = assert!(HEADER_SIZE % ALIGNMENT == 0);

impl BlockHeader {
    /// Bytes occupied by this block: header plus padded payload.
    #[must_use]
    pub const fn total_size(&self) -> usize {
        HEADER_SIZE + self.payload_size
    }

    /// Address of the payload, immediately after the header.
    ///
    /// # Safety
    ///
    /// `header` must point at a valid, initialized `BlockHeader`.
    #[must_use]
    pub unsafe fn payload_ptr(header: *mut BlockHeader) -> *mut u8 {
        unsafe { header.cast::<u8>().add(HEADER_SIZE) }
    }

    /// Recovers the header pointer from a payload pointer.
    ///
    /// # Safety
    ///
    /// `payload` must have been produced by [`BlockHeader::payload_ptr`] on
    /// a still-live header — the caller is responsible for proving that
    /// (the arena scan in `arena.rs` does this before ever calling this
    /// function) since this performs no validation.
    #[must_use]
    pub unsafe fn header_ptr(payload: *mut u8) -> *mut BlockHeader {
        unsafe { payload.sub(HEADER_SIZE).cast::<BlockHeader>() }
    }
}

/// Bytes needed to store one block of at most `max_payload` bytes,
/// header included, rounded to the alignment unit.
#[must_use]
pub const fn per_block_size(max_payload: usize) -> usize {
    HEADER_SIZE + align_up(max_payload, ALIGNMENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_size_is_alignment_multiple() {
        assert_eq!(HEADER_SIZE % ALIGNMENT, 0);
        assert!(HEADER_SIZE > 0);
    }

    #[test]
    fn payload_and_header_ptr_roundtrip() {
        let mut header = BlockHeader {
            payload_size: 64,
            is_free: false,
            next: std::ptr::null_mut(),
            zone: std::ptr::null_mut(),
        };
        let header_ptr: *mut BlockHeader = &mut header;
        let payload = unsafe { BlockHeader::payload_ptr(header_ptr) };
        assert_eq!(payload as usize, header_ptr as usize + HEADER_SIZE);
        let back = unsafe { BlockHeader::header_ptr(payload) };
        assert_eq!(back, header_ptr);
    }
}
