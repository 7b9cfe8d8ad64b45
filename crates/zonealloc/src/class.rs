//! Size-class policy: the TINY/SMALL/LARGE split and zone sizing formula.

use crate::align::{align_up, ceil_to_pages, ALIGNMENT};
use crate::block::{per_block_size, HEADER_SIZE as BLOCK_HEADER_SIZE};
use crate::zone::HEADER_SIZE as ZONE_HEADER_SIZE;

/// Largest payload, in bytes, routed to the TINY zone list.
pub const TINY_MAX: usize = 128;

/// Largest payload, in bytes, routed to the SMALL zone list.
pub const SMALL_MAX: usize = 1024;

/// Every freshly created TINY/SMALL zone holds at least this many
/// maximum-class blocks.
pub const MIN_BLOCKS_PER_ZONE: usize = 100;

const _: () = assert!(TINY_MAX >= 16);
const _: () = assert!(SMALL_MAX > TINY_MAX);

/// Request classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Class {
    /// `n <= TINY_MAX`, served from a TINY zone.
    Tiny,
    /// `TINY_MAX < n <= SMALL_MAX`, served from a SMALL zone.
    Small,
    /// `n > SMALL_MAX`, served by a dedicated `mmap` region.
    Large,
}

/// Classifies a strictly positive request size.
///
/// Callers are responsible for handling `n == 0` before reaching here —
/// classification is only meaningful for real requests.
#[must_use]
pub const fn classify(n: usize) -> Class {
    if n <= TINY_MAX {
        Class::Tiny
    } else if n <= SMALL_MAX {
        Class::Small
    } else {
        Class::Large
    }
}

/// Maximum payload a zone of this class may hold.
///
/// # Panics
///
/// Panics for [`Class::Large`], which has no fixed maximum — LARGE
/// requests are sized individually by [`large_mapping_size`].
#[must_use]
pub const fn class_max_payload(class: Class) -> usize {
    match class {
        Class::Tiny => TINY_MAX,
        Class::Small => SMALL_MAX,
        Class::Large => unreachable!("LARGE has no fixed class maximum"),
    }
}

/// Bytes needed for one maximum-size block of `class`, header included.
#[must_use]
pub const fn per_block(class: Class) -> usize {
    per_block_size(class_max_payload(class))
}

/// Total region size for a freshly created zone of `class`, rounded up to
/// a whole number of pages and large enough for at least
/// [`MIN_BLOCKS_PER_ZONE`] maximum-size blocks.
#[must_use]
pub fn zone_size(class: Class, page_size: usize) -> usize {
    let target = ZONE_HEADER_SIZE + MIN_BLOCKS_PER_ZONE * per_block(class);
    ceil_to_pages(target, page_size)
}

/// Total `mmap` region size for a LARGE request of `n` bytes.
#[must_use]
pub fn large_mapping_size(n: usize, page_size: usize) -> usize {
    ceil_to_pages(BLOCK_HEADER_SIZE + align_up(n, ALIGNMENT), page_size)
}
