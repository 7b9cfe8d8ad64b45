//! A multi-megabyte request takes the LARGE path: one `mmap` per
//! allocation, returned to the OS immediately on release.

use zonealloc::allocator::{allocate, release};

#[test]
fn large_allocation_is_aligned_and_unmaps_on_release() {
    let p = allocate(5_000_000);
    assert!(!p.is_null());
    assert_eq!(p as usize % 16, 0);
    release(p);
}

#[test]
fn repeated_large_alloc_free_does_not_leak_mappings() {
    // Each iteration maps and immediately unmaps; if release failed to
    // unmap, a later allocation would eventually fail as address space or
    // page tables got exhausted. 64 rounds of 8 MiB is enough to catch a
    // gross leak without making the test itself slow.
    for _ in 0..64 {
        let p = allocate(8 * 1024 * 1024);
        assert!(!p.is_null());
        release(p);
    }
}
