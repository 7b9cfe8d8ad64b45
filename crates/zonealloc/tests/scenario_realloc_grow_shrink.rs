//! `realloc` growing across the SMALL/LARGE boundary preserves the prefix,
//! and shrinking back down to zero releases the block.

use zonealloc::allocator::{allocate, reallocate};

#[test]
fn grow_to_large_preserves_prefix_then_shrinks_to_null() {
    let p = allocate(100);
    assert!(!p.is_null());
    unsafe {
        std::ptr::write_bytes(p, 0xAB, 100);
    }

    let q = reallocate(p, 3000);
    assert!(!q.is_null());
    let prefix = unsafe { std::slice::from_raw_parts(q, 100) };
    assert!(prefix.iter().all(|&b| b == 0xAB));

    let r = reallocate(q, 32);
    assert!(!r.is_null());

    let s = reallocate(r, 0);
    assert!(s.is_null());
}
