//! The process-global zone/block registry and its single serializing lock.

use parking_lot::Mutex;

use crate::block::BlockHeader;
use crate::class::Class;
use crate::zone::ZoneHeader;

/// Ordered lists of live TINY zones, SMALL zones, and standalone LARGE
/// blocks. Every list is an intrusive singly linked list through
/// `next_zone`/`next` — never a `Vec`, since heap-allocating here would
/// route back through the very `malloc` this crate implements.
pub struct Arena {
    tiny_zones: *mut ZoneHeader,
    small_zones: *mut ZoneHeader,
    large_blocks: *mut BlockHeader,
}

// The arena is only ever touched through `GLOBAL_ARENA`'s mutex.
unsafe impl Send for Arena {}

impl Arena {
    const fn new() -> Self {
        Self {
            tiny_zones: std::ptr::null_mut(),
            small_zones: std::ptr::null_mut(),
            large_blocks: std::ptr::null_mut(),
        }
    }

    fn zone_list_head(&self, class: Class) -> *mut ZoneHeader {
        match class {
            Class::Tiny => self.tiny_zones,
            Class::Small => self.small_zones,
            Class::Large => unreachable!("LARGE has no zone list"),
        }
    }

    fn set_zone_list_head(&mut self, class: Class, head: *mut ZoneHeader) {
        match class {
            Class::Tiny => self.tiny_zones = head,
            Class::Small => self.small_zones = head,
            Class::Large => unreachable!("LARGE has no zone list"),
        }
    }

    /// First zone of `class` in arena order, or null.
    #[must_use]
    pub fn zones(&self, class: Class) -> *mut ZoneHeader {
        self.zone_list_head(class)
    }

    /// Appends `zone` to the end of its class's list, preserving arena
    /// order (oldest zone first).
    ///
    /// # Safety
    ///
    /// `zone` must be a freshly created zone not already linked anywhere.
    pub unsafe fn push_zone(&mut self, class: Class, zone: *mut ZoneHeader) {
        let head = self.zone_list_head(class);
        if head.is_null() {
            self.set_zone_list_head(class, zone);
            return;
        }
        let mut tail = head;
        unsafe {
            while !(*tail).next_zone.is_null() {
                tail = (*tail).next_zone;
            }
            (*tail).next_zone = zone;
        }
    }

    /// Unlinks `zone` from its class's list.
    ///
    /// # Safety
    ///
    /// `zone` must currently be linked in `class`'s list.
    pub unsafe fn unlink_zone(&mut self, class: Class, zone: *mut ZoneHeader) {
        let head = self.zone_list_head(class);
        if head == zone {
            self.set_zone_list_head(class, unsafe { (*zone).next_zone });
            return;
        }
        let mut prev = head;
        unsafe {
            while !prev.is_null() && (*prev).next_zone != zone {
                prev = (*prev).next_zone;
            }
            if !prev.is_null() {
                (*prev).next_zone = (*zone).next_zone;
            }
        }
    }

    /// Number of zones currently linked for `class`. Used by the
    /// debug-only introspection exports, never the hot path.
    #[must_use]
    pub fn zone_count(&self, class: Class) -> usize {
        let mut count = 0;
        let mut current = self.zone_list_head(class);
        while !current.is_null() {
            count += 1;
            current = unsafe { (*current).next_zone };
        }
        count
    }

    /// First LARGE block in arena order, or null.
    #[must_use]
    pub fn large_blocks(&self) -> *mut BlockHeader {
        self.large_blocks
    }

    /// Appends `block` to the end of the LARGE list.
    ///
    /// # Safety
    ///
    /// `block` must be a freshly mapped LARGE block not already linked.
    pub unsafe fn push_large(&mut self, block: *mut BlockHeader) {
        if self.large_blocks.is_null() {
            self.large_blocks = block;
            return;
        }
        let mut tail = self.large_blocks;
        unsafe {
            while !(*tail).next.is_null() {
                tail = (*tail).next;
            }
            (*tail).next = block;
        }
    }

    /// Unlinks `block` from the LARGE list.
    ///
    /// # Safety
    ///
    /// `block` must currently be linked in the LARGE list.
    pub unsafe fn unlink_large(&mut self, block: *mut BlockHeader) {
        if self.large_blocks == block {
            self.large_blocks = unsafe { (*block).next };
            return;
        }
        let mut prev = self.large_blocks;
        unsafe {
            while !prev.is_null() && (*prev).next != block {
                prev = (*prev).next;
            }
            if !prev.is_null() {
                (*prev).next = (*block).next;
            }
        }
    }

    /// Finds the block whose payload address equals `ptr`, without ever
    /// dereferencing `ptr` itself as a header.
    ///
    /// For TINY/SMALL, a zone's mapped range is checked before its block
    /// list is walked, so a foreign or misaligned pointer is rejected by a
    /// bounds comparison, never by reading through it. Returns `None` for
    /// any pointer the arena does not recognize — the caller (`release`,
    /// `reallocate`) treats that as a no-op, never a crash.
    #[must_use]
    pub fn locate(&self, ptr: *mut u8) -> Option<*mut BlockHeader> {
        let addr = ptr as usize;

        for class in [Class::Tiny, Class::Small] {
            let mut zone = self.zone_list_head(class);
            while !zone.is_null() {
                let zone_ref = unsafe { &*zone };
                let region_start = zone as usize;
                let region_end = region_start + zone_ref.region_size;
                if addr >= region_start && addr < region_end {
                    let mut block = zone_ref.first_block;
                    while !block.is_null() {
                        let payload = unsafe { BlockHeader::payload_ptr(block) };
                        if payload == ptr {
                            return Some(block);
                        }
                        block = unsafe { (*block).next };
                    }
                    // Inside this zone's region but not at any payload
                    // boundary: a foreign/misaligned pointer.
                    return None;
                }
                zone = zone_ref.next_zone;
            }
        }

        let mut block = self.large_blocks;
        while !block.is_null() {
            let payload = unsafe { BlockHeader::payload_ptr(block) };
            if payload == ptr {
                return Some(block);
            }
            block = unsafe { (*block).next };
        }

        None
    }
}

/// The single process-global lock guarding the entire arena. Statically
/// initialized — `parking_lot::Mutex::new` is `const`, so there is no lazy
/// first-use flag to race on.
pub static GLOBAL_ARENA: Mutex<Arena> = Mutex::new(Arena::new());
