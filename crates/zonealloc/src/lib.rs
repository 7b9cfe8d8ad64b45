//! A size-class, `mmap`-backed drop-in replacement for `malloc`/`free`/
//! `realloc`, plus a diagnostic `show_alloc_mem`, meant to be loaded into an
//! arbitrary host process via dynamic library interposition.
//!
//! Requests are routed by [`class::classify`] into one of three paths:
//! TINY and SMALL requests are served first-fit from a page-aligned
//! [`zone`], LARGE requests each get their own `mmap` region. Every zone
//! and block is a raw-pointer intrusive linked list rather than a `Vec` —
//! the whole hot path, up through [`allocator`], is free of any
//! heap-allocating standard library type, since this crate's own `malloc`
//! is what the host process (and the Rust runtime underneath it) would
//! otherwise call into recursively.
//!
//! [`arena`] holds the single process-global registry behind one
//! `parking_lot::Mutex`; [`allocator`] exposes the four lock-acquiring
//! entry points; [`shim`] re-exports them under their C-ABI names.

pub mod align;
pub mod allocator;
pub mod arena;
pub mod block;
pub mod class;
pub mod shim;
pub mod writer;
pub mod zone;
