//! Mutable in-memory SSA intermediate representation.
//!
//! The crate models a program as `Module` → `Function` → `BasicBlock` →
//! instruction, stored in generational arenas. Functions own their blocks and
//! values exclusively; blocks reference each other by name only, resolved
//! lazily through the owning function's name table, so renaming, copying or
//! removing a block never leaves a structural pointer dangling.
//!
//! Structural mutations notify an injectable [`observe::Observer`] so that
//! downstream passes can invalidate derived caches. The core itself performs
//! no locking: a single logical owner mutates a graph at a time, and
//! [`function::Function`]'s deep [`Clone`] exists precisely so callers can
//! hand isolated copies to concurrent passes.

pub mod block;
pub mod error;
pub mod function;
pub mod module;
pub mod observe;
pub mod types;
pub mod value;
