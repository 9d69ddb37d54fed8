//! Basic blocks: ordered, exclusively-owned instruction sequences.
//!
//! A block stores instruction ids only; everything that needs the value arena
//! (successor resolution, sequence mutation, terminator inspection) goes
//! through the owning [`crate::function::Function`], which keeps ownership
//! transfers explicit instead of hiding them in property setters.
use slotmap::new_key_type;

use crate::value::ValueId;

new_key_type! {
    /// Stable generational id of a block within one function's arena.
    ///
    /// Ids are never reused: once a block is removed, its id resolves to
    /// nothing forever, so a stale reference (for instance a function's
    /// `entry` after the entry block was removed) is inert rather than
    /// dangling.
    pub struct BlockId;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    pub(crate) name: String,
    pub(crate) insns: Vec<ValueId>,
}

impl BasicBlock {
    pub(crate) fn new(name: String) -> Self {
        BasicBlock {
            name,
            insns: Vec::new(),
        }
    }

    /// Name unique within the owning function.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attached instructions in execution order.
    pub fn insns(&self) -> &[ValueId] {
        &self.insns
    }

    pub fn len(&self) -> usize {
        self.insns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insns.is_empty()
    }

    pub fn contains(&self, insn: ValueId) -> bool {
        self.insns.contains(&insn)
    }

    /// Position of `insn` in the sequence, if attached here.
    pub fn position(&self, insn: ValueId) -> Option<usize> {
        self.insns.iter().position(|&id| id == insn)
    }

    /// The last instruction of the sequence. By convention this is the
    /// block's terminator; the container does not enforce it.
    pub fn terminator(&self) -> Option<ValueId> {
        self.insns.last().copied()
    }
}
