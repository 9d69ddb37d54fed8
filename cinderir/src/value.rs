//! Values stored in a function's arena.
//!
//! A [`Value`] is either a function [`Argument`] or an instruction ([`Insn`]).
//! Instructions carry their input operands as [`ValueId`]s into the owning
//! function's arena; control-flow targets are block *names*, never block ids,
//! and are resolved lazily through the owning function (see
//! [`crate::function::Function::successors`]).
use auto_enums::auto_enum;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;
use smallvec::SmallVec;
use strum::{EnumDiscriminants, EnumIs, EnumTryAs};

use crate::{block::BlockId, types::Type};

new_key_type! {
    /// Stable generational id of a value within one function's arena.
    pub struct ValueId;
}

/// A formal parameter of a function.
///
/// Arguments are created through [`crate::function::Function::new_argument`]
/// so their names run through the function's name allocator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Argument {
    pub(crate) name: String,
    pub ty: Type,
}

impl Argument {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The operation performed by an instruction.
///
/// The container does not interpret ordinary computations; it only needs to
/// know which instructions transfer control and where to. The generated
/// [`InsnOp`] discriminant is used for type-filtered iteration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, EnumDiscriminants)]
#[strum_discriminants(name(InsnOp))]
#[strum_discriminants(derive(Hash))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum InsnKind {
    /// Straight-line computation identified by a mnemonic; never transfers
    /// control.
    Compute { opcode: String },

    /// Select between incoming operands depending on the predecessor block.
    /// `blocks[i]` names the block operand `i` flows in from.
    Phi { blocks: Vec<String> },

    /// Unconditional transfer to the named block.
    Jump { target: String },

    /// Two-way conditional transfer; operand 0 is the condition.
    Branch {
        then_target: String,
        else_target: String,
    },

    /// Leave the function; operand 0, when present, is the returned value.
    Return,
}

impl InsnKind {
    /// Get the operation discriminant of this instruction kind.
    pub fn op(&self) -> InsnOp {
        self.into()
    }

    /// True for kinds that end a basic block.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            InsnKind::Jump { .. } | InsnKind::Branch { .. } | InsnKind::Return
        )
    }

    /// True for terminators that leave the function entirely.
    pub fn exits(&self) -> bool {
        matches!(self, InsnKind::Return)
    }

    /// The block names control may transfer to, in declaration order.
    #[auto_enum(Iterator)]
    pub fn successor_names(&self) -> impl Iterator<Item = &str> {
        match self {
            InsnKind::Jump { target } => std::iter::once(target.as_str()),
            InsnKind::Branch {
                then_target,
                else_target,
            } => [then_target.as_str(), else_target.as_str()].into_iter(),
            _ => std::iter::empty(),
        }
    }
}

/// An instruction: a named, typed operation consuming other values.
///
/// The `block` back-reference is maintained by the owning function's sequence
/// operations; an instruction is attached to at most one block at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Insn {
    pub(crate) name: String,
    pub ty: Type,
    pub kind: InsnKind,
    pub(crate) operands: SmallVec<[ValueId; 2]>,
    pub(crate) block: Option<BlockId>,
}

impl Insn {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The block this instruction is attached to, if any.
    pub fn block(&self) -> Option<BlockId> {
        self.block
    }

    pub fn operands(&self) -> &[ValueId] {
        &self.operands
    }

    /// Rewrite operands in place. The operand count is part of the
    /// instruction's meaning and cannot change through this view.
    pub fn operands_mut(&mut self) -> &mut [ValueId] {
        &mut self.operands
    }

    /// Replace the whole operand list.
    pub fn set_operands(&mut self, operands: impl IntoIterator<Item = ValueId>) {
        self.operands = operands.into_iter().collect();
    }

    pub fn is_terminator(&self) -> bool {
        self.kind.is_terminator()
    }

    pub fn exits(&self) -> bool {
        self.kind.exits()
    }
}

/// Any value a function's arena can hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, EnumTryAs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    Argument(Argument),
    Insn(Insn),
}

impl Value {
    /// Name unique within the owning function.
    pub fn name(&self) -> &str {
        match self {
            Value::Argument(argument) => &argument.name,
            Value::Insn(insn) => &insn.name,
        }
    }

    pub fn ty(&self) -> &Type {
        match self {
            Value::Argument(argument) => &argument.ty,
            Value::Insn(insn) => &insn.ty,
        }
    }

    /// Substitute `from` with `to` in this value's type.
    pub fn replace_type_with(&mut self, from: &Type, to: &Type) {
        match self {
            Value::Argument(argument) => argument.ty.replace(from, to),
            Value::Insn(insn) => insn.ty.replace(from, to),
        }
    }
}
