use strum::EnumIs;
use thiserror::Error;

#[derive(Debug, PartialEq, Eq, EnumIs, Error)]
pub enum Error {
    /// No function is registered in the module under the given name.
    #[error("function `{0}` is not found in the module")]
    FunctionNotFound(String),

    /// No basic block with the given name exists in the function. Also raised
    /// when a terminator declares a successor name with no matching block.
    #[error("basic block `{0}` is not found in the function")]
    BlockNotFound(String),

    /// The block id does not resolve in this function's arena, either because
    /// the block was removed or because the id belongs to another function.
    #[error("the referenced basic block is not owned by this function")]
    UnknownBlock,

    /// Block names are unique within a function.
    #[error("a basic block named `{0}` already exists in the function")]
    DuplicateBlockName(String),

    /// The reference instruction of an `insert_before`/`splice` call is not
    /// attached to any basic block of this function.
    #[error("the reference instruction is not attached to a basic block of this function")]
    InsnNotFound,

    /// The value id does not resolve in this function's arena.
    #[error("the referenced value is not present in this function")]
    UnknownValue,

    /// The argument list may only contain argument-kind values.
    #[error("argument list element at index {index} is not an argument value")]
    NotAnArgument { index: usize },

    /// Only instruction-kind values can be attached to a basic block.
    #[error("the referenced value is not an instruction")]
    NotAnInsn,
}
