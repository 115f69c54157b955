use thiserror::Error;

use crate::parser::{Location, NodeId};

/// Inputs the generator cannot handle. Apart from `TooManyArguments` and
/// `FrameOverflow`, each one means it was handed a tree the analyzer did not
/// accept.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CodegenError {
    #[error("no symbol table was recorded for scope {0:?}")]
    MissingScope(NodeId),

    #[error("symbol '{0}' is not visible to the code generator")]
    UnresolvedSymbol(String),

    #[error("expression at {0} has no resolved type")]
    UntypedExpression(Location),

    #[error("target at {0} is not a variable reference")]
    NonVariableTarget(Location),

    #[error("'{0}' is too large to be addressed")]
    ObjectTooLarge(String),

    #[error("locals up to '{0}' overflow the frame offsets")]
    FrameOverflow(String),

    #[error("'{name}' takes {count} arguments, at most {max} are supported")]
    TooManyArguments {
        name: String,
        count: usize,
        max: usize,
    },

    #[error("'{0}' was used before a frame slot was assigned to it")]
    UnassignedOffset(String),
}
