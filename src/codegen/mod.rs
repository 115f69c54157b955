mod codegen;
mod error;
mod frame;

pub use codegen::*;
pub use error::*;
pub use frame::*;
