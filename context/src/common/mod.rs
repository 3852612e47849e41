pub mod aligned;
mod error;

pub use error::{functions::*, ContextError, ContextErrorKind};
