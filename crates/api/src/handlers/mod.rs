//! Request handlers, one module per concern.

pub mod records;
pub mod system;

pub use crate::AppState;
