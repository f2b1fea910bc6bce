//! Core types, serialization, and validation for the chat log exporter.

pub mod error;
pub mod events;
pub mod limits;
pub mod partition;
pub mod serializer;

pub use error::{Error, Result, ValidationErrorCode};
pub use events::*;
pub use partition::*;
pub use serializer::*;
