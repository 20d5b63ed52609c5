//! Structured logging setup shared by the training and serving binaries.

mod format;

pub use format::StructuredLogger;
