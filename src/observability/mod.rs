//! Observability for the engine
//!
//! Structured JSON logging only; metrics and tracing surfaces belong to the
//! service shell.

mod logger;

pub use logger::{Logger, Severity};
