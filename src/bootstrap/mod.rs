//! Bootstrap layer: runs before the HTTP server starts.
//!
//! - **logger**: tracing-subscriber initialisation.

pub mod logger;
