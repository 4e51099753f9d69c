// Library root: the service modules, shared by the binary and integration tests.

mod core;
pub mod app;
pub mod bootstrap;
pub mod http;
pub mod lex;
pub mod llm;
pub mod store;
pub mod tutor;

pub use self::core::{config, error};
pub use bootstrap::logger;
