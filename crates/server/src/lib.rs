//! pinup server library.
//!
//! This library exposes the server internals for integration testing.
//! The main entry point for running the server is the `pinup` binary.

pub mod config;
pub mod error;
pub mod file;
pub mod metrics;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use routes::app;
pub use state::AppState;
