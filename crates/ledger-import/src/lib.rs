//! Fill-history importer.
//!
//! Reads raw exchange fills, reconstructs position lifecycles and persists
//! closed positions plus a snapshot of what is still open.

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
