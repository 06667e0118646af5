pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::Cli;

pub use adapters::{n8n::N8nClient, storage::LocalStorage};
pub use app::Tracker;
pub use config::AppConfig;
pub use utils::error::{Result, TrackerError};
