/// Database connection and schema bootstrap
pub mod database;

/// Application settings loading from config.toml
pub mod settings;

pub use settings::{AppConfig, load_app_configuration};
