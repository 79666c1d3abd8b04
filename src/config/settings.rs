//! Application settings loading from config.toml
//!
//! Settings come from two places: an optional TOML file (default categories seeded for
//! new users, background queue sizing) and the environment (`DATABASE_URL`, `CONFIG_PATH`).
//! A missing file is not an error; every setting has a built-in default.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Default location of the settings file
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Categories created for every newly registered user unless overridden
pub const DEFAULT_CATEGORIES: [&str; 10] = [
    "Produce",
    "Dairy",
    "Meat",
    "Bakery",
    "Beverages",
    "Personal Care",
    "Cleaning",
    "Frozen",
    "Pantry",
    "Cereals",
];

const DEFAULT_QUEUE_CAPACITY: usize = 64;

fn default_categories() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(ToString::to_string).collect()
}

const fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

/// Resolved application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database URL, taken from `DATABASE_URL` rather than the file
    #[serde(skip)]
    pub database_url: String,
    /// Category names seeded for each new user
    #[serde(default = "default_categories")]
    pub default_categories: Vec<String>,
    /// Maximum number of pending background jobs
    #[serde(default = "default_queue_capacity")]
    pub background_queue_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: super::database::get_database_url(),
            default_categories: default_categories(),
            background_queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Loads settings from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A field has the wrong type
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    let mut config = parse_config(&contents)?;
    config.database_url = super::database::get_database_url();
    Ok(config)
}

/// Parses settings from TOML text. `database_url` is left empty.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;

    if config.background_queue_capacity == 0 {
        return Err(Error::Config {
            message: "background_queue_capacity must be at least 1".to_string(),
        });
    }
    Ok(config)
}

/// Loads the application configuration from `CONFIG_PATH` (or `./config.toml`),
/// falling back to defaults when the file does not exist.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    if Path::new(&path).exists() {
        let config = load_config(&path)?;
        info!(
            "Loaded configuration from {} ({} default categories)",
            path,
            config.default_categories.len()
        );
        Ok(config)
    } else {
        info!("No configuration file at {}, using defaults", path);
        Ok(AppConfig::default())
    }
}
