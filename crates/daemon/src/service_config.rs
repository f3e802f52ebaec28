use std::path::PathBuf;

use crate::state::{AppConfig, RuleConfig, StateError, UserConfig};

#[derive(Debug, Clone)]
pub struct Config {
    // http server configuration
    /// Port for the HTTP server
    pub port: u16,

    // served content
    /// Host directory exposed to users, each confined to their scope below it
    pub root: PathBuf,
    pub users: Vec<UserConfig>,
    /// Rules every user inherits ahead of their own
    pub rules: Vec<RuleConfig>,
    /// Fallback origin for playlist links
    pub base_url: Option<String>,

    // data store configuration
    /// a path to a sqlite database, if not set then an
    ///  in-memory database will be used
    pub sqlite_path: Option<PathBuf>,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}

impl Config {
    /// Service configuration for a loaded state directory.
    pub fn from_app_config(
        app: &AppConfig,
        sqlite_path: Option<PathBuf>,
    ) -> Result<Self, StateError> {
        Ok(Self {
            port: app.port,
            root: app.root.clone(),
            users: app.users.clone(),
            rules: app.rules.clone(),
            base_url: app.base_url.clone(),
            sqlite_path,
            log_level: app.log_level()?,
            log_dir: None,
        })
    }
}
