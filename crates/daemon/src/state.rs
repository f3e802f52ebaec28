use std::str::FromStr;
use std::{fs, path::PathBuf};

use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "stash";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DB_FILE_NAME: &str = "db.sqlite";

/// On-disk configuration, `config.toml` inside the state directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port the HTTP server listens on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Host directory served to every user
    pub root: PathBuf,
    /// Default log level, overridable through `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Origin used for playlist links when a request names none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Access rules applied to every user before their own
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    pub id: u64,
    pub username: String,
    /// API token presented as `Authorization: Bearer <token>` or `X-Auth`
    pub token: String,
    /// Directory under `root` this user is confined to
    #[serde(default = "default_scope")]
    pub scope: String,
    /// Whether the user may download raw content and exports
    #[serde(default = "default_download")]
    pub download: bool,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// One access rule. Exactly one of `path` or `regex` should be set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub allow: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_scope() -> String {
    "/".to_string()
}

fn default_download() -> bool {
    true
}

impl AppConfig {
    /// A config serving `root` with a single administrator holding `token`.
    pub fn new(root: PathBuf, token: String) -> Self {
        Self {
            port: default_port(),
            root,
            log_level: default_log_level(),
            base_url: None,
            rules: Vec::new(),
            users: vec![UserConfig {
                id: 1,
                username: "admin".to_string(),
                token,
                scope: default_scope(),
                download: true,
                rules: Vec::new(),
            }],
        }
    }

    pub fn log_level(&self) -> Result<tracing::Level, StateError> {
        tracing::Level::from_str(&self.log_level)
            .map_err(|_| StateError::InvalidLogLevel(self.log_level.clone()))
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the state directory (~/.stash)
    pub stash_dir: PathBuf,
    /// Path to the SQLite database
    pub db_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the state directory path (custom or default ~/.stash)
    pub fn stash_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new state directory
    pub fn init(custom_path: Option<PathBuf>, config: AppConfig) -> Result<Self, StateError> {
        let stash_dir = Self::stash_dir(custom_path)?;
        if stash_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }
        fs::create_dir_all(&stash_dir)?;

        let config_path = stash_dir.join(CONFIG_FILE_NAME);
        fs::write(&config_path, toml::to_string_pretty(&config)?)?;

        // The service runs migrations on first start
        let db_path = stash_dir.join(DB_FILE_NAME);
        fs::write(&db_path, "")?;

        Ok(Self {
            stash_dir,
            db_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the state directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let stash_dir = Self::stash_dir(custom_path)?;
        if !stash_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let db_path = stash_dir.join(DB_FILE_NAME);
        let config_path = stash_dir.join(CONFIG_FILE_NAME);

        if !db_path.exists() {
            return Err(StateError::MissingFile(DB_FILE_NAME.to_string()));
        }
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            stash_dir,
            db_path,
            config_path,
            config,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("stash directory not initialized. Run 'stash init' first")]
    NotInitialized,

    #[error("stash directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let stash_dir = dir.path().join("state");
        let mut config = AppConfig::new(PathBuf::from("/srv/files"), "secret".into());
        config.rules.push(RuleConfig {
            allow: false,
            path: None,
            regex: Some(r"/\.".into()),
        });

        AppState::init(Some(stash_dir.clone()), config.clone()).unwrap();
        let state = AppState::load(Some(stash_dir.clone())).unwrap();
        assert_eq!(state.config.root, config.root);
        assert_eq!(state.config.users, config.users);
        assert_eq!(state.config.rules, config.rules);

        let again = AppState::init(Some(stash_dir), config);
        assert!(matches!(again, Err(StateError::AlreadyInitialized)));
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: AppConfig = toml::from_str(
            r#"
            root = "/data"

            [[users]]
            id = 7
            username = "guest"
            token = "t"
            download = false

            [[users.rules]]
            allow = false
            path = "/private"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.log_level().unwrap(), tracing::Level::INFO);
        let user = &config.users[0];
        assert_eq!(user.scope, "/");
        assert!(!user.download);
        assert_eq!(user.rules[0].path.as_deref(), Some("/private"));
    }

    #[test]
    fn test_load_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppState::load(Some(dir.path().join("nope"))).unwrap_err();
        assert!(matches!(err, StateError::NotInitialized));
    }
}
