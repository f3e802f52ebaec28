use std::path::{Path, PathBuf};
use std::sync::Arc;

use url::Url;

use crate::database::{Database, DatabaseSetupError};
use crate::service_config::Config;
use crate::users::{RuleError, Users};

/// Shared service state handed to every request
#[derive(Clone)]
pub struct State {
    database: Database,
    root: Arc<PathBuf>,
    users: Arc<Users>,
    base_url: Option<Arc<str>>,
}

impl State {
    pub async fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        // 1. Setup database
        let sqlite_database_url = match config.sqlite_path {
            Some(ref path) => {
                if !path.exists() {
                    return Err(StateSetupError::DatabasePathDoesNotExist);
                }
                Url::parse(&format!("sqlite://{}", path.display()))
                    .map_err(|_| StateSetupError::InvalidDatabaseUrl)
            }
            // otherwise just set up an in-memory database
            None => Url::parse("sqlite::memory:").map_err(|_| StateSetupError::InvalidDatabaseUrl),
        }?;
        tracing::info!("Database URL: {:?}", sqlite_database_url);
        let database = Database::connect(&sqlite_database_url).await?;

        // 2. Served root
        if !config.root.is_dir() {
            return Err(StateSetupError::RootNotADirectory(config.root.clone()));
        }

        // 3. Users and their rules
        let users = Users::compile(&config.rules, &config.users)?;
        if users.is_empty() {
            tracing::warn!("no users configured, every API request will be rejected");
        }
        tracing::info!(root = %config.root.display(), users = users.len(), "serving");

        Ok(Self {
            database,
            root: Arc::new(config.root.clone()),
            users: Arc::new(users),
            base_url: config.base_url.as_deref().map(Arc::from),
        })
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn users(&self) -> &Users {
        &self.users
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }
}

impl AsRef<Database> for State {
    fn as_ref(&self) -> &Database {
        self.database()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("Database path does not exist")]
    DatabasePathDoesNotExist,
    #[error("Database setup error")]
    DatabaseSetupError(#[from] DatabaseSetupError),
    #[error("Invalid database URL")]
    InvalidDatabaseUrl,
    #[error("served root is not a directory: {0}")]
    RootNotADirectory(PathBuf),
    #[error("invalid user configuration: {0}")]
    Users(#[from] RuleError),
}
