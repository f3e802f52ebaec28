use std::path::PathBuf;

use clap::Args;
use uuid::Uuid;

use stash_daemon::state::{AppConfig, AppState, StateError};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Directory to serve (default: the current directory)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// HTTP server port
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let root = match &self.root {
            Some(root) => root.clone(),
            None => std::env::current_dir().map_err(StateError::from)?,
        };
        let root = root.canonicalize().map_err(StateError::from)?;
        let token = Uuid::new_v4().simple().to_string();

        let mut config = AppConfig::new(root, token);
        config.port = self.port;

        let state = AppState::init(ctx.config_path.clone(), config)?;
        let admin = &state.config.users[0];

        let output = format!(
            "Initialized stash directory at: {}\n\
             - Database: {}\n\
             - Config: {}\n\
             - Serving: {}\n\
             - Port: {}\n\
             - Admin token: {}",
            state.stash_dir.display(),
            state.db_path.display(),
            state.config_path.display(),
            state.config.root.display(),
            state.config.port,
            admin.token,
        );

        Ok(output)
    }
}
