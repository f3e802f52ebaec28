//! Principals and their access rules.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::prelude::{AccessCheck, BasePathFs};
use regex::Regex;

use crate::state::{RuleConfig, UserConfig};

#[derive(Debug, Clone)]
enum Matcher {
    /// Matches the path itself and everything underneath it
    Path(String),
    Regex(Regex),
}

#[derive(Debug, Clone)]
pub struct Rule {
    allow: bool,
    matcher: Matcher,
}

impl Rule {
    pub fn compile(config: &RuleConfig) -> Result<Self, RuleError> {
        let matcher = match (&config.path, &config.regex) {
            (Some(path), None) => Matcher::Path(common::path::slash_clean(path)),
            (None, Some(pattern)) => Matcher::Regex(Regex::new(pattern)?),
            _ => return Err(RuleError::Ambiguous),
        };
        Ok(Self {
            allow: config.allow,
            matcher,
        })
    }

    fn matches(&self, path: &str) -> bool {
        match &self.matcher {
            Matcher::Path(prefix) if prefix == "/" => true,
            Matcher::Path(prefix) => {
                path == prefix
                    || path
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
            Matcher::Regex(re) => re.is_match(path),
        }
    }
}

/// Ordered rules; the last one that matches decides. No match allows.
#[derive(Debug, Clone, Default)]
pub struct RuleSet(Vec<Rule>);

impl RuleSet {
    pub fn compile<'a>(
        rules: impl IntoIterator<Item = &'a RuleConfig>,
    ) -> Result<Self, RuleError> {
        rules
            .into_iter()
            .map(Rule::compile)
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl AccessCheck for RuleSet {
    fn check(&self, path: &str) -> bool {
        self.0
            .iter()
            .rev()
            .find(|rule| rule.matches(path))
            .map_or(true, |rule| rule.allow)
    }
}

#[derive(Debug)]
pub struct User {
    pub id: u64,
    pub username: String,
    /// Canonical directory under the served root
    pub scope: String,
    pub download: bool,
    pub rules: RuleSet,
}

impl User {
    /// Host directory this user's paths are relative to.
    pub fn home(&self, root: &Path) -> PathBuf {
        root.join(self.scope.trim_start_matches('/'))
    }

    pub fn filesystem(&self, root: &Path) -> BasePathFs {
        BasePathFs::new(self.home(root))
    }
}

/// Token-indexed user directory.
#[derive(Debug, Default)]
pub struct Users {
    by_token: HashMap<String, Arc<User>>,
}

impl Users {
    /// Compile every user, appending their own rules after `global`.
    pub fn compile(global: &[RuleConfig], users: &[UserConfig]) -> Result<Self, RuleError> {
        let mut by_token = HashMap::new();
        for config in users {
            let rules = RuleSet::compile(global.iter().chain(config.rules.iter()))?;
            let user = User {
                id: config.id,
                username: config.username.clone(),
                scope: common::path::slash_clean(&config.scope),
                download: config.download,
                rules,
            };
            if by_token
                .insert(config.token.clone(), Arc::new(user))
                .is_some()
            {
                return Err(RuleError::DuplicateToken(config.username.clone()));
            }
        }
        Ok(Self { by_token })
    }

    pub fn authenticate(&self, token: &str) -> Option<Arc<User>> {
        self.by_token.get(token).cloned()
    }

    /// Look a user up by id, for requests that carry no token.
    pub fn find(&self, id: u64) -> Option<Arc<User>> {
        self.by_token.values().find(|user| user.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("a rule needs exactly one of `path` or `regex`")]
    Ambiguous,
    #[error("invalid rule regex: {0}")]
    Regex(#[from] regex::Error),
    #[error("token of user {0} is already taken")]
    DuplicateToken(String),
}
