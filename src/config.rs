use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::error::NewsDbError;

/// URL scheme of the assembled connection string.
pub const SCHEME: &str = "postgresql";

/// Prefix shared by every database environment variable.
pub const ENV_PREFIX: &str = "DATABASE_";

/// Keys taken from the environment exactly as written, never parsed.
const VERBATIM_KEYS: [&str; 4] = ["user", "password", "host", "name"];

fn default_max_attempts() -> u32 {
    10
}

fn default_wait_increment() -> u64 {
    3
}

fn default_loglevel() -> String {
    "info".to_string()
}

/// Everything the bootstrap needs to reach the database.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub name: String,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Seconds added to the wait after every failed attempt.
    #[serde(default = "default_wait_increment")]
    pub wait_increment: u64,
    /// Log every statement sent to the server.
    #[serde(default)]
    pub echo: bool,
}

/// Explicit values that take precedence over the environment.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DatabaseOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl DatabaseConfig {
    /// Load from `DATABASE_*` environment variables.
    pub fn from_env() -> Result<Self, NewsDbError> {
        Self::load(DatabaseOverrides::default())
    }

    /// Load from the environment, letting `overrides` win field by field.
    /// Fails with [`NewsDbError::Config`] when a required value is absent
    /// from both.
    pub fn load(overrides: DatabaseOverrides) -> Result<Self, NewsDbError> {
        let verbatim: BTreeMap<String, String> = Env::prefixed(ENV_PREFIX)
            .iter()
            .map(|(key, value)| (key.as_str().to_ascii_lowercase(), value))
            .filter(|(key, _)| VERBATIM_KEYS.contains(&key.as_str()))
            .collect();

        let cfg = Figment::new()
            .merge(Env::prefixed(ENV_PREFIX).ignore(&VERBATIM_KEYS))
            .merge(Serialized::defaults(verbatim))
            .merge(Serialized::defaults(overrides))
            .extract()?;
        Ok(cfg)
    }

    /// `postgresql://<user>:<password>@<host>:<port>/<name>`, values inserted verbatim.
    pub fn connection_url(&self) -> String {
        format!(
            "{}://{}:{}@{}:{}/{}",
            SCHEME, self.user, self.password, self.host, self.port, self.name
        )
    }

    /// Same as [`connection_url`](Self::connection_url) with the password masked.
    pub fn redacted_url(&self) -> String {
        format!(
            "{}://{}:***@{}:{}/{}",
            SCHEME, self.user, self.host, self.port, self.name
        )
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            wait_increment: Duration::from_secs(self.wait_increment),
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("user", &self.user)
            .field("password", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("max_attempts", &self.max_attempts)
            .field("wait_increment", &self.wait_increment)
            .field("echo", &self.echo)
            .finish()
    }
}

/// How many times to try and how fast the wait grows between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub wait_increment: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            wait_increment: Duration::from_secs(default_wait_increment()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LogConfig {
    #[serde(default = "default_loglevel")]
    loglevel: String,
}

/// Fallback log filter used by the binary when `RUST_LOG` is unset.
pub fn loglevel() -> String {
    Figment::new()
        .merge(Env::raw().only(&["loglevel"]))
        .extract::<LogConfig>()
        .map(|c| c.loglevel)
        .unwrap_or_else(|_| default_loglevel())
}
