use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum NewsDbError {
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[error("could not connect to database after {attempts} attempts: {reason}")]
    Unreachable { attempts: u32, reason: String },
}

impl NewsDbError {
    /// True for errors raised before any connection was attempted.
    pub fn is_config(&self) -> bool {
        matches!(self, NewsDbError::Config(_))
    }
}
