//! Wait for the database to come up, then hand out a [`Database`] handle.

use backon::{BackoffBuilder, Retryable};
use std::future::Future;
use std::io::ErrorKind;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::{DatabaseConfig, RetryPolicy};
use crate::db::{Database, Schema};
use crate::error::NewsDbError;

// Postgres SQLSTATE codes that mean "try again later".
const INVALID_CATALOG_NAME: &str = "3D000";
const CANNOT_CONNECT_NOW: &str = "57P03";
const TOO_MANY_CONNECTIONS: &str = "53300";

/// Waits `increment`, `2 * increment`, ... between attempts.
#[derive(Debug, Clone, Copy)]
pub struct LinearBuilder {
    increment: Duration,
    max_attempts: u32,
}

impl LinearBuilder {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            increment: policy.wait_increment,
            max_attempts: policy.max_attempts.max(1),
        }
    }
}

impl BackoffBuilder for LinearBuilder {
    type Backoff = LinearBackoff;

    fn build(self) -> Self::Backoff {
        LinearBackoff {
            increment: self.increment,
            retries_left: self.max_attempts - 1,
            step: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LinearBackoff {
    increment: Duration,
    retries_left: u32,
    step: u32,
}

impl Iterator for LinearBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.retries_left == 0 {
            return None;
        }
        self.retries_left -= 1;
        self.step += 1;
        Some(self.increment.checked_mul(self.step).unwrap_or(Duration::MAX))
    }
}

/// Outcome of one connection attempt.
#[derive(Debug)]
pub enum Attempt<T> {
    Ready(T),
    NotYetAvailable(String),
    Fatal(NewsDbError),
}

impl<T> Attempt<T> {
    /// Sort a connect error into retryable or not.
    pub fn from_connect_error(err: sqlx::Error) -> Self {
        if is_transient(&err) {
            Attempt::NotYetAvailable(err.to_string())
        } else {
            Attempt::Fatal(err.into())
        }
    }
}

fn is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(io) => !matches!(
            io.kind(),
            ErrorKind::InvalidInput | ErrorKind::PermissionDenied
        ),
        sqlx::Error::PoolTimedOut | sqlx::Error::Tls(_) => true,
        sqlx::Error::Database(db) => matches!(
            db.code().as_deref(),
            Some(INVALID_CATALOG_NAME | CANNOT_CONNECT_NOW | TOO_MANY_CONNECTIONS)
        ),
        _ => false,
    }
}

#[derive(Debug)]
enum AttemptError {
    Pending { attempt: u32, reason: String },
    Fatal(NewsDbError),
}

impl AttemptError {
    fn is_pending(&self) -> bool {
        matches!(self, AttemptError::Pending { .. })
    }
}

/// Run `attempt` until it reports [`Attempt::Ready`], sleeping per `policy`
/// after every [`Attempt::NotYetAvailable`]. A [`Attempt::Fatal`] outcome
/// ends the loop at once. The closure receives the 1-based attempt number.
pub async fn retry_until_ready<T, F, Fut>(
    policy: RetryPolicy,
    mut attempt: F,
) -> Result<T, NewsDbError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut count = 0u32;

    let result = (|| {
        count += 1;
        let current = count;
        let outcome = attempt(current);
        async move {
            match outcome.await {
                Attempt::Ready(value) => Ok(value),
                Attempt::NotYetAvailable(reason) => Err(AttemptError::Pending {
                    attempt: current,
                    reason,
                }),
                Attempt::Fatal(e) => Err(AttemptError::Fatal(e)),
            }
        }
    })
    .retry(LinearBuilder::new(policy))
    .when(AttemptError::is_pending)
    .notify(|err: &AttemptError, wait: Duration| {
        if let AttemptError::Pending { attempt, reason } = err {
            warn!(
                attempt,
                max_attempts,
                wait_secs = wait.as_secs(),
                reason = %reason,
                "could not connect to database; waiting to reattempt"
            );
        }
    })
    .await;

    match result {
        Ok(value) => Ok(value),
        Err(AttemptError::Pending { attempt, reason }) => {
            error!(attempts = attempt, reason = %reason, "giving up on database");
            Err(NewsDbError::Unreachable {
                attempts: attempt,
                reason,
            })
        }
        Err(AttemptError::Fatal(e)) => {
            error!(error = %e, "database rejected connection");
            Err(e)
        }
    }
}

/// Check existence, then open and close one connection.
pub async fn probe(db: &Database) -> Attempt<()> {
    match db.exists().await {
        Ok(true) => {}
        Ok(false) => {
            let reason = format!("database {} does not exist yet", db.name());
            return Attempt::NotYetAvailable(reason);
        }
        Err(e) => return Attempt::from_connect_error(e),
    }
    match db.connect().await {
        Ok(conn) => {
            // Only reachability matters here.
            let _ = sqlx::Connection::close(conn).await;
            Attempt::Ready(())
        }
        Err(e) => Attempt::from_connect_error(e),
    }
}

/// Block until the configured database accepts connections.
pub async fn connect(cfg: &DatabaseConfig) -> Result<Database, NewsDbError> {
    let db = Database::new(cfg);
    info!(url = %cfg.redacted_url(), "connecting to database");
    let target = &db;
    retry_until_ready(cfg.retry_policy(), move |n| async move {
        let outcome = probe(target).await;
        if matches!(outcome, Attempt::Ready(())) {
            info!(attempt = n, "database is reachable");
        }
        outcome
    })
    .await?;
    Ok(db)
}

/// [`connect`] and create any missing table of `schema`.
pub async fn init(cfg: &DatabaseConfig, schema: &Schema) -> Result<Database, NewsDbError> {
    let db = connect(cfg).await?;
    db.init(schema).await?;
    Ok(db)
}
