use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{ConnectOptions, Connection, Postgres, Transaction};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::db::schema::{self, Schema};
use crate::error::NewsDbError;

/// Databases every PostgreSQL server ships with, tried in order when
/// checking whether the target exists.
const MAINTENANCE_DATABASES: [&str; 2] = ["postgres", "template1"];

/// Handle to a reachable database. Holds no connections: every
/// [`connect`](Self::connect) opens a new physical one.
#[derive(Debug, Clone)]
pub struct Database {
    options: PgConnectOptions,
    name: String,
}

impl Database {
    pub fn new(cfg: &DatabaseConfig) -> Self {
        let mut options = PgConnectOptions::new()
            .host(&cfg.host)
            .port(cfg.port)
            .username(&cfg.user)
            .password(&cfg.password)
            .database(&cfg.name);
        if !cfg.echo {
            options = options.disable_statement_logging();
        }
        Self {
            options,
            name: cfg.name.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn connect(&self) -> Result<PgConnection, sqlx::Error> {
        PgConnection::connect_with(&self.options).await
    }

    /// Whether the target database has been created on the server.
    pub async fn exists(&self) -> Result<bool, sqlx::Error> {
        let [primary, fallback] = MAINTENANCE_DATABASES;
        match database_exists(&self.options.clone().database(primary), &self.name).await {
            Ok(found) => Ok(found),
            Err(e) => {
                debug!(maintenance = primary, error = %e, "existence check failed");
                database_exists(&self.options.clone().database(fallback), &self.name).await
            }
        }
    }

    /// Start a new unit of work on its own connection.
    pub async fn session(&self) -> Result<Session, NewsDbError> {
        let conn = self.connect().await?;
        Ok(Session { conn })
    }

    /// Create the tables of `schema` that are missing.
    pub async fn init(&self, schema: &Schema) -> Result<(), NewsDbError> {
        let mut conn = self.connect().await?;
        schema::create_tables(schema, &mut conn).await?;
        conn.close().await?;
        info!(database = %self.name, tables = schema.tables().len(), "schema ready");
        Ok(())
    }
}

async fn database_exists(opts: &PgConnectOptions, name: &str) -> Result<bool, sqlx::Error> {
    let mut conn = PgConnection::connect_with(opts).await?;
    let row: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM pg_database WHERE datname = $1")
        .bind(name)
        .fetch_optional(&mut conn)
        .await?;
    conn.close().await?;
    Ok(row.is_some())
}

/// One unit of work. Owns a single connection that is closed on drop.
#[derive(Debug)]
pub struct Session {
    conn: PgConnection,
}

impl Session {
    pub async fn begin(&mut self) -> Result<Transaction<'_, Postgres>, NewsDbError> {
        Ok(self.conn.begin().await?)
    }

    /// Connection for reads and writes outside a transaction.
    pub fn connection(&mut self) -> &mut PgConnection {
        &mut self.conn
    }

    pub async fn close(self) -> Result<(), NewsDbError> {
        self.conn.close().await?;
        Ok(())
    }
}
