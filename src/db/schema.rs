//! Table definitions for the news store and the DDL rendered from them.
//!
//! The schema is a plain value: build it with [`Schema::news`] (or by hand)
//! and hand it to [`create_tables`]. Nothing registers itself globally.

use sqlx::{PgConnection, SqliteConnection};
use std::fmt::Write as _;
use std::future::Future;

/// SQL flavour used when rendering DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
    Binary,
    Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: &'static str,
    pub column: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
    pub primary_key: bool,
    pub nullable: bool,
    pub references: Option<ForeignKey>,
}

impl Column {
    /// A nullable column with no constraints.
    pub fn new(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            primary_key: false,
            nullable: true,
            references: None,
        }
    }

    /// Auto-assigned integer primary key.
    pub fn id() -> Self {
        Self {
            primary_key: true,
            nullable: false,
            ..Self::new("id", ColumnType::Integer)
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn references(mut self, table: &'static str, column: &'static str) -> Self {
        self.references = Some(ForeignKey { table, column });
        self
    }

    fn sql_type(&self, dialect: Dialect) -> &'static str {
        match (dialect, self.ty) {
            (Dialect::Postgres, ColumnType::Integer) if self.primary_key => "SERIAL",
            (_, ColumnType::Integer) => "INTEGER",
            (_, ColumnType::Text) => "VARCHAR",
            (Dialect::Postgres, ColumnType::Binary) => "BYTEA",
            (Dialect::Sqlite, ColumnType::Binary) => "BLOB",
            (Dialect::Postgres, ColumnType::Timestamp) => "TIMESTAMP WITHOUT TIME ZONE",
            (Dialect::Sqlite, ColumnType::Timestamp) => "DATETIME",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: &'static str,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: &'static str, columns: Vec<Column>) -> Self {
        Self { name, columns }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// `CREATE TABLE IF NOT EXISTS` statement for this table.
    pub fn create_statement(&self, dialect: Dialect) -> String {
        let mut lines: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let mut line = format!("{} {}", c.name, c.sql_type(dialect));
                if !c.nullable {
                    line.push_str(" NOT NULL");
                }
                line
            })
            .collect();

        let pk: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name)
            .collect();
        if !pk.is_empty() {
            lines.push(format!("PRIMARY KEY ({})", pk.join(", ")));
        }

        for c in &self.columns {
            if let Some(fk) = &c.references {
                lines.push(format!(
                    "FOREIGN KEY({}) REFERENCES {} ({})",
                    c.name, fk.table, fk.column
                ));
            }
        }

        let mut sql = String::new();
        let _ = write!(sql, "CREATE TABLE IF NOT EXISTS {} (\n    ", self.name);
        sql.push_str(&lines.join(",\n    "));
        sql.push_str("\n)");
        sql
    }
}

/// Ordered set of tables. Referenced tables must come before the tables
/// that point at them; no other validation is done.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    tables: Vec<Table>,
}

impl Schema {
    pub fn new(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    /// `sources` and `articles`.
    pub fn news() -> Self {
        Self::new(vec![
            Table::new(
                "sources",
                vec![Column::id(), Column::new("name", ColumnType::Text)],
            ),
            Table::new(
                "articles",
                vec![
                    Column::id(),
                    Column::new("url", ColumnType::Text),
                    Column::new("html", ColumnType::Binary),
                    Column::new("published", ColumnType::Timestamp),
                    Column::new("title", ColumnType::Text),
                    Column::new("body", ColumnType::Text),
                    Column::new("source_id", ColumnType::Integer)
                        .not_null()
                        .references("sources", "id"),
                ],
            ),
        ])
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn create_statements(&self, dialect: Dialect) -> Vec<String> {
        self.tables
            .iter()
            .map(|t| t.create_statement(dialect))
            .collect()
    }
}

/// A connection DDL can be run on.
pub trait SchemaTarget {
    const DIALECT: Dialect;

    fn execute_ddl(&mut self, sql: &str) -> impl Future<Output = Result<(), sqlx::Error>>;
}

impl SchemaTarget for PgConnection {
    const DIALECT: Dialect = Dialect::Postgres;

    async fn execute_ddl(&mut self, sql: &str) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(sql).execute(&mut *self).await?;
        Ok(())
    }
}

impl SchemaTarget for SqliteConnection {
    const DIALECT: Dialect = Dialect::Sqlite;

    async fn execute_ddl(&mut self, sql: &str) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(sql).execute(&mut *self).await?;
        Ok(())
    }
}

/// Create every table of `schema` that does not exist yet. Existing tables
/// are left untouched, even if their shape differs.
pub async fn create_tables<C: SchemaTarget>(
    schema: &Schema,
    conn: &mut C,
) -> Result<(), sqlx::Error> {
    for (table, stmt) in schema.tables().iter().zip(schema.create_statements(C::DIALECT)) {
        tracing::debug!(table = table.name, "ensuring table exists");
        conn.execute_ddl(&stmt).await?;
    }
    Ok(())
}
