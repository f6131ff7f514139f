use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{Database, Encode, Executor, FromRow, IntoArguments, Type};

/// A publisher articles are scraped from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Source {
    pub id: i32,
    pub name: Option<String>,
}

/// One scraped news item. Every column but `source_id` may be empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Article {
    pub id: i32,
    pub url: Option<String>,
    pub html: Option<Vec<u8>>,
    pub published: Option<NaiveDateTime>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub source_id: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewSource {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewArticle {
    pub url: Option<String>,
    pub html: Option<Vec<u8>>,
    pub published: Option<NaiveDateTime>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub source_id: i32,
}

const SELECT_SOURCE: &str = "SELECT id, name FROM sources WHERE id = $1";

impl NewSource {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    pub async fn insert<'e, E, DB>(&self, executor: E) -> Result<Source, sqlx::Error>
    where
        DB: Database,
        E: Executor<'e, Database = DB>,
        for<'q> DB::Arguments<'q>: IntoArguments<'q, DB>,
        for<'q> String: Encode<'q, DB>,
        for<'q> Option<String>: Encode<'q, DB>,
        String: Type<DB>,
        for<'r> Source: FromRow<'r, DB::Row>,
    {
        sqlx::query_as::<DB, Source>("INSERT INTO sources (name) VALUES ($1) RETURNING id, name")
            .bind(self.name.clone())
            .fetch_one(executor)
            .await
    }
}

impl NewArticle {
    /// Empty article attached to `source_id`.
    pub fn for_source(source_id: i32) -> Self {
        Self {
            source_id,
            ..Default::default()
        }
    }

    /// Fails with a foreign-key violation when `source_id` points nowhere.
    pub async fn insert<'e, E, DB>(&self, executor: E) -> Result<Article, sqlx::Error>
    where
        DB: Database,
        E: Executor<'e, Database = DB>,
        for<'q> DB::Arguments<'q>: IntoArguments<'q, DB>,
        for<'q> String: Encode<'q, DB>,
        for<'q> Vec<u8>: Encode<'q, DB>,
        for<'q> NaiveDateTime: Encode<'q, DB>,
        for<'q> i32: Encode<'q, DB>,
        for<'q> Option<String>: Encode<'q, DB>,
        for<'q> Option<Vec<u8>>: Encode<'q, DB>,
        for<'q> Option<NaiveDateTime>: Encode<'q, DB>,
        String: Type<DB>,
        Vec<u8>: Type<DB>,
        NaiveDateTime: Type<DB>,
        i32: Type<DB>,
        for<'r> Article: FromRow<'r, DB::Row>,
    {
        sqlx::query_as::<DB, Article>(
            r#"
            INSERT INTO articles (url, html, published, title, body, source_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, url, html, published, title, body, source_id
            "#,
        )
        .bind(self.url.clone())
        .bind(self.html.clone())
        .bind(self.published)
        .bind(self.title.clone())
        .bind(self.body.clone())
        .bind(self.source_id)
        .fetch_one(executor)
        .await
    }
}

impl Source {
    pub async fn find<'e, E, DB>(executor: E, id: i32) -> Result<Option<Source>, sqlx::Error>
    where
        DB: Database,
        E: Executor<'e, Database = DB>,
        for<'q> DB::Arguments<'q>: IntoArguments<'q, DB>,
        for<'q> i32: Encode<'q, DB>,
        i32: Type<DB>,
        for<'r> Source: FromRow<'r, DB::Row>,
    {
        sqlx::query_as::<DB, Source>(SELECT_SOURCE)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Articles pointing at this source, oldest id first.
    pub async fn articles<'e, E, DB>(&self, executor: E) -> Result<Vec<Article>, sqlx::Error>
    where
        DB: Database,
        E: Executor<'e, Database = DB>,
        for<'q> DB::Arguments<'q>: IntoArguments<'q, DB>,
        for<'q> i32: Encode<'q, DB>,
        i32: Type<DB>,
        for<'r> Article: FromRow<'r, DB::Row>,
    {
        sqlx::query_as::<DB, Article>(
            r#"SELECT id, url, html, published, title, body, source_id
               FROM articles WHERE source_id = $1 ORDER BY id"#,
        )
        .bind(self.id)
        .fetch_all(executor)
        .await
    }
}

impl Article {
    pub async fn source<'e, E, DB>(&self, executor: E) -> Result<Source, sqlx::Error>
    where
        DB: Database,
        E: Executor<'e, Database = DB>,
        for<'q> DB::Arguments<'q>: IntoArguments<'q, DB>,
        for<'q> i32: Encode<'q, DB>,
        i32: Type<DB>,
        for<'r> Source: FromRow<'r, DB::Row>,
    {
        sqlx::query_as::<DB, Source>(SELECT_SOURCE)
            .bind(self.source_id)
            .fetch_one(executor)
            .await
    }
}
