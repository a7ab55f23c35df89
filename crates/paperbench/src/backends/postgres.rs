//! PostgreSQL backend.
//!
//! Papers are normalized into `papers`, `authors` and `categories` with
//! `paper_authors` / `paper_categories` junction tables. The sqlx pool is
//! driven by an owned Tokio runtime so every call blocks the caller.

use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tokio::runtime::Runtime;
use tracing::info;

use crate::config::{PROBE_PREFIX, PROBE_TITLE};
use crate::error::{BenchError, StoreResult};
use crate::paper::{Paper, PaperSnapshot};

use super::{Store, StoreKind};

/// Relational schema, created on connect when missing.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS papers (
    id TEXT PRIMARY KEY,
    title TEXT,
    abstract TEXT,
    doi TEXT,
    submitter TEXT,
    update_date DATE
);

CREATE TABLE IF NOT EXISTS authors (
    author_id SERIAL PRIMARY KEY,
    author_name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS categories (
    category_id SERIAL PRIMARY KEY,
    category_name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS paper_authors (
    paper_id TEXT NOT NULL REFERENCES papers(id) ON DELETE CASCADE,
    author_id INTEGER NOT NULL REFERENCES authors(author_id) ON DELETE CASCADE,
    PRIMARY KEY (paper_id, author_id)
);

CREATE TABLE IF NOT EXISTS paper_categories (
    paper_id TEXT NOT NULL REFERENCES papers(id) ON DELETE CASCADE,
    category_id INTEGER NOT NULL REFERENCES categories(category_id) ON DELETE CASCADE,
    PRIMARY KEY (paper_id, category_id)
);
"#;

/// Name of the transient full-text index.
const TEXT_INDEX: &str = "idx_papers_abstract_gin";

/// PostgreSQL store adapter.
pub struct PostgresBackend {
    pool: PgPool,
    rt: Runtime,
}

impl PostgresBackend {
    /// Connect and make sure the schema exists.
    pub fn connect(database_url: &str) -> Result<Self, BenchError> {
        let connection_error = |source| BenchError::Connection {
            store: StoreKind::Postgres,
            source,
        };

        let rt = Runtime::new()?;
        let pool = rt
            .block_on(async {
                PgPoolOptions::new()
                    .max_connections(2)
                    .connect(database_url)
                    .await
            })
            .map_err(|e| connection_error(e.into()))?;

        let backend = Self { pool, rt };
        backend
            .setup_schema()
            .map_err(connection_error)?;

        info!(store = %StoreKind::Postgres, "Connected");
        Ok(backend)
    }

    /// Create the relational schema if it is missing.
    pub fn setup_schema(&self) -> StoreResult<()> {
        self.rt
            .block_on(async { sqlx::raw_sql(SCHEMA).execute(&self.pool).await })?;
        Ok(())
    }
}

/// Look up a natural key, inserting it when missing.
///
/// Read-then-write rather than an upsert: only one loader may run at a time.
async fn get_or_create_id(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    id_column: &str,
    value_column: &str,
    value: &str,
) -> Result<i32, sqlx::Error> {
    let select = format!("SELECT {id_column} FROM {table} WHERE {value_column} = $1");
    if let Some(id) = sqlx::query_scalar::<_, i32>(&select)
        .bind(value)
        .fetch_optional(&mut **tx)
        .await?
    {
        return Ok(id);
    }

    let insert = format!("INSERT INTO {table} ({value_column}) VALUES ($1) RETURNING {id_column}");
    sqlx::query_scalar::<_, i32>(&insert)
        .bind(value)
        .fetch_one(&mut **tx)
        .await
}

fn ids_from_rows(rows: Vec<PgRow>) -> Vec<String> {
    rows.into_iter().map(|row| row.get("id")).collect()
}

impl Store for PostgresBackend {
    fn kind(&self) -> StoreKind {
        StoreKind::Postgres
    }

    fn clear(&mut self) -> StoreResult<()> {
        self.rt.block_on(async {
            sqlx::query("TRUNCATE TABLE papers, authors, categories RESTART IDENTITY CASCADE")
                .execute(&self.pool)
                .await
        })?;
        Ok(())
    }

    fn ingest(&mut self, papers: &[Paper]) -> StoreResult<()> {
        self.rt.block_on(async {
            let mut tx = self.pool.begin().await?;

            for paper in papers {
                sqlx::query(
                    r#"INSERT INTO papers (id, title, abstract, doi, submitter, update_date)
                       VALUES ($1, $2, $3, $4, $5, $6)
                       ON CONFLICT (id) DO NOTHING"#,
                )
                .bind(&paper.id)
                .bind(&paper.title)
                .bind(&paper.abstract_text)
                .bind(&paper.doi)
                .bind(&paper.submitter)
                .bind(paper.parsed_update_date())
                .execute(&mut *tx)
                .await?;

                for author in paper.author_display_names() {
                    let author_id =
                        get_or_create_id(&mut tx, "authors", "author_id", "author_name", &author)
                            .await?;
                    sqlx::query(
                        "INSERT INTO paper_authors (paper_id, author_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
                    )
                    .bind(&paper.id)
                    .bind(author_id)
                    .execute(&mut *tx)
                    .await?;
                }

                for category in paper.category_list() {
                    let category_id = get_or_create_id(
                        &mut tx,
                        "categories",
                        "category_id",
                        "category_name",
                        category,
                    )
                    .await?;
                    sqlx::query(
                        "INSERT INTO paper_categories (paper_id, category_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
                    )
                    .bind(&paper.id)
                    .bind(category_id)
                    .execute(&mut *tx)
                    .await?;
                }
            }

            tx.commit().await
        })?;
        Ok(())
    }

    fn count_papers(&mut self) -> StoreResult<u64> {
        let count: i64 = self.rt.block_on(async {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM papers")
                .fetch_one(&self.pool)
                .await
        })?;
        Ok(count as u64)
    }

    fn create_probes(&mut self, ids: &[String]) -> StoreResult<()> {
        self.rt.block_on(async {
            let mut tx = self.pool.begin().await?;
            for id in ids {
                sqlx::query("INSERT INTO papers (id, title) VALUES ($1, $2)")
                    .bind(id)
                    .bind(PROBE_TITLE)
                    .execute(&mut *tx)
                    .await?;
            }
            tx.commit().await
        })?;
        Ok(())
    }

    fn fetch_paper(&mut self, id: &str) -> StoreResult<Option<PaperSnapshot>> {
        let row = self.rt.block_on(async {
            sqlx::query("SELECT * FROM papers WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
        })?;

        Ok(row.map(|row| PaperSnapshot {
            id: row.get("id"),
            title: row.get("title"),
            submitter: row.get("submitter"),
        }))
    }

    fn papers_in_category(&mut self, category: &str, limit: usize) -> StoreResult<Vec<String>> {
        let rows = self.rt.block_on(async {
            sqlx::query(
                r#"
                SELECT p.id, p.title
                FROM papers p
                JOIN paper_categories pc ON p.id = pc.paper_id
                JOIN categories c ON pc.category_id = c.category_id
                WHERE c.category_name = $1
                LIMIT $2
                "#,
            )
            .bind(category)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
        })?;
        Ok(ids_from_rows(rows))
    }

    fn search_abstracts(&mut self, term: &str, limit: usize) -> StoreResult<Vec<String>> {
        let rows = self.rt.block_on(async {
            sqlx::query("SELECT id FROM papers WHERE abstract ILIKE $1 LIMIT $2")
                .bind(format!("%{term}%"))
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
        })?;
        Ok(ids_from_rows(rows))
    }

    fn create_text_index(&mut self) -> StoreResult<()> {
        let ddl = format!(
            "CREATE INDEX IF NOT EXISTS {TEXT_INDEX} ON papers USING gin(to_tsvector('english', abstract))"
        );
        self.rt
            .block_on(async { sqlx::query(&ddl).execute(&self.pool).await })?;
        Ok(())
    }

    fn search_abstracts_indexed(&mut self, term: &str, limit: usize) -> StoreResult<Vec<String>> {
        let rows = self.rt.block_on(async {
            sqlx::query(
                "SELECT id FROM papers WHERE to_tsvector('english', abstract) @@ plainto_tsquery('english', $1) LIMIT $2",
            )
            .bind(term)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
        })?;
        Ok(ids_from_rows(rows))
    }

    fn drop_text_index(&mut self) -> StoreResult<()> {
        let ddl = format!("DROP INDEX IF EXISTS {TEXT_INDEX}");
        self.rt
            .block_on(async { sqlx::query(&ddl).execute(&self.pool).await })?;
        Ok(())
    }

    fn count_distinct_authors(&mut self) -> StoreResult<u64> {
        let count: i64 = self.rt.block_on(async {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(DISTINCT author_name) FROM authors")
                .fetch_one(&self.pool)
                .await
        })?;
        Ok(count as u64)
    }

    fn set_submitter(&mut self, id: &str, submitter: &str) -> StoreResult<()> {
        self.rt.block_on(async {
            sqlx::query("UPDATE papers SET submitter = $1 WHERE id = $2")
                .bind(submitter)
                .bind(id)
                .execute(&self.pool)
                .await
        })?;
        Ok(())
    }

    fn update_probes(&mut self, _ids: &[String], doi: &str) -> StoreResult<u64> {
        // One pattern-matched statement over every probe.
        let done = self.rt.block_on(async {
            sqlx::query("UPDATE papers SET doi = $1 WHERE id LIKE $2")
                .bind(doi)
                .bind(like_prefix(PROBE_PREFIX))
                .execute(&self.pool)
                .await
        })?;
        Ok(done.rows_affected())
    }

    fn delete_probes(&mut self, ids: &[String]) -> StoreResult<u64> {
        let done = self.rt.block_on(async {
            sqlx::query("DELETE FROM papers WHERE id = ANY($1)")
                .bind(ids)
                .execute(&self.pool)
                .await
        })?;
        Ok(done.rows_affected())
    }

    fn purge_probes(&mut self, prefix: &str) -> StoreResult<u64> {
        let done = self.rt.block_on(async {
            sqlx::query("DELETE FROM papers WHERE id LIKE $1")
                .bind(like_prefix(prefix))
                .execute(&self.pool)
                .await
        })?;
        Ok(done.rows_affected())
    }

    fn count_probes(&mut self, prefix: &str) -> StoreResult<u64> {
        let count: i64 = self.rt.block_on(async {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM papers WHERE id LIKE $1")
                .bind(like_prefix(prefix))
                .fetch_one(&self.pool)
                .await
        })?;
        Ok(count as u64)
    }

    fn close(&mut self) -> StoreResult<()> {
        self.rt.block_on(self.pool.close());
        Ok(())
    }
}

/// `LIKE` pattern matching every id that starts with `prefix`.
fn like_prefix(prefix: &str) -> String {
    let escaped = prefix
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("{escaped}%")
}
