//! MongoDB backend.
//!
//! One denormalized document per paper in the `papers` collection, keyed by
//! the paper id. The async driver runs on an owned Tokio runtime.

use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, DateTime, Document};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};
use tokio::runtime::Runtime;
use tracing::info;

use crate::config::PROBE_TITLE;
use crate::error::{BenchError, StoreResult};
use crate::paper::{Paper, PaperSnapshot};

use super::{Store, StoreKind};

/// Collection holding the paper documents.
pub const COLLECTION: &str = "papers";

/// Name of the transient text index.
const TEXT_INDEX: &str = "abstract_text";

/// MongoDB store adapter.
pub struct MongoBackend {
    client: Client,
    papers: Collection<Document>,
    rt: Runtime,
}

impl MongoBackend {
    /// Connect and ping the server.
    ///
    /// The driver connects lazily, so the ping is what surfaces an
    /// unreachable server.
    pub fn connect(uri: &str, database: &str) -> Result<Self, BenchError> {
        let connection_error = |source| BenchError::Connection {
            store: StoreKind::Mongo,
            source,
        };

        let rt = Runtime::new()?;
        let client = rt
            .block_on(async {
                let client = Client::with_uri_str(uri).await?;
                client
                    .database(database)
                    .run_command(doc! { "ping": 1 })
                    .await?;
                Ok::<_, mongodb::error::Error>(client)
            })
            .map_err(|e| connection_error(e.into()))?;

        let papers = client.database(database).collection::<Document>(COLLECTION);
        info!(store = %StoreKind::Mongo, database, "Connected");
        Ok(Self { client, papers, rt })
    }

    async fn collect_ids(cursor: mongodb::Cursor<Document>) -> mongodb::error::Result<Vec<String>> {
        let docs: Vec<Document> = cursor.try_collect().await?;
        Ok(docs
            .iter()
            .filter_map(|d| d.get_str("_id").ok().map(str::to_string))
            .collect())
    }
}

/// Build the stored document for a paper.
///
/// Every corpus field is embedded; `_id` is the paper id and `update_date`
/// becomes a BSON date, or null when it does not parse.
pub fn paper_document(paper: &Paper) -> StoreResult<Document> {
    let mut document = mongodb::bson::to_document(paper)?;
    document.insert("_id", paper.id.as_str());

    let update_date = paper
        .parsed_update_date()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| Bson::DateTime(DateTime::from_millis(dt.and_utc().timestamp_millis())))
        .unwrap_or(Bson::Null);
    document.insert("update_date", update_date);

    Ok(document)
}

/// Filter matching papers whose space-separated `categories` contain
/// `category` as a whole tag.
pub fn category_filter(category: &str) -> Document {
    doc! {
        "categories": {
            "$regex": format!("(^|\\s){}(\\s|$)", escape_regex(category)),
        }
    }
}

/// Filter matching every id that starts with `prefix`.
pub fn id_prefix_filter(prefix: &str) -> Document {
    doc! { "_id": { "$regex": format!("^{}", escape_regex(prefix)) } }
}

fn escape_regex(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Store for MongoBackend {
    fn kind(&self) -> StoreKind {
        StoreKind::Mongo
    }

    fn clear(&mut self) -> StoreResult<()> {
        self.rt.block_on(async { self.papers.drop().await })?;
        Ok(())
    }

    fn ingest(&mut self, papers: &[Paper]) -> StoreResult<()> {
        let documents = papers
            .iter()
            .map(paper_document)
            .collect::<StoreResult<Vec<_>>>()?;
        self.rt
            .block_on(async { self.papers.insert_many(documents).await })?;
        Ok(())
    }

    fn count_papers(&mut self) -> StoreResult<u64> {
        Ok(self
            .rt
            .block_on(async { self.papers.count_documents(doc! {}).await })?)
    }

    fn create_probes(&mut self, ids: &[String]) -> StoreResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let documents: Vec<Document> = ids
            .iter()
            .map(|id| doc! { "_id": id.as_str(), "title": PROBE_TITLE })
            .collect();
        self.rt
            .block_on(async { self.papers.insert_many(documents).await })?;
        Ok(())
    }

    fn fetch_paper(&mut self, id: &str) -> StoreResult<Option<PaperSnapshot>> {
        let found = self
            .rt
            .block_on(async { self.papers.find_one(doc! { "_id": id }).await })?;
        Ok(found.map(|d| PaperSnapshot {
            id: d.get_str("_id").unwrap_or(id).to_string(),
            title: d.get_str("title").ok().map(str::to_string),
            submitter: d.get_str("submitter").ok().map(str::to_string),
        }))
    }

    fn papers_in_category(&mut self, category: &str, limit: usize) -> StoreResult<Vec<String>> {
        let ids = self.rt.block_on(async {
            let cursor = self
                .papers
                .find(category_filter(category))
                .limit(limit as i64)
                .await?;
            Self::collect_ids(cursor).await
        })?;
        Ok(ids)
    }

    fn search_abstracts(&mut self, term: &str, limit: usize) -> StoreResult<Vec<String>> {
        let filter = doc! {
            "abstract": { "$regex": escape_regex(term), "$options": "i" }
        };
        let ids = self.rt.block_on(async {
            let cursor = self.papers.find(filter).limit(limit as i64).await?;
            Self::collect_ids(cursor).await
        })?;
        Ok(ids)
    }

    fn create_text_index(&mut self) -> StoreResult<()> {
        let index = IndexModel::builder()
            .keys(doc! { "abstract": "text" })
            .options(IndexOptions::builder().name(TEXT_INDEX.to_string()).build())
            .build();
        self.rt
            .block_on(async { self.papers.create_index(index).await })?;
        Ok(())
    }

    fn search_abstracts_indexed(&mut self, term: &str, limit: usize) -> StoreResult<Vec<String>> {
        let filter = doc! { "$text": { "$search": term } };
        let ids = self.rt.block_on(async {
            let cursor = self.papers.find(filter).limit(limit as i64).await?;
            Self::collect_ids(cursor).await
        })?;
        Ok(ids)
    }

    fn drop_text_index(&mut self) -> StoreResult<()> {
        self.rt
            .block_on(async { self.papers.drop_index(TEXT_INDEX).await })?;
        Ok(())
    }

    fn count_distinct_authors(&mut self) -> StoreResult<u64> {
        let pipeline = vec![
            doc! { "$unwind": "$authors_parsed" },
            doc! { "$group": { "_id": "$authors_parsed" } },
            doc! { "$count": "unique_authors" },
        ];
        let counted: Vec<Document> = self.rt.block_on(async {
            self.papers.aggregate(pipeline).await?.try_collect().await
        })?;

        // `$count` emits no document at all when nothing matched.
        let count = counted
            .first()
            .and_then(|d| match d.get("unique_authors") {
                Some(Bson::Int32(n)) => Some(*n as u64),
                Some(Bson::Int64(n)) => Some(*n as u64),
                _ => None,
            })
            .unwrap_or(0);
        Ok(count)
    }

    fn set_submitter(&mut self, id: &str, submitter: &str) -> StoreResult<()> {
        self.rt.block_on(async {
            self.papers
                .update_one(
                    doc! { "_id": id },
                    doc! { "$set": { "submitter": submitter } },
                )
                .await
        })?;
        Ok(())
    }

    fn update_probes(&mut self, ids: &[String], doi: &str) -> StoreResult<u64> {
        let done = self.rt.block_on(async {
            self.papers
                .update_many(
                    doc! { "_id": { "$in": ids } },
                    doc! { "$set": { "doi": doi } },
                )
                .await
        })?;
        Ok(done.modified_count)
    }

    fn delete_probes(&mut self, ids: &[String]) -> StoreResult<u64> {
        let done = self
            .rt
            .block_on(async { self.papers.delete_many(doc! { "_id": { "$in": ids } }).await })?;
        Ok(done.deleted_count)
    }

    fn purge_probes(&mut self, prefix: &str) -> StoreResult<u64> {
        let done = self
            .rt
            .block_on(async { self.papers.delete_many(id_prefix_filter(prefix)).await })?;
        Ok(done.deleted_count)
    }

    fn count_probes(&mut self, prefix: &str) -> StoreResult<u64> {
        Ok(self
            .rt
            .block_on(async { self.papers.count_documents(id_prefix_filter(prefix)).await })?)
    }

    fn close(&mut self) -> StoreResult<()> {
        self.rt.block_on(async { self.client.clone().shutdown().await });
        Ok(())
    }
}
