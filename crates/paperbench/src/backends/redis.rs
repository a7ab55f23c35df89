//! Redis backend.
//!
//! Key layout:
//!
//! - `paper:<id>`: hash of `title`, `abstract`, `update_date`, `submitter`
//! - `category:<name>`: set of paper ids
//! - `author:<first>_<last>`: set of paper ids
//!
//! The category and author sets are inverted indices built during the load.
//! Redis has no full-text search, aggregation pipeline or pattern-match
//! update, so those operations are reported unsupported.

use std::collections::HashMap;

use ::redis::{Client, Commands, Connection, Script};
use tracing::info;

use crate::config::PROBE_TITLE;
use crate::error::{BenchError, StoreResult};
use crate::harness::Operation;
use crate::paper::{Paper, PaperSnapshot};

use super::{Store, StoreKind};

/// Key of a paper hash.
pub fn paper_key(id: &str) -> String {
    format!("paper:{id}")
}

/// Key of a category membership set.
pub fn category_key(category: &str) -> String {
    format!("category:{category}")
}

/// Key of an author membership set.
pub fn author_key(author: &str) -> String {
    format!("author:{author}")
}

/// Hash fields stored for a paper. Missing values are stored empty.
pub fn paper_fields(paper: &Paper) -> [(&'static str, String); 4] {
    [
        ("title", paper.title.clone().unwrap_or_default()),
        ("abstract", paper.abstract_text.clone().unwrap_or_default()),
        ("update_date", paper.update_date.clone().unwrap_or_default()),
        ("submitter", paper.submitter.clone().unwrap_or_default()),
    ]
}

/// `SCAN MATCH` pattern for paper keys whose id starts with `prefix`.
fn probe_pattern(prefix: &str) -> String {
    let mut pattern = String::from("paper:");
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('*');
    pattern
}

/// `HSET` that leaves missing hashes alone, in one round trip.
const SET_IF_PRESENT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
    return redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
end
return 0
"#;

/// Redis store adapter.
pub struct RedisBackend {
    con: Connection,
    set_if_present: Script,
}

impl RedisBackend {
    /// Open a connection and ping the server.
    pub fn connect(url: &str) -> Result<Self, BenchError> {
        let connect = || -> ::redis::RedisResult<Connection> {
            let client = Client::open(url)?;
            let mut con = client.get_connection()?;
            ::redis::cmd("PING").query::<String>(&mut con)?;
            Ok(con)
        };

        let con = connect().map_err(|e| BenchError::Connection {
            store: StoreKind::Redis,
            source: e.into(),
        })?;

        info!(store = %StoreKind::Redis, "Connected");
        Ok(Self {
            con,
            set_if_present: Script::new(SET_IF_PRESENT),
        })
    }

    fn scan_keys(&mut self, pattern: &str) -> StoreResult<Vec<String>> {
        let keys = self.con.scan_match::<_, String>(pattern)?.collect();
        Ok(keys)
    }
}

impl Store for RedisBackend {
    fn kind(&self) -> StoreKind {
        StoreKind::Redis
    }

    fn supports(&self, op: Operation) -> bool {
        !matches!(
            op,
            Operation::FullTextSearchNoIndex
                | Operation::FullTextSearchWithIndex
                | Operation::AggregateCount
                | Operation::UpdateMany
        )
    }

    fn clear(&mut self) -> StoreResult<()> {
        ::redis::cmd("FLUSHALL").query::<()>(&mut self.con)?;
        Ok(())
    }

    fn ingest(&mut self, papers: &[Paper]) -> StoreResult<()> {
        let mut pipe = ::redis::pipe();

        for paper in papers {
            pipe.hset_multiple(paper_key(&paper.id), &paper_fields(paper))
                .ignore();
            for category in paper.category_list() {
                pipe.sadd(category_key(category), &paper.id).ignore();
            }
            for author in paper.author_key_names() {
                pipe.sadd(author_key(&author), &paper.id).ignore();
            }
        }

        pipe.query::<()>(&mut self.con)?;
        Ok(())
    }

    fn count_papers(&mut self) -> StoreResult<u64> {
        Ok(self.scan_keys("paper:*")?.len() as u64)
    }

    fn create_probes(&mut self, ids: &[String]) -> StoreResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut pipe = ::redis::pipe();
        for id in ids {
            pipe.hset_multiple(paper_key(id), &[("title", PROBE_TITLE)])
                .ignore();
        }
        pipe.query::<()>(&mut self.con)?;
        Ok(())
    }

    fn fetch_paper(&mut self, id: &str) -> StoreResult<Option<PaperSnapshot>> {
        let mut fields: HashMap<String, String> = self.con.hgetall(paper_key(id))?;
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(PaperSnapshot {
            id: id.to_string(),
            title: fields.remove("title"),
            submitter: fields.remove("submitter"),
        }))
    }

    fn papers_in_category(&mut self, category: &str, limit: usize) -> StoreResult<Vec<String>> {
        let mut members: Vec<String> = self.con.smembers(category_key(category))?;
        members.truncate(limit);
        if members.is_empty() {
            return Ok(members);
        }

        let mut pipe = ::redis::pipe();
        for id in &members {
            pipe.hgetall(paper_key(id));
        }
        let papers: Vec<HashMap<String, String>> = pipe.query(&mut self.con)?;

        Ok(members
            .into_iter()
            .zip(papers)
            .filter(|(_, fields)| !fields.is_empty())
            .map(|(id, _)| id)
            .collect())
    }

    fn set_submitter(&mut self, id: &str, submitter: &str) -> StoreResult<()> {
        // A plain HSET would create a stray hash for an unknown id.
        self.set_if_present
            .key(paper_key(id))
            .arg("submitter")
            .arg(submitter)
            .invoke::<i64>(&mut self.con)?;
        Ok(())
    }

    fn delete_probes(&mut self, ids: &[String]) -> StoreResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let keys: Vec<String> = ids.iter().map(|id| paper_key(id)).collect();
        let removed: u64 = self.con.del(keys)?;
        Ok(removed)
    }

    fn purge_probes(&mut self, prefix: &str) -> StoreResult<u64> {
        // No prefix delete: scan for matching keys, then delete them.
        let keys = self.scan_keys(&probe_pattern(prefix))?;
        if keys.is_empty() {
            return Ok(0);
        }
        let removed: u64 = self.con.del(keys)?;
        Ok(removed)
    }

    fn count_probes(&mut self, prefix: &str) -> StoreResult<u64> {
        Ok(self.scan_keys(&probe_pattern(prefix))?.len() as u64)
    }
}
