//! In-memory store used by the integration tests.

#![allow(dead_code)]

pub mod containers;
pub mod cycle;

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::rc::Rc;

use paperbench::{Operation, Paper, PaperSnapshot, Store, StoreError, StoreKind, StoreResult};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StoredPaper {
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub submitter: Option<String>,
    pub doi: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MemoryState {
    pub papers: BTreeMap<String, StoredPaper>,
    pub categories: BTreeMap<String, BTreeSet<String>>,
    pub authors: BTreeSet<String>,
    pub text_index: bool,
    pub closes: usize,
    pub calls: Vec<&'static str>,
}

impl MemoryState {
    pub fn probe_count(&self) -> usize {
        self.papers.keys().filter(|id| id.starts_with("bench-")).count()
    }
}

/// Store backed by shared in-memory state, so tests can inspect it after the
/// driver has taken ownership of the store.
pub struct MemoryStore {
    kind: StoreKind,
    pub state: Rc<RefCell<MemoryState>>,
    unsupported: Vec<Operation>,
    fail_on: Vec<&'static str>,
    panic_on: Option<&'static str>,
}

impl MemoryStore {
    pub fn new(kind: StoreKind) -> Self {
        Self {
            kind,
            state: Rc::new(RefCell::new(MemoryState::default())),
            unsupported: Vec::new(),
            fail_on: Vec::new(),
            panic_on: None,
        }
    }

    pub fn without(mut self, ops: &[Operation]) -> Self {
        self.unsupported.extend_from_slice(ops);
        self
    }

    /// Make `call` fail with `Unsupported(call)`. May be repeated.
    pub fn failing_on(mut self, call: &'static str) -> Self {
        self.fail_on.push(call);
        self
    }

    pub fn panicking_on(mut self, call: &'static str) -> Self {
        self.panic_on = Some(call);
        self
    }

    pub fn handle(&self) -> Rc<RefCell<MemoryState>> {
        Rc::clone(&self.state)
    }

    fn enter(&mut self, call: &'static str) -> StoreResult<()> {
        self.state.borrow_mut().calls.push(call);
        if self.panic_on == Some(call) {
            panic!("{call} panicked");
        }
        if self.fail_on.contains(&call) {
            return Err(StoreError::Unsupported(call));
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn kind(&self) -> StoreKind {
        self.kind
    }

    fn load_batch_size(&self) -> usize {
        2
    }

    fn supports(&self, op: Operation) -> bool {
        !self.unsupported.contains(&op)
    }

    fn clear(&mut self) -> StoreResult<()> {
        self.enter("clear")?;
        let mut state = self.state.borrow_mut();
        state.papers.clear();
        state.categories.clear();
        state.authors.clear();
        Ok(())
    }

    fn ingest(&mut self, papers: &[Paper]) -> StoreResult<()> {
        self.enter("ingest")?;
        let mut state = self.state.borrow_mut();
        for paper in papers {
            if state.papers.contains_key(&paper.id) {
                continue;
            }
            state.papers.insert(
                paper.id.clone(),
                StoredPaper {
                    title: paper.title.clone(),
                    abstract_text: paper.abstract_text.clone(),
                    submitter: paper.submitter.clone(),
                    doi: paper.doi.clone(),
                },
            );
            for category in paper.category_list() {
                state
                    .categories
                    .entry(category.to_string())
                    .or_default()
                    .insert(paper.id.clone());
            }
            state.authors.extend(paper.author_display_names());
        }
        Ok(())
    }

    fn count_papers(&mut self) -> StoreResult<u64> {
        Ok(self.state.borrow().papers.len() as u64)
    }

    fn create_probes(&mut self, ids: &[String]) -> StoreResult<()> {
        self.enter("create_probes")?;
        let mut state = self.state.borrow_mut();
        for id in ids {
            state.papers.insert(
                id.clone(),
                StoredPaper {
                    title: Some("Bulk Create Test".to_string()),
                    ..Default::default()
                },
            );
        }
        Ok(())
    }

    fn fetch_paper(&mut self, id: &str) -> StoreResult<Option<PaperSnapshot>> {
        self.enter("fetch_paper")?;
        Ok(self.state.borrow().papers.get(id).map(|p| PaperSnapshot {
            id: id.to_string(),
            title: p.title.clone(),
            submitter: p.submitter.clone(),
        }))
    }

    fn papers_in_category(&mut self, category: &str, limit: usize) -> StoreResult<Vec<String>> {
        self.enter("papers_in_category")?;
        Ok(self
            .state
            .borrow()
            .categories
            .get(category)
            .map(|ids| ids.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    fn search_abstracts(&mut self, term: &str, limit: usize) -> StoreResult<Vec<String>> {
        self.enter("search_abstracts")?;
        let term = term.to_lowercase();
        Ok(self
            .state
            .borrow()
            .papers
            .iter()
            .filter(|(_, p)| {
                p.abstract_text
                    .as_deref()
                    .is_some_and(|a| a.to_lowercase().contains(&term))
            })
            .map(|(id, _)| id.clone())
            .take(limit)
            .collect())
    }

    fn create_text_index(&mut self) -> StoreResult<()> {
        self.enter("create_text_index")?;
        self.state.borrow_mut().text_index = true;
        Ok(())
    }

    fn search_abstracts_indexed(&mut self, term: &str, limit: usize) -> StoreResult<Vec<String>> {
        self.enter("search_abstracts_indexed")?;
        if !self.state.borrow().text_index {
            return Err(StoreError::Unsupported("text index missing"));
        }
        self.search_abstracts(term, limit)
    }

    fn drop_text_index(&mut self) -> StoreResult<()> {
        self.enter("drop_text_index")?;
        self.state.borrow_mut().text_index = false;
        Ok(())
    }

    fn count_distinct_authors(&mut self) -> StoreResult<u64> {
        self.enter("count_distinct_authors")?;
        Ok(self.state.borrow().authors.len() as u64)
    }

    fn set_submitter(&mut self, id: &str, submitter: &str) -> StoreResult<()> {
        self.enter("set_submitter")?;
        if let Some(paper) = self.state.borrow_mut().papers.get_mut(id) {
            paper.submitter = Some(submitter.to_string());
        }
        Ok(())
    }

    fn update_probes(&mut self, ids: &[String], doi: &str) -> StoreResult<u64> {
        self.enter("update_probes")?;
        let mut state = self.state.borrow_mut();
        let mut updated = 0;
        for id in ids {
            if let Some(paper) = state.papers.get_mut(id) {
                paper.doi = Some(doi.to_string());
                updated += 1;
            }
        }
        Ok(updated)
    }

    fn delete_probes(&mut self, ids: &[String]) -> StoreResult<u64> {
        self.enter("delete_probes")?;
        let mut state = self.state.borrow_mut();
        Ok(ids
            .iter()
            .filter(|id| state.papers.remove(id.as_str()).is_some())
            .count() as u64)
    }

    fn purge_probes(&mut self, prefix: &str) -> StoreResult<u64> {
        self.enter("purge_probes")?;
        let mut state = self.state.borrow_mut();
        let before = state.papers.len();
        state.papers.retain(|id, _| !id.starts_with(prefix));
        Ok((before - state.papers.len()) as u64)
    }

    fn count_probes(&mut self, prefix: &str) -> StoreResult<u64> {
        Ok(self
            .state
            .borrow()
            .papers
            .keys()
            .filter(|id| id.starts_with(prefix))
            .count() as u64)
    }

    fn close(&mut self) -> StoreResult<()> {
        self.state.borrow_mut().closes += 1;
        Ok(())
    }
}

/// Sample corpus: `a` is the only `hep-th` paper.
pub const CORPUS: &str = concat!(
    r#"{"id":"a","title":"Alpha","abstract":"A distant Galaxy cluster.","doi":"10.1/a","submitter":"Pavel Exner","update_date":"2008-11-13","categories":"hep-th math-ph","authors_parsed":[["Exner","Pavel",""],["Kondej","Sylwia",""]]}"#,
    "\n",
    r#"{"id":"b","title":"Beta","abstract":"Lattice gauge theory.","doi":null,"submitter":"Bob","update_date":"2007-05-23","categories":"hep-lat","authors_parsed":[["Exner","Pavel",""]]}"#,
    "\n",
    r#"{"id":"c","title":"Gamma","abstract":"Galaxy rotation curves.","submitter":"Carol","update_date":"not a date","categories":"astro-ph.GA","authors_parsed":[["Rubin","Vera",""]]}"#,
    "\n",
);

/// Write `content` to a temporary corpus file.
pub fn corpus_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
