//! Streaming reader for the newline-delimited JSON corpus.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use crate::error::BenchError;
use crate::paper::Paper;

/// Iterator over corpus records, stopping at an optional ceiling.
///
/// A line that fails to parse yields [`BenchError::MalformedRecord`]; callers
/// are expected to stop at the first error.
pub struct CorpusReader<R> {
    lines: Lines<R>,
    limit: Option<usize>,
    read: usize,
}

impl CorpusReader<BufReader<File>> {
    /// Open a corpus file.
    pub fn open(path: &Path, limit: Option<usize>) -> Result<Self, BenchError> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file), limit))
    }
}

impl<R: BufRead> CorpusReader<R> {
    /// Read records from any buffered source.
    pub fn new(reader: R, limit: Option<usize>) -> Self {
        Self {
            lines: reader.lines(),
            limit,
            read: 0,
        }
    }
}

impl<R: BufRead> Iterator for CorpusReader<R> {
    type Item = Result<Paper, BenchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.limit.is_some_and(|limit| self.read >= limit) {
            return None;
        }

        let line = match self.lines.next()? {
            Ok(line) => line,
            Err(e) => return Some(Err(e.into())),
        };
        self.read += 1;

        Some(
            Paper::from_json_line(&line).map_err(|source| BenchError::MalformedRecord {
                line: self.read,
                source,
            }),
        )
    }
}
