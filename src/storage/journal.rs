//! Append-only JSON-lines journal
//!
//! Each line is one self-contained `{"<key>": <value>}` object. Loading replays
//! the lines in file order, so a later record for the same key replaces the
//! earlier one while the key keeps its first position.
//!
//! A crash can leave a half-written last line behind, which is always missing
//! its newline. Loading skips it and cuts it off the file so the next append
//! starts on a clean line. Any newline-terminated line that does not decode is
//! reported as corruption, wherever it sits.
//!
//! # Example
//!
//! ```no_run
//! use harvester::storage::JournalStore;
//!
//! # fn example() -> Result<(), harvester::error::StoreError> {
//! let store: JournalStore<u32> = JournalStore::new("data/counts.jsonl");
//! store.append("a", &1)?;
//! store.append("a", &3)?;
//! assert_eq!(store.load()?.get("a"), Some(&3));
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::utils::error::StoreError;

/// Key → value journal backed by one JSON-lines file
#[derive(Debug)]
pub struct JournalStore<V> {
    path: PathBuf,

    /// `sync_data` after every append
    sync: bool,

    /// Serializes appends so records never interleave
    writer: Mutex<()>,

    _value: PhantomData<fn() -> V>,
}

/// Outcome of scanning the file, before any repair
struct Scan<V> {
    records: IndexMap<String, V>,
    /// Byte offset where a partial last line starts
    partial_tail: Option<u64>,
    /// Last complete record lacks its newline
    missing_newline: bool,
}

impl<V> JournalStore<V>
where
    V: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sync: true,
            writer: Mutex::new(()),
            _value: PhantomData,
        }
    }

    /// Toggle flushing to disk after each append
    #[must_use]
    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rebuild the key → value map from the journal
    ///
    /// A missing file is an empty journal.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::CorruptRecord` for an undecodable newline-terminated
    /// line, and `StoreError::Io` when the file cannot be read or repaired.
    pub fn load(&self) -> Result<IndexMap<String, V>, StoreError> {
        let _guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());

        if !self.path.exists() {
            return Ok(IndexMap::new());
        }

        let scan = self.scan()?;
        self.repair(&scan)?;

        tracing::debug!(
            path = %self.path.display(),
            records = scan.records.len(),
            "Journal loaded"
        );
        Ok(scan.records)
    }

    /// Durably append one record, creating the file if needed
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Serialize` if the value cannot be encoded and
    /// `StoreError::Io` if the write fails.
    pub fn append(&self, key: &str, value: &V) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(&BTreeMap::from([(key, value)])).map_err(|source| {
            StoreError::Serialize {
                key: key.to_string(),
                source,
            }
        })?;
        line.push(b'\n');

        let _guard = self.writer.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;

        file.write_all(&line).map_err(|e| self.io_error(e))?;
        if self.sync {
            file.sync_data().map_err(|e| self.io_error(e))?;
        }

        Ok(())
    }

    fn scan(&self) -> Result<Scan<V>, StoreError> {
        let file = File::open(&self.path).map_err(|e| self.io_error(e))?;
        let mut reader = BufReader::new(file);

        let mut records = IndexMap::new();
        let mut offset = 0u64;
        let mut line_no = 0usize;
        let mut buf = Vec::new();
        let mut torn: Option<(usize, u64, serde_json::Error)> = None;
        let mut missing_newline = false;

        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|e| self.io_error(e))?;
            if read == 0 {
                break;
            }
            line_no += 1;
            let start = offset;
            offset += read as u64;

            let terminated = buf.last() == Some(&b'\n');
            let body = buf.trim_ascii();
            if body.is_empty() {
                continue;
            }

            match serde_json::from_slice::<IndexMap<String, V>>(body) {
                Ok(record) => {
                    records.extend(record);
                    missing_newline = !terminated;
                }
                // Only the final read can lack the newline
                Err(source) if !terminated => torn = Some((line_no, start, source)),
                Err(source) => {
                    return Err(StoreError::CorruptRecord {
                        path: self.path.clone(),
                        line: line_no,
                        source,
                    })
                }
            }
        }

        let partial_tail = torn.map(|(line, start, source)| {
            tracing::warn!(
                path = %self.path.display(),
                line,
                error = %source,
                "Dropping partial last record"
            );
            start
        });

        Ok(Scan {
            records,
            partial_tail,
            missing_newline: partial_tail.is_none() && missing_newline,
        })
    }

    fn repair(&self, scan: &Scan<V>) -> Result<(), StoreError> {
        if let Some(len) = scan.partial_tail {
            let file = OpenOptions::new()
                .write(true)
                .open(&self.path)
                .map_err(|e| self.io_error(e))?;
            file.set_len(len).map_err(|e| self.io_error(e))?;
            file.sync_data().map_err(|e| self.io_error(e))?;
        } else if scan.missing_newline {
            let mut file = OpenOptions::new()
                .append(true)
                .open(&self.path)
                .map_err(|e| self.io_error(e))?;
            file.write_all(b"\n").map_err(|e| self.io_error(e))?;
        }
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
