//! Append-only JSONL stream primitive.
//!
//! Every durable stream in the governance pipeline — the copilot audit
//! trail, approval events, the execution ledger, governance signals, and
//! user feedback — is a sequence of self-contained JSON lines appended to a
//! file and never rewritten. This crate provides that primitive once so
//! every stage shares the same append/read semantics instead of hand-rolling
//! file I/O.

#![deny(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use thiserror::Error;

/// Monotonic identifier assigned to a record at append time.
pub type RecordId = u64;

/// Errors produced by the JSONL stream.
#[derive(Debug, Error)]
pub enum EventLogError {
    /// Underlying file I/O failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    /// A record failed to (de)serialize.
    #[error("serialize: {0}")]
    Serde(#[from] serde_json::Error),
}

/// A single record persisted to a JSONL stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord<T> {
    /// Monotonic id assigned on append (position within the stream).
    pub id: RecordId,
    /// Millis since epoch at append time.
    pub ts_ms: u64,
    /// The record payload.
    pub payload: T,
}

/// A JSONL-backed append-only stream. Cheap to clone; each handle opens the
/// file fresh for every operation so concurrent single-writer appends stay
/// within the line-atomicity guarantee documented for this format (lines
/// must stay under `PIPE_BUF`; callers are responsible for keeping records
/// small).
#[derive(Debug, Clone)]
pub struct JsonlStream {
    path: String,
}

impl JsonlStream {
    /// Open (creating if absent) a stream at `path`. Never truncates an
    /// existing file — streams are append-only for their whole lifetime.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EventLogError> {
        let p = path.as_ref();
        if let Some(parent) = p.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        if !p.exists() {
            OpenOptions::new().create(true).write(true).open(p)?;
        }
        Ok(Self { path: p.to_string_lossy().into_owned() })
    }

    /// Append one record, returning the id that was assigned to it.
    pub fn append<T: Serialize>(
        &self,
        id: RecordId,
        ts_ms: u64,
        payload: &T,
    ) -> Result<RecordId, EventLogError> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        let rec = EventRecord { id, ts_ms, payload };
        let line = serde_json::to_string(&rec)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;
        Ok(id)
    }

    /// Read every record with id in `[start, end)`.
    pub fn read_range<T: for<'de> Deserialize<'de>>(
        &self,
        start: RecordId,
        end: RecordId,
    ) -> Result<Vec<EventRecord<T>>, EventLogError> {
        if !Path::new(&self.path).exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut out = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }
            let rec: EventRecord<T> = serde_json::from_str(&line)?;
            if rec.id >= start && rec.id < end {
                out.push(rec);
            }
        }
        Ok(out)
    }

    /// Read every record in the stream, in append order.
    pub fn read_all<T: for<'de> Deserialize<'de>>(
        &self,
    ) -> Result<Vec<EventRecord<T>>, EventLogError> {
        self.read_range(0, RecordId::MAX)
    }

    /// Number of records currently appended to the stream.
    pub fn len(&self) -> Result<usize, EventLogError> {
        Ok(self.read_all::<serde_json::Value>()?.len())
    }

    /// True if the stream has never had a record appended.
    pub fn is_empty(&self) -> Result<bool, EventLogError> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_read_roundtrip() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let log = JsonlStream::open(tmp.path()).unwrap();
        log.append(1, 1, &"hello").unwrap();
        log.append(2, 2, &"world").unwrap();
        let got: Vec<EventRecord<String>> = log.read_all().unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].payload, "hello");
        assert_eq!(got[1].payload, "world");
    }

    #[test]
    fn read_range_is_half_open() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let log = JsonlStream::open(tmp.path()).unwrap();
        for i in 1..=5u64 {
            log.append(i, i, &i).unwrap();
        }
        let got: Vec<EventRecord<u64>> = log.read_range(2, 4).unwrap();
        assert_eq!(got.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn never_truncates_existing_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let log = JsonlStream::open(tmp.path()).unwrap();
        log.append(1, 1, &"first").unwrap();
        // Re-opening must not discard what is already there.
        let log2 = JsonlStream::open(tmp.path()).unwrap();
        log2.append(2, 2, &"second").unwrap();
        let got: Vec<EventRecord<String>> = log.read_all().unwrap();
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn append_is_idempotent_safe_on_missing_parent_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a/b/c.jsonl");
        let log = JsonlStream::open(&nested).unwrap();
        log.append(1, 1, &"x").unwrap();
        assert!(nested.exists());
    }
}
