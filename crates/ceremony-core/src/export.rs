//! History export.
//!
//! Append-only JSONL: one serialized record per line, in history order.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::history::{HistoryLog, HistoryRecord};

/// Buffered JSONL record writer.
pub struct HistoryWriter<W: Write> {
    writer: BufWriter<W>,
    record_count: u64,
}

impl HistoryWriter<File> {
    /// Creates (or truncates) `path` and writes to it.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Self::new(file))
    }
}

impl<W: Write> HistoryWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: BufWriter::new(inner),
            record_count: 0,
        }
    }

    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    /// Writes one record as a single line.
    pub fn write<T: Serialize>(&mut self, record: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.record_count += 1;
        Ok(())
    }

    pub fn write_all<'a, T, I>(&mut self, records: I) -> io::Result<()>
    where
        T: Serialize + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        for record in records {
            self.write(record)?;
        }
        Ok(())
    }

    /// Flushes and returns the inner writer.
    pub fn finish(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }
}

/// Writes the whole history to `path` as JSONL and returns the line count.
pub fn write_jsonl<T>(history: &HistoryLog<T>, path: impl AsRef<Path>) -> io::Result<u64>
where
    T: HistoryRecord + Serialize,
{
    let path = path.as_ref();
    let mut writer = HistoryWriter::create(path)?;
    writer.write_all(history)?;
    let count = writer.record_count();
    writer.finish()?;
    tracing::info!(path = %path.display(), records = count, "history exported");
    Ok(count)
}
