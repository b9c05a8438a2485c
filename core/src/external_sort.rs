//! Bounded-memory stable sort: sorted chunks are spilled to temp files and
//! merged back with a k-way heap merge.
//!
//! Spilled runs keep no file handle open until they are merged. A merge never
//! reads more than `fan_in` runs at once; when there are more, consecutive
//! groups are merged into intermediate spill files first, so the number of
//! open files stays bounded however large the input is.

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use tempfile::{NamedTempFile, TempPath};

pub const DEFAULT_CHUNK_LEN: usize = 500_000;
pub const DEFAULT_FAN_IN: usize = 128;

#[derive(Debug, Clone)]
pub struct ExternalSorter {
    chunk_len: usize,
    fan_in: usize,
    spill_dir: Option<PathBuf>,
}

impl Default for ExternalSorter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_LEN)
    }
}

impl ExternalSorter {
    /// `chunk_len` is the number of records held in memory at once.
    pub fn new(chunk_len: usize) -> Self {
        Self { chunk_len: chunk_len.max(1), fan_in: DEFAULT_FAN_IN, spill_dir: None }
    }

    /// Most runs read by a single merge. At least 2.
    pub fn with_fan_in(mut self, fan_in: usize) -> Self {
        self.fan_in = fan_in.max(2);
        self
    }

    /// Directory for spill files; the system temp dir otherwise.
    pub fn with_spill_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spill_dir = Some(dir.into());
        self
    }

    /// Sort `input` by `key`. Records with equal keys keep their input order.
    pub fn sort_by_key<T, K, F, I>(&self, input: I, key: F) -> Result<SortedRuns<T, K, F>>
    where
        T: Serialize + DeserializeOwned + Send,
        K: Ord,
        F: Fn(&T) -> K + Sync,
        I: IntoIterator<Item = Result<T>>,
    {
        let mut runs = Vec::new();
        let mut chunk: Vec<T> = Vec::with_capacity(self.chunk_len.min(1 << 16));
        for item in input {
            chunk.push(item?);
            if chunk.len() >= self.chunk_len {
                chunk.par_sort_by_key(&key);
                runs.push(self.spill(chunk.drain(..).map(Ok))?);
            }
        }
        if !chunk.is_empty() || runs.is_empty() {
            chunk.par_sort_by_key(&key);
            runs.push(Run::Memory(chunk));
        }
        tracing::debug!(runs = runs.len(), "external sort chunks ready for merge");

        let mut pass = 0;
        while runs.len() > self.fan_in {
            pass += 1;
            runs = self.merge_groups(runs, &key)?;
            tracing::debug!(pass, runs = runs.len(), "intermediate merge pass done");
        }
        SortedRuns::new(runs, key)
    }

    /// Merge consecutive groups of `fan_in` runs into one spilled run each.
    /// Groups follow run order, so equal keys keep their input order.
    fn merge_groups<T, K, F>(&self, runs: Vec<Run<T>>, key: &F) -> Result<Vec<Run<T>>>
    where
        T: Serialize + DeserializeOwned,
        K: Ord,
        F: Fn(&T) -> K,
    {
        let mut merged = Vec::with_capacity(runs.len() / self.fan_in + 1);
        let mut pending = runs.into_iter();
        loop {
            let group: Vec<Run<T>> = pending.by_ref().take(self.fan_in).collect();
            match group.len() {
                0 => break,
                1 => merged.extend(group),
                _ => merged.push(self.spill(SortedRuns::new(group, key)?)?),
            }
        }
        Ok(merged)
    }

    fn spill<T: Serialize>(&self, items: impl Iterator<Item = Result<T>>) -> Result<Run<T>> {
        let file = match &self.spill_dir {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new(),
        }
        .context("creating sort spill file")?;
        let mut writer = BufWriter::new(file);
        let mut len = 0;
        for item in items {
            bincode::serialize_into(&mut writer, &item?).context("writing sort spill file")?;
            len += 1;
        }
        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        Ok(Run::Spilled { path: file.into_temp_path(), len })
    }
}

enum Run<T> {
    Memory(Vec<T>),
    /// Closed until merged; the file is removed when the path is dropped.
    Spilled { path: TempPath, len: usize },
}

impl<T> Run<T> {
    fn open(self) -> Result<Cursor<T>> {
        match self {
            Run::Memory(items) => Ok(Cursor::Memory(items.into_iter())),
            Run::Spilled { path, len } => {
                let file = File::open(&path).context("reopening sort spill file")?;
                Ok(Cursor::Spilled { reader: BufReader::new(file), remaining: len, _path: path })
            }
        }
    }
}

enum Cursor<T> {
    Memory(std::vec::IntoIter<T>),
    Spilled { reader: BufReader<File>, remaining: usize, _path: TempPath },
}

impl<T: DeserializeOwned> Cursor<T> {
    fn next_item(&mut self) -> Result<Option<T>> {
        match self {
            Cursor::Memory(items) => Ok(items.next()),
            Cursor::Spilled { remaining: 0, .. } => Ok(None),
            Cursor::Spilled { reader, remaining, .. } => {
                *remaining -= 1;
                let item = bincode::deserialize_from(reader).context("reading sort spill file")?;
                Ok(Some(item))
            }
        }
    }
}

/// Merged output of an external sort.
pub struct SortedRuns<T, K, F> {
    runs: Vec<Cursor<T>>,
    heads: Vec<Option<T>>,
    heap: BinaryHeap<Reverse<(K, usize)>>,
    key: F,
}

impl<T, K, F> SortedRuns<T, K, F>
where
    T: DeserializeOwned,
    K: Ord,
    F: Fn(&T) -> K,
{
    fn new(runs: Vec<Run<T>>, key: F) -> Result<Self> {
        let mut cursors = Vec::with_capacity(runs.len());
        let mut heads = Vec::with_capacity(runs.len());
        let mut heap = BinaryHeap::with_capacity(runs.len());
        for (i, run) in runs.into_iter().enumerate() {
            let mut cursor = run.open()?;
            let head = cursor.next_item()?;
            if let Some(item) = &head {
                heap.push(Reverse((key(item), i)));
            }
            cursors.push(cursor);
            heads.push(head);
        }
        Ok(Self { runs: cursors, heads, heap, key })
    }

    /// Runs read by the final merge.
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }
}

impl<T, K, F> Iterator for SortedRuns<T, K, F>
where
    T: DeserializeOwned,
    K: Ord,
    F: Fn(&T) -> K,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let Reverse((_, run)) = self.heap.pop()?;
        let item = self.heads[run].take()?;
        match self.runs[run].next_item() {
            Ok(Some(next)) => {
                self.heap.push(Reverse(((self.key)(&next), run)));
                self.heads[run] = Some(next);
            }
            Ok(None) => {}
            Err(err) => return Some(Err(err)),
        }
        Some(Ok(item))
    }
}
