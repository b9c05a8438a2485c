//! The staged index build. Every stage reads the complete output file of the
//! stage before it.

use crate::external_sort::{ExternalSorter, DEFAULT_CHUNK_LEN};
use crate::forward::{build_forward_index, list_corpus, ForwardSummary};
use crate::index::ForwardRecord;
use crate::inverted::{build_inverted_index, InvertedSummary};
use crate::persist::{
    count_lines, create_writer, load_term_info, read_forward_records, save_meta, save_stats, IndexPaths, MetaFile,
    FORMAT_VERSION,
};
use crate::registry::Registry;
use crate::stats::collect_stats;
use crate::tokenizer::{SnowballStemmer, StopWords, Tokenizer};
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub const DEFAULT_BATCH_SIZE: usize = 64;

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// One stop word per line. The built-in English list when `None`.
    pub stop_words: Option<PathBuf>,
    /// Forward records held in memory per external-sort chunk.
    pub chunk_len: usize,
    /// Documents tokenized in parallel before their records are appended.
    pub batch_size: usize,
    pub spill_dir: Option<PathBuf>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { stop_words: None, chunk_len: DEFAULT_CHUNK_LEN, batch_size: DEFAULT_BATCH_SIZE, spill_dir: None }
    }
}

#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub forward: ForwardSummary,
    pub sort_runs: usize,
    pub inverted: InvertedSummary,
    pub num_docs: u32,
    pub num_terms: u32,
    pub avg_doc_length: f64,
}

pub fn load_stop_words(path: Option<&Path>) -> Result<StopWords> {
    match path {
        Some(p) => StopWords::from_file(p),
        None => Ok(StopWords::english()),
    }
}

/// Build every index file for the documents directly under `corpus`.
pub fn build_index(corpus: &Path, paths: &IndexPaths, options: &BuildOptions) -> Result<BuildSummary> {
    let started = Instant::now();
    fs::create_dir_all(&paths.root).with_context(|| format!("creating {}", paths.root.display()))?;

    let stop_words = load_stop_words(options.stop_words.as_deref())?;
    save_stop_words(&paths.stop_words(), &stop_words)?;
    let tokenizer = Tokenizer::new(stop_words, SnowballStemmer::english());

    // forward index and id tables
    let files = list_corpus(corpus)?;
    tracing::info!(files = files.len(), corpus = %corpus.display(), "building forward index");
    let registry = Registry::new(create_writer(&paths.term_ids())?, create_writer(&paths.doc_ids())?);
    let forward = build_forward_index(
        &files,
        &tokenizer,
        &registry,
        create_writer(&paths.forward_index())?,
        options.batch_size,
    )?;
    let num_docs = registry.num_documents() as u32;
    registry.finish()?;
    tracing::info!(
        documents = forward.documents,
        skipped = forward.skipped,
        records = forward.records,
        "forward index written"
    );

    // term-major sort
    let mut sorter = ExternalSorter::new(options.chunk_len);
    if let Some(dir) = &options.spill_dir {
        sorter = sorter.with_spill_dir(dir);
    }
    let sorted = sorter.sort_by_key(read_forward_records(&paths.forward_index())?, ForwardRecord::term_doc_key)?;
    let sort_runs = sorted.run_count();
    let mut out = create_writer(&paths.sorted_forward_index())?;
    for record in sorted {
        writeln!(out, "{}", record?.to_line())?;
    }
    out.flush()?;
    tracing::info!(runs = sort_runs, "sorted forward index written");

    let inverted = build_inverted_index(
        read_forward_records(&paths.sorted_forward_index())?,
        create_writer(&paths.inverted_index())?,
        create_writer(&paths.term_info())?,
    )?;
    tracing::info!(terms = inverted.terms, postings = inverted.postings, bytes = inverted.bytes, "inverted index written");

    let term_info = load_term_info(&paths.term_info())?;
    let num_terms = count_lines(&paths.term_ids())? as u32;
    let stats = collect_stats(read_forward_records(&paths.forward_index())?, num_docs, num_terms, term_info.values())?;
    save_stats(paths, &stats)?;

    let meta = MetaFile {
        num_docs,
        num_terms,
        created_at: OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
        version: FORMAT_VERSION,
    };
    save_meta(paths, &meta)?;
    tracing::info!(
        num_docs,
        num_terms,
        avg_doc_length = stats.avg_doc_length,
        took_s = started.elapsed().as_secs_f64(),
        "index build complete"
    );

    Ok(BuildSummary { forward, sort_runs, inverted, num_docs, num_terms, avg_doc_length: stats.avg_doc_length })
}

fn save_stop_words(path: &Path, stop_words: &StopWords) -> Result<()> {
    let mut words: Vec<&str> = stop_words.iter().collect();
    words.sort_unstable();
    let mut out = create_writer(path)?;
    for w in words {
        writeln!(out, "{w}")?;
    }
    out.flush()?;
    Ok(())
}
