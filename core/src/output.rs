//! Ranked run files: `queryId \t 0 \t documentName \t rank \t score \t runTag`.

use crate::persist::DocumentTable;
use crate::DocId;
use anyhow::{Context, Result};
use std::io::Write;

pub const DEFAULT_RUN_TAG: &str = "run1";

pub struct RunWriter<W: Write> {
    out: W,
    run_tag: String,
    top_k: Option<usize>,
    lines: u64,
}

impl<W: Write> RunWriter<W> {
    pub fn new(out: W, run_tag: impl Into<String>) -> Self {
        Self { out, run_tag: run_tag.into(), top_k: None, lines: 0 }
    }

    /// Keep only the best `k` documents per query.
    pub fn with_top_k(mut self, k: Option<usize>) -> Self {
        self.top_k = k;
        self
    }

    /// `ranked` must already be in rank order.
    pub fn write_query(&mut self, query_id: &str, ranked: &[(DocId, f64)], docs: &DocumentTable) -> Result<()> {
        let limit = self.top_k.unwrap_or(usize::MAX);
        let mut rank = 0;
        for &(doc_id, score) in ranked {
            if rank >= limit {
                break;
            }
            let Some(name) = docs.name(doc_id) else {
                tracing::warn!(doc_id, query_id, "ranked document missing from document table");
                continue;
            };
            rank += 1;
            writeln!(self.out, "{query_id}\t0\t{name}\t{rank}\t{score}\t{}", self.run_tag)
                .context("writing run file")?;
            self.lines += 1;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<(W, u64)> {
        self.out.flush()?;
        Ok((self.out, self.lines))
    }
}
