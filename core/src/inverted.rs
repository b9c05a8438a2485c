//! Streams the term-major forward index into the gap-encoded inverted index
//! and its term-info side table.
//!
//! Each term occupies one line: `termId \t d:p \t 0:p ...`. A token with a
//! non-zero left side starts a new document (doc-id gap, first position);
//! `0:g` tokens add further positions to the same document as position gaps.

use crate::index::{ForwardRecord, TermInfo};
use crate::{DocId, TermId};
use anyhow::{bail, Result};
use std::io::Write;

struct OpenTerm {
    term_id: TermId,
    offset: u64,
    previous_doc: DocId,
    documents: u32,
    occurrences: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InvertedSummary {
    pub terms: u32,
    pub postings: u64,
    pub bytes: u64,
}

pub struct InvertedIndexBuilder<W: Write, I: Write> {
    index: W,
    info: I,
    offset: u64,
    current: Option<OpenTerm>,
    summary: InvertedSummary,
}

impl<W: Write, I: Write> InvertedIndexBuilder<W, I> {
    pub fn new(index: W, info: I) -> Self {
        Self { index, info, offset: 0, current: None, summary: InvertedSummary::default() }
    }

    fn emit(&mut self, text: &str) -> Result<()> {
        self.index.write_all(text.as_bytes())?;
        self.offset += text.len() as u64;
        Ok(())
    }

    /// Records must arrive ordered by (term id, doc id).
    pub fn push(&mut self, record: &ForwardRecord) -> Result<()> {
        match &self.current {
            Some(open) if open.term_id == record.term_id => {
                if record.doc_id <= open.previous_doc {
                    bail!(
                        "doc {} follows doc {} for term {}: input is not sorted",
                        record.doc_id,
                        open.previous_doc,
                        record.term_id
                    );
                }
            }
            Some(open) if open.term_id > record.term_id => {
                bail!("term {} follows term {}: input is not sorted", record.term_id, open.term_id);
            }
            _ => {
                self.close_term()?;
                let offset = self.offset;
                self.emit(&record.term_id.to_string())?;
                self.current = Some(OpenTerm {
                    term_id: record.term_id,
                    offset,
                    previous_doc: 0,
                    documents: 0,
                    occurrences: 0,
                });
            }
        }

        let previous_doc = self.current.as_ref().map_or(0, |t| t.previous_doc);
        let line = encode_document(record.doc_id - previous_doc, &record.positions)?;
        self.emit(&line)?;

        if let Some(open) = self.current.as_mut() {
            open.previous_doc = record.doc_id;
            open.documents += 1;
            open.occurrences += record.positions.len() as u64;
        }
        self.summary.postings += 1;
        Ok(())
    }

    fn close_term(&mut self) -> Result<()> {
        let Some(open) = self.current.take() else { return Ok(()) };
        self.emit("\n")?;
        let info = TermInfo {
            term_id: open.term_id,
            offset: open.offset,
            occurrences: open.occurrences,
            document_frequency: open.documents,
        };
        writeln!(self.info, "{}", info.to_line())?;
        self.summary.terms += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<InvertedSummary> {
        self.close_term()?;
        self.index.flush()?;
        self.info.flush()?;
        self.summary.bytes = self.offset;
        Ok(self.summary)
    }
}

/// Gap-encode one document of a postings list, including the leading tab.
fn encode_document(doc_gap: DocId, positions: &[u32]) -> Result<String> {
    let mut out = String::new();
    let mut previous = 0u32;
    for (i, &pos) in positions.iter().enumerate() {
        let Some(gap) = pos.checked_sub(previous) else {
            bail!("positions {positions:?} are not ascending");
        };
        let doc_part = if i == 0 { doc_gap } else { 0 };
        out.push_str(&format!("\t{doc_part}:{gap}"));
        previous = pos;
    }
    Ok(out)
}

pub fn build_inverted_index<W, I, R>(records: R, index: W, info: I) -> Result<InvertedSummary>
where
    W: Write,
    I: Write,
    R: IntoIterator<Item = Result<ForwardRecord>>,
{
    let mut builder = InvertedIndexBuilder::new(index, info);
    for record in records {
        builder.push(&record?)?;
    }
    builder.finish()
}
