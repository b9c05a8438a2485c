use crate::{DocId, TermId};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// One (document, term) pair of the forward index with the 1-based word
/// positions of the term inside the document, in encounter order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardRecord {
    pub doc_id: DocId,
    pub term_id: TermId,
    pub positions: Vec<u32>,
}

impl ForwardRecord {
    pub fn new(doc_id: DocId, term_id: TermId, positions: Vec<u32>) -> Self {
        Self { doc_id, term_id, positions }
    }

    /// Sort key of the sorted forward index: term-major, doc-minor.
    pub fn term_doc_key(&self) -> (TermId, DocId) {
        (self.term_id, self.doc_id)
    }

    pub fn term_frequency(&self) -> u32 {
        self.positions.len() as u32
    }

    /// `docId \t termId \t pos1 \t pos2 ...` without the trailing newline.
    pub fn to_line(&self) -> String {
        let mut line = format!("{}\t{}", self.doc_id, self.term_id);
        for pos in &self.positions {
            let _ = write!(line, "\t{pos}");
        }
        line
    }

    pub fn parse_line(line: &str) -> Result<Self> {
        let mut fields = line.trim_end_matches(['\r', '\n']).split('\t');
        let doc_id = match fields.next() {
            Some(f) if !f.is_empty() => f.parse().with_context(|| format!("bad doc id in forward record {line:?}"))?,
            _ => bail!("empty forward record"),
        };
        let term_id = match fields.next() {
            Some(f) => f.parse().with_context(|| format!("bad term id in forward record {line:?}"))?,
            None => bail!("forward record {line:?} has no term id"),
        };
        let positions = fields
            .map(|f| f.parse::<u32>().with_context(|| format!("bad position in forward record {line:?}")))
            .collect::<Result<Vec<_>>>()?;
        if positions.is_empty() {
            bail!("forward record {line:?} has no positions");
        }
        Ok(Self { doc_id, term_id, positions })
    }
}

/// Side-table row locating a term's postings list inside the inverted index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermInfo {
    pub term_id: TermId,
    pub offset: u64,
    pub occurrences: u64,
    pub document_frequency: u32,
}

impl TermInfo {
    pub fn to_line(&self) -> String {
        format!("{}\t{}\t{}\t{}", self.term_id, self.offset, self.occurrences, self.document_frequency)
    }

    pub fn parse_line(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
        if fields.len() != 4 {
            bail!("term info row {line:?} has {} fields, expected 4", fields.len());
        }
        Ok(Self {
            term_id: fields[0].parse().with_context(|| format!("bad term id in {line:?}"))?,
            offset: fields[1].parse().with_context(|| format!("bad offset in {line:?}"))?,
            occurrences: fields[2].parse().with_context(|| format!("bad occurrence count in {line:?}"))?,
            document_frequency: fields[3].parse().with_context(|| format!("bad document frequency in {line:?}"))?,
        })
    }
}
