//! Lookups behind `sift-indexer info`. Each one answers `None` when the term
//! or document is unknown.

use crate::persist::read_forward_records;
use crate::postings::PostingsReader;
use crate::search::SearchIndex;
use crate::{DocId, TermId};
use anyhow::Result;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermReport {
    pub stem: String,
    pub term_id: TermId,
    pub document_frequency: u32,
    pub occurrences: u64,
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    pub doc_id: DocId,
    pub distinct_terms: u32,
    pub total_terms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermInDocument {
    pub term_id: TermId,
    pub doc_id: DocId,
    /// Absolute positions; empty when the document lacks the term.
    pub positions: Vec<u32>,
}

impl TermInDocument {
    pub fn frequency(&self) -> usize {
        self.positions.len()
    }
}

pub fn term_report(index: &SearchIndex, word: &str) -> Option<TermReport> {
    let word: String = word.trim().nfkc().collect();
    let stem = index.tokenizer().stem(&word.to_lowercase());
    let term_id = index.terms().get(&stem)?;
    let info = index.term_info(term_id)?;
    Some(TermReport {
        stem,
        term_id,
        document_frequency: info.document_frequency,
        occurrences: info.occurrences,
        offset: info.offset,
    })
}

/// Counts come from a scan of the document-major forward index.
pub fn document_report(index: &SearchIndex, name: &str) -> Result<Option<DocumentReport>> {
    let Some(doc_id) = index.documents().id_of(name) else {
        return Ok(None);
    };
    let mut report = DocumentReport { doc_id, distinct_terms: 0, total_terms: 0 };
    for record in read_forward_records(&index.paths().forward_index())? {
        let record = record?;
        if record.doc_id == doc_id {
            report.distinct_terms += 1;
            report.total_terms += record.term_frequency() as u64;
        } else if record.doc_id > doc_id {
            break;
        }
    }
    Ok(Some(report))
}

pub fn term_in_document(index: &SearchIndex, word: &str, name: &str) -> Result<Option<TermInDocument>> {
    let (Some(term), Some(doc_id)) = (term_report(index, word), index.documents().id_of(name)) else {
        return Ok(None);
    };
    let mut reader = PostingsReader::open(&index.paths().inverted_index())?;
    let list = reader.read(term.offset)?;
    let positions = list.get(doc_id).map(|p| p.positions.clone()).unwrap_or_default();
    Ok(Some(TermInDocument { term_id: term.term_id, doc_id, positions }))
}
