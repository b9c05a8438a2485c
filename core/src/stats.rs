use crate::index::{ForwardRecord, TermInfo};
use crate::tokenizer::Tokenizer;
use crate::{DocId, TermId};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Aggregate counts the ranking models need, collected once after the build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusStats {
    /// Registered documents, including ones without any retained token.
    pub num_docs: u32,
    pub vocabulary_size: u32,
    pub corpus_term_count: u64,
    pub avg_doc_length: f64,
    pub doc_lengths: HashMap<DocId, u32>,
    /// Every term of every document with its frequency.
    pub doc_terms: HashMap<DocId, Vec<(TermId, u32)>>,
    pub document_frequency: HashMap<TermId, u32>,
    pub term_occurrences: HashMap<TermId, u64>,
}

impl CorpusStats {
    pub fn doc_length(&self, doc_id: DocId) -> u32 {
        self.doc_lengths.get(&doc_id).copied().unwrap_or(0)
    }

    pub fn doc_terms(&self, doc_id: DocId) -> &[(TermId, u32)] {
        self.doc_terms.get(&doc_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn document_frequency(&self, term_id: TermId) -> u32 {
        self.document_frequency.get(&term_id).copied().unwrap_or(0)
    }

    pub fn term_occurrences(&self, term_id: TermId) -> u64 {
        self.term_occurrences.get(&term_id).copied().unwrap_or(0)
    }
}

/// Rebuilds per-document term counts from the document-major forward index.
#[derive(Debug, Default)]
pub struct StatsCollector {
    stats: CorpusStats,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: &ForwardRecord) {
        let tf = record.term_frequency();
        *self.stats.doc_lengths.entry(record.doc_id).or_insert(0) += tf;
        self.stats.doc_terms.entry(record.doc_id).or_default().push((record.term_id, tf));
        self.stats.corpus_term_count += tf as u64;
    }

    pub fn finish<'a>(
        mut self,
        num_docs: u32,
        vocabulary_size: u32,
        term_info: impl IntoIterator<Item = &'a TermInfo>,
    ) -> CorpusStats {
        for info in term_info {
            self.stats.document_frequency.insert(info.term_id, info.document_frequency);
            self.stats.term_occurrences.insert(info.term_id, info.occurrences);
        }
        self.stats.num_docs = num_docs;
        self.stats.vocabulary_size = vocabulary_size;
        self.stats.avg_doc_length = if num_docs == 0 {
            0.0
        } else {
            self.stats.corpus_term_count as f64 / num_docs as f64
        };
        self.stats
    }
}

pub fn collect_stats<'a, R>(
    forward: R,
    num_docs: u32,
    vocabulary_size: u32,
    term_info: impl IntoIterator<Item = &'a TermInfo>,
) -> Result<CorpusStats>
where
    R: IntoIterator<Item = Result<ForwardRecord>>,
{
    let mut collector = StatsCollector::new();
    for record in forward {
        collector.push(&record?);
    }
    Ok(collector.finish(num_docs, vocabulary_size, term_info))
}

/// Mean count of non-stop-word query tokens over a query set.
pub fn average_query_length<'q>(queries: impl IntoIterator<Item = &'q str>, tokenizer: &Tokenizer) -> f64 {
    let (mut total, mut count) = (0usize, 0usize);
    for q in queries {
        total += tokenizer.query_length(q);
        count += 1;
    }
    if count == 0 { 0.0 } else { total as f64 / count as f64 }
}
