use crate::index::TermInfo;
use crate::persist::{load_meta, load_stats, load_term_info, open_reader, DocumentTable, IndexPaths, MetaFile, TermTable};
use crate::query::{relevant_documents, ParsedQuery};
use crate::ranking::{rank, RankingModel, ScoringContext};
use crate::stats::CorpusStats;
use crate::tokenizer::{SnowballStemmer, StopWords, Tokenizer};
use crate::{DocId, TermId};
use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedDoc {
    pub doc_id: DocId,
    pub name: String,
    pub score: f64,
    pub rank: usize,
}

/// The read-only query side of a built index. The inverted index itself stays
/// on disk; every query opens its own cursor on it, so a `SearchIndex` can be
/// shared between threads.
pub struct SearchIndex {
    paths: IndexPaths,
    tokenizer: Tokenizer,
    terms: TermTable,
    documents: DocumentTable,
    term_info: HashMap<TermId, TermInfo>,
    stats: CorpusStats,
    meta: MetaFile,
}

impl SearchIndex {
    pub fn open(paths: IndexPaths) -> Result<Self> {
        let meta = load_meta(&paths)?;
        let stop_words = if paths.stop_words().is_file() {
            StopWords::from_file(&paths.stop_words())?
        } else {
            StopWords::english()
        };
        let terms = TermTable::load(&paths.term_ids())?;
        let documents = DocumentTable::load(&paths.doc_ids())?;
        let term_info = load_term_info(&paths.term_info())?;
        let stats = load_stats(&paths)?;
        tracing::info!(num_docs = meta.num_docs, num_terms = meta.num_terms, root = %paths.root.display(), "index opened");
        Ok(Self {
            paths,
            tokenizer: Tokenizer::new(stop_words, SnowballStemmer::english()),
            terms,
            documents,
            term_info,
            stats,
            meta,
        })
    }

    pub fn paths(&self) -> &IndexPaths {
        &self.paths
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn terms(&self) -> &TermTable {
        &self.terms
    }

    pub fn documents(&self) -> &DocumentTable {
        &self.documents
    }

    pub fn term_info(&self, term_id: TermId) -> Option<&TermInfo> {
        self.term_info.get(&term_id)
    }

    pub fn stats(&self) -> &CorpusStats {
        &self.stats
    }

    pub fn meta(&self) -> &MetaFile {
        &self.meta
    }

    pub fn parse_query(&self, text: &str) -> ParsedQuery {
        ParsedQuery::parse(text, &self.tokenizer, &self.terms, &self.term_info)
    }

    /// Scores of every document containing at least one query term, in rank order.
    pub fn rank(&self, query: &ParsedQuery, model: RankingModel, avg_query_length: Option<f64>) -> Result<Vec<(DocId, f64)>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let mut reader = open_reader(&self.paths.inverted_index())?;
        let relevant = relevant_documents(query, &mut reader)?;
        let ctx = ScoringContext { query, relevant: &relevant, stats: &self.stats, avg_query_length };
        Ok(rank(model.score(&ctx)))
    }

    pub fn search(&self, text: &str, model: RankingModel, avg_query_length: Option<f64>) -> Result<Vec<RankedDoc>> {
        let query = self.parse_query(text);
        let ranked = self.rank(&query, model, avg_query_length)?;
        Ok(ranked
            .into_iter()
            .enumerate()
            .map(|(i, (doc_id, score))| RankedDoc {
                doc_id,
                name: self.documents.name(doc_id).unwrap_or_default().to_string(),
                score,
                rank: i + 1,
            })
            .collect())
    }
}
