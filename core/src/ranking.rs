//! The five scoring models. Each is a pure function of one query's relevant
//! documents and the corpus statistics.

use crate::query::{ParsedQuery, RelevantDocuments};
use crate::stats::CorpusStats;
use crate::{DocId, TermId};
use anyhow::{bail, Error};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

const BM25_K1: f64 = 1.2;
const BM25_B: f64 = 0.75;
const BM25_K2: f64 = 100.0;
const JM_LAMBDA: f64 = 0.2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RankingModel {
    OkapiTf,
    TfIdf,
    #[default]
    Bm25,
    Laplace,
    JelinekMercer,
}

impl RankingModel {
    pub const ALL: [RankingModel; 5] = [
        RankingModel::OkapiTf,
        RankingModel::TfIdf,
        RankingModel::Bm25,
        RankingModel::Laplace,
        RankingModel::JelinekMercer,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RankingModel::OkapiTf => "okapi-tf",
            RankingModel::TfIdf => "tf-idf",
            RankingModel::Bm25 => "bm25",
            RankingModel::Laplace => "laplace",
            RankingModel::JelinekMercer => "jelinek-mercer",
        }
    }

    pub fn score(self, ctx: &ScoringContext<'_>) -> HashMap<DocId, f64> {
        match self {
            RankingModel::OkapiTf => ctx.cosine(false),
            RankingModel::TfIdf => ctx.cosine(true),
            RankingModel::Bm25 => ctx.bm25(),
            RankingModel::Laplace => ctx.laplace(),
            RankingModel::JelinekMercer => ctx.jelinek_mercer(),
        }
    }
}

impl fmt::Display for RankingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RankingModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let model = match s.trim().to_ascii_lowercase().as_str() {
            "okapi-tf" | "okapi" | "1" => RankingModel::OkapiTf,
            "tf-idf" | "tfidf" | "2" => RankingModel::TfIdf,
            "bm25" | "3" => RankingModel::Bm25,
            "laplace" | "4" => RankingModel::Laplace,
            "jelinek-mercer" | "jm" | "5" => RankingModel::JelinekMercer,
            other => bail!("unknown ranking model {other:?} (expected okapi-tf, tf-idf, bm25, laplace, jelinek-mercer or 1-5)"),
        };
        Ok(model)
    }
}

/// `len / avg`, or 1 when there is no average to normalize against.
fn length_ratio(len: f64, avg: f64) -> f64 {
    if avg > 0.0 { len / avg } else { 1.0 }
}

fn okapi(f: f64, len: f64, avg: f64) -> f64 {
    f / (f + 0.5 + 1.5 * length_ratio(len, avg))
}

/// Everything one query needs to be scored.
pub struct ScoringContext<'a> {
    pub query: &'a ParsedQuery,
    pub relevant: &'a RelevantDocuments,
    pub stats: &'a CorpusStats,
    /// Average length over the query set. Without it a query is its own average.
    pub avg_query_length: Option<f64>,
}

impl<'a> ScoringContext<'a> {
    fn query_frequency(&self, term_id: TermId) -> f64 {
        self.query.frequency(term_id) as f64
    }

    fn idf(&self, term_id: TermId) -> f64 {
        let df = self.stats.document_frequency(term_id);
        if df == 0 {
            return 0.0;
        }
        (self.stats.num_docs as f64 / df as f64).log2()
    }

    fn query_vector(&self, weighted: bool) -> HashMap<TermId, f64> {
        let len = self.query.length() as f64;
        let avg = self.avg_query_length.unwrap_or(len);
        self.query
            .terms
            .iter()
            .map(|t| {
                let mut w = okapi(t.frequency as f64, len, avg);
                if weighted {
                    w *= self.idf(t.term_id);
                }
                (t.term_id, w)
            })
            .collect()
    }

    /// Cosine between the Okapi-TF query and document vectors, optionally
    /// idf weighted. Document magnitude covers every term of the document.
    fn cosine(&self, weighted: bool) -> HashMap<DocId, f64> {
        let query = self.query_vector(weighted);
        let query_norm = query.values().map(|w| w * w).sum::<f64>().sqrt();
        let avg = self.stats.avg_doc_length;

        let mut scores = HashMap::with_capacity(self.relevant.len());
        for (&doc_id, freqs) in self.relevant {
            let len = self.stats.doc_length(doc_id) as f64;
            let doc_weight = |term_id: TermId, f: u32| {
                let w = okapi(f as f64, len, avg);
                if weighted { w * self.idf(term_id) } else { w }
            };
            let doc_norm = self
                .stats
                .doc_terms(doc_id)
                .iter()
                .map(|&(t, f)| doc_weight(t, f).powi(2))
                .sum::<f64>()
                .sqrt();
            let dot: f64 = freqs
                .iter()
                .filter_map(|(t, &f)| query.get(t).map(|qw| qw * doc_weight(*t, f)))
                .sum();
            let score = if query_norm == 0.0 || doc_norm == 0.0 { 0.0 } else { dot / (query_norm * doc_norm) };
            scores.insert(doc_id, score);
        }
        scores
    }

    fn bm25(&self) -> HashMap<DocId, f64> {
        let n = self.stats.num_docs as f64;
        let avg = self.stats.avg_doc_length;
        let mut scores = HashMap::with_capacity(self.relevant.len());
        for (&doc_id, freqs) in self.relevant {
            let len = self.stats.doc_length(doc_id) as f64;
            let k = BM25_K1 * ((1.0 - BM25_B) + BM25_B * length_ratio(len, avg));
            let score = self
                .query
                .terms
                .iter()
                .map(|t| {
                    let df = self.stats.document_frequency(t.term_id) as f64;
                    let fd = freqs.get(&t.term_id).copied().unwrap_or(0) as f64;
                    let fq = self.query_frequency(t.term_id);
                    let idf = ((n + 0.5) / (df + 0.5)).log2();
                    idf * ((1.0 + BM25_K1) * fd) / (k + fd) * ((1.0 + BM25_K2) * fq) / (BM25_K2 + fq)
                })
                .sum();
            scores.insert(doc_id, score);
        }
        scores
    }

    fn laplace(&self) -> HashMap<DocId, f64> {
        let vocabulary = self.stats.vocabulary_size as f64;
        let mut scores = HashMap::with_capacity(self.relevant.len());
        for (&doc_id, freqs) in self.relevant {
            let len = self.stats.doc_length(doc_id) as f64;
            let score = self
                .query
                .terms
                .iter()
                .map(|t| {
                    let fd = freqs.get(&t.term_id).copied().unwrap_or(0) as f64;
                    ((fd + 1.0) / (len + vocabulary)).log2()
                })
                .sum();
            scores.insert(doc_id, score);
        }
        scores
    }

    /// `Pcorpus` is one value per query: the summed corpus occurrences of the
    /// distinct query terms over the corpus term count. A word repeated in the
    /// query adds its occurrences once, not once per repetition.
    fn jelinek_mercer(&self) -> HashMap<DocId, f64> {
        let p_corpus = if self.stats.corpus_term_count == 0 {
            0.0
        } else {
            self.query.corpus_occurrences() as f64 / self.stats.corpus_term_count as f64
        };
        let mut scores = HashMap::with_capacity(self.relevant.len());
        for (&doc_id, freqs) in self.relevant {
            let len = self.stats.doc_length(doc_id) as f64;
            let score = self
                .query
                .terms
                .iter()
                .map(|t| {
                    let fd = freqs.get(&t.term_id).copied().unwrap_or(0) as f64;
                    let p_doc = if len > 0.0 { fd / len } else { 0.0 };
                    (JM_LAMBDA * p_doc + (1.0 - JM_LAMBDA) * p_corpus).ln()
                })
                .sum();
            scores.insert(doc_id, score);
        }
        scores
    }
}

/// Descending score, ties broken by ascending doc id.
pub fn rank(scores: HashMap<DocId, f64>) -> Vec<(DocId, f64)> {
    let mut ranked: Vec<(DocId, f64)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked
}
