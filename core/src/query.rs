use crate::index::TermInfo;
use crate::persist::TermTable;
use crate::postings::read_postings;
use crate::tokenizer::Tokenizer;
use crate::{DocId, TermId};
use anyhow::{bail, Context, Result};
use lazy_static::lazy_static;
use scraper::{Html, Selector};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{BufRead, Seek};
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref TOPIC: Selector = Selector::parse("topic").expect("valid selector");
    static ref QUERY: Selector = Selector::parse("query").expect("valid selector");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub id: String,
    pub text: String,
}

/// `<topic number="ID"><query>TEXT</query></topic>` elements, in file order.
pub fn parse_topics(xml: &str) -> Vec<Query> {
    let doc = Html::parse_document(xml);
    doc.select(&TOPIC)
        .filter_map(|topic| {
            let id = topic.value().attr("number")?.trim().to_string();
            let text = topic.select(&QUERY).next()?.text().collect::<String>();
            Some(Query { id, text: text.trim().to_string() })
        })
        .collect()
}

/// `queryId \t text` lines; blank lines are skipped.
pub fn parse_query_lines(text: &str) -> Result<Vec<Query>> {
    let mut queries = Vec::new();
    for (n, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let Some((id, q)) = line.split_once('\t') else {
            bail!("query line {} has no tab-separated id", n + 1);
        };
        queries.push(Query { id: id.trim().to_string(), text: q.trim().to_string() });
    }
    Ok(queries)
}

pub fn load_queries(path: &Path) -> Result<Vec<Query>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading queries from {}", path.display()))?;
    let is_xml = path.extension().and_then(|e| e.to_str()).map_or(false, |e| e.eq_ignore_ascii_case("xml"));
    if is_xml {
        Ok(parse_topics(&text))
    } else {
        parse_query_lines(&text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryTerm {
    pub term_id: TermId,
    /// Occurrences of the term in the query.
    pub frequency: u32,
    pub info: TermInfo,
}

/// Distinct indexed terms of a query, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedQuery {
    pub terms: Vec<QueryTerm>,
}

impl ParsedQuery {
    pub fn parse(
        text: &str,
        tokenizer: &Tokenizer,
        term_ids: &TermTable,
        term_info: &HashMap<TermId, TermInfo>,
    ) -> Self {
        let text: String = text.nfkc().collect();
        let mut terms: Vec<QueryTerm> = Vec::new();
        for (stem, _) in tokenizer.tokens(&text) {
            let Some(term_id) = term_ids.get(&stem) else {
                tracing::debug!(stem = %stem, "query term not in index");
                continue;
            };
            if let Some(t) = terms.iter_mut().find(|t| t.term_id == term_id) {
                t.frequency += 1;
                continue;
            }
            match term_info.get(&term_id) {
                Some(&info) => terms.push(QueryTerm { term_id, frequency: 1, info }),
                None => tracing::warn!(term_id, "term has no postings entry"),
            }
        }
        Self { terms }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Resolved query-term occurrences.
    pub fn length(&self) -> u32 {
        self.terms.iter().map(|t| t.frequency).sum()
    }

    pub fn frequency(&self, term_id: TermId) -> u32 {
        self.terms.iter().find(|t| t.term_id == term_id).map_or(0, |t| t.frequency)
    }

    /// Summed corpus occurrences of the query terms.
    pub fn corpus_occurrences(&self) -> u64 {
        self.terms.iter().map(|t| t.info.occurrences).sum()
    }
}

/// Term frequencies of the query terms, per document containing at least one.
pub type RelevantDocuments = BTreeMap<DocId, HashMap<TermId, u32>>;

pub fn relevant_documents<R: BufRead + Seek>(query: &ParsedQuery, reader: &mut R) -> Result<RelevantDocuments> {
    let mut relevant = RelevantDocuments::new();
    for term in &query.terms {
        let list = read_postings(reader, term.info.offset)?;
        if list.term_id != term.term_id {
            bail!(
                "offset {} holds postings for term {}, expected {}",
                term.info.offset,
                list.term_id,
                term.term_id
            );
        }
        for posting in list.postings {
            relevant.entry(posting.doc_id).or_default().insert(term.term_id, posting.term_frequency());
        }
    }
    Ok(relevant)
}
