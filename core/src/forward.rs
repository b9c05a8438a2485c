use crate::extract::prepare_document;
use crate::index::ForwardRecord;
use crate::registry::Registry;
use crate::tokenizer::Tokenizer;
use crate::DocId;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Readable files directly under `dir`, ordered by file name. Other entries
/// are reported and left out.
pub fn list_corpus(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(%err, "skipping unreadable corpus entry");
                continue;
            }
        };
        if entry.path().is_file() {
            files.push(entry.into_path());
        } else {
            tracing::warn!(path = %entry.path().display(), "skipping non-file corpus entry");
        }
    }
    Ok(files)
}

/// Stems of one document with their positions, in first-seen order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DocumentTerms {
    entries: Vec<(String, Vec<u32>)>,
    slots: HashMap<String, usize>,
}

impl DocumentTerms {
    pub fn from_tokens(tokens: impl IntoIterator<Item = (String, u32)>) -> Self {
        let mut terms = Self::default();
        for (stem, pos) in tokens {
            match terms.slots.get(&stem) {
                Some(&slot) => terms.entries[slot].1.push(pos),
                None => {
                    terms.slots.insert(stem.clone(), terms.entries.len());
                    terms.entries.push((stem, vec![pos]));
                }
            }
        }
        terms
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u32])> {
        self.entries.iter().map(|(s, p)| (s.as_str(), p.as_slice()))
    }
}

pub fn analyze_document(tokenizer: &Tokenizer, bytes: &[u8]) -> DocumentTerms {
    let text = prepare_document(bytes);
    DocumentTerms::from_tokens(tokenizer.tokens(&text))
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ForwardSummary {
    pub documents: u32,
    pub skipped: u32,
    pub records: u64,
}

/// Serialized append step of the forward index: id assignment plus one line
/// per distinct term of each document.
pub struct ForwardIndexWriter<'r, W: Write, T: Write> {
    registry: &'r Registry<T>,
    out: W,
    summary: ForwardSummary,
}

impl<'r, W: Write, T: Write> ForwardIndexWriter<'r, W, T> {
    pub fn new(registry: &'r Registry<T>, out: W) -> Self {
        Self { registry, out, summary: ForwardSummary::default() }
    }

    pub fn add_document(&mut self, name: &str, terms: &DocumentTerms) -> Result<DocId> {
        let doc_id = self.registry.register_document(name)?;
        for (stem, positions) in terms.iter() {
            let term_id = self.registry.register_term(stem)?;
            let record = ForwardRecord::new(doc_id, term_id, positions.to_vec());
            writeln!(self.out, "{}", record.to_line())?;
            self.summary.records += 1;
        }
        self.summary.documents += 1;
        Ok(doc_id)
    }

    pub fn skip_document(&mut self) {
        self.summary.skipped += 1;
    }

    pub fn finish(mut self) -> Result<ForwardSummary> {
        self.out.flush()?;
        Ok(self.summary)
    }
}

/// Tokenize `files` in parallel batches and append them in list order.
pub fn build_forward_index<W: Write, T: Write>(
    files: &[PathBuf],
    tokenizer: &Tokenizer,
    registry: &Registry<T>,
    out: W,
    batch_size: usize,
) -> Result<ForwardSummary> {
    let mut writer = ForwardIndexWriter::new(registry, out);
    for batch in files.chunks(batch_size.max(1)) {
        let analyzed: Vec<Result<DocumentTerms>> = batch
            .par_iter()
            .map(|path| {
                let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
                Ok(analyze_document(tokenizer, &bytes))
            })
            .collect();
        for (path, terms) in batch.iter().zip(analyzed) {
            match terms {
                Ok(terms) => {
                    let name = document_name(path);
                    writer.add_document(&name, &terms)?;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable document");
                    writer.skip_document();
                }
            }
        }
    }
    writer.finish()
}

fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::SnowballStemmer;

    #[test]
    fn terms_keep_first_seen_order() {
        let terms = DocumentTerms::from_tokens(vec![
            ("b".to_string(), 1),
            ("a".to_string(), 2),
            ("b".to_string(), 3),
        ]);
        let got: Vec<_> = terms.iter().map(|(s, p)| (s.to_string(), p.to_vec())).collect();
        assert_eq!(got, vec![("b".to_string(), vec![1, 3]), ("a".to_string(), vec![2])]);
    }

    #[test]
    fn two_document_forward_index() {
        let tokenizer = Tokenizer::new(["the"].into_iter().collect(), SnowballStemmer::english());
        let registry = Registry::new(Vec::new(), Vec::new());
        let mut writer = ForwardIndexWriter::new(&registry, Vec::new());
        writer.add_document("doc1", &analyze_document(&tokenizer, b"the cat sat")).unwrap();
        writer.add_document("doc2", &analyze_document(&tokenizer, b"the cat ran")).unwrap();
        let out = String::from_utf8(writer.out.clone()).unwrap();
        assert_eq!(out, "1\t1\t1\n1\t2\t2\n2\t1\t1\n2\t3\t2\n");
        assert_eq!(registry.term_id("ran"), Some(3));
    }
}
