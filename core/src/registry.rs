//! Dense id assignment for terms and documents during the build.

use crate::{DocId, TermId};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Write;

struct Inner<W: Write> {
    terms: HashMap<String, TermId>,
    next_term_id: TermId,
    next_doc_id: DocId,
    term_out: W,
    doc_out: W,
}

/// Single owner of the id counters. Each first assignment is appended to the
/// matching `id \t name` table.
pub struct Registry<W: Write> {
    inner: Mutex<Inner<W>>,
}

impl<W: Write> Registry<W> {
    pub fn new(term_out: W, doc_out: W) -> Self {
        Self {
            inner: Mutex::new(Inner {
                terms: HashMap::new(),
                next_term_id: 1,
                next_doc_id: 1,
                term_out,
                doc_out,
            }),
        }
    }

    /// Always allocates a fresh id, even when `name` was seen before.
    pub fn register_document(&self, name: &str) -> Result<DocId> {
        let mut inner = self.inner.lock();
        let id = inner.next_doc_id;
        writeln!(inner.doc_out, "{id}\t{name}").context("appending to document id table")?;
        inner.next_doc_id += 1;
        Ok(id)
    }

    pub fn register_term(&self, stem: &str) -> Result<TermId> {
        let mut inner = self.inner.lock();
        if let Some(&id) = inner.terms.get(stem) {
            return Ok(id);
        }
        let id = inner.next_term_id;
        writeln!(inner.term_out, "{id}\t{stem}").context("appending to term id table")?;
        inner.next_term_id += 1;
        inner.terms.insert(stem.to_string(), id);
        Ok(id)
    }

    pub fn term_id(&self, stem: &str) -> Option<TermId> {
        self.inner.lock().terms.get(stem).copied()
    }

    pub fn num_terms(&self) -> usize {
        self.inner.lock().terms.len()
    }

    pub fn num_documents(&self) -> usize {
        (self.inner.lock().next_doc_id - 1) as usize
    }

    /// Flush both tables and hand the writers back.
    pub fn finish(self) -> Result<(W, W)> {
        let mut inner = self.inner.into_inner();
        inner.term_out.flush()?;
        inner.doc_out.flush()?;
        Ok((inner.term_out, inner.doc_out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_stem_same_id() {
        let reg = Registry::new(Vec::new(), Vec::new());
        let a = reg.register_term("cat").unwrap();
        let b = reg.register_term("sat").unwrap();
        assert_eq!(reg.register_term("cat").unwrap(), a);
        assert_ne!(a, b);
        assert_eq!((a, b), (1, 2));
        assert_eq!(reg.num_terms(), 2);
    }

    #[test]
    fn documents_are_never_deduplicated() {
        let reg = Registry::new(Vec::new(), Vec::new());
        assert_eq!(reg.register_document("a.html").unwrap(), 1);
        assert_eq!(reg.register_document("a.html").unwrap(), 2);
        let (_, docs) = reg.finish().unwrap();
        assert_eq!(String::from_utf8(docs).unwrap(), "1\ta.html\n2\ta.html\n");
    }

    #[test]
    fn tables_only_record_first_assignment() {
        let reg = Registry::new(Vec::new(), Vec::new());
        for stem in ["cat", "sat", "cat", "ran", "sat"] {
            reg.register_term(stem).unwrap();
        }
        let (terms, _) = reg.finish().unwrap();
        assert_eq!(String::from_utf8(terms).unwrap(), "1\tcat\n2\tsat\n3\tran\n");
    }
}
