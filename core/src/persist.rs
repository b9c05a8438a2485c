use crate::index::{ForwardRecord, TermInfo};
use crate::stats::CorpusStats;
use crate::{DocId, TermId};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{create_dir_all, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub created_at: String,
    pub version: u32,
}

#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn doc_ids(&self) -> PathBuf { self.root.join("doc_ids.txt") }
    pub fn term_ids(&self) -> PathBuf { self.root.join("term_ids.txt") }
    pub fn forward_index(&self) -> PathBuf { self.root.join("forward_index.txt") }
    pub fn sorted_forward_index(&self) -> PathBuf { self.root.join("forward_index.sorted.txt") }
    pub fn inverted_index(&self) -> PathBuf { self.root.join("inverted_index.txt") }
    pub fn term_info(&self) -> PathBuf { self.root.join("term_info.txt") }
    pub fn stats(&self) -> PathBuf { self.root.join("corpus_stats.bin") }
    pub fn stop_words(&self) -> PathBuf { self.root.join("stop_words.txt") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

/// Create (or truncate) a file for writing, with a buffered writer on top.
pub fn create_writer(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    Ok(BufWriter::new(f))
}

pub fn open_reader(path: &Path) -> Result<BufReader<File>> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(BufReader::new(f))
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta()).with_context(|| format!("opening {}", paths.meta().display()))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    if meta.version != FORMAT_VERSION {
        bail!("index format version {} is not supported (expected {FORMAT_VERSION})", meta.version);
    }
    Ok(meta)
}

pub fn save_stats(paths: &IndexPaths, stats: &CorpusStats) -> Result<()> {
    let mut f = create_writer(&paths.stats())?;
    bincode::serialize_into(&mut f, stats)?;
    f.flush()?;
    Ok(())
}

pub fn load_stats(paths: &IndexPaths) -> Result<CorpusStats> {
    let f = open_reader(&paths.stats())?;
    let stats = bincode::deserialize_from(f).with_context(|| format!("decoding {}", paths.stats().display()))?;
    Ok(stats)
}

/// `id \t name` rows of the document and term tables.
fn read_id_table(path: &Path) -> Result<Vec<(u32, String)>> {
    let mut rows = Vec::new();
    for line in open_reader(path)?.lines() {
        let line = line?;
        let Some((id, name)) = line.split_once('\t') else {
            bail!("{}: row {line:?} is not `id<TAB>name`", path.display());
        };
        let id = id.parse().with_context(|| format!("{}: bad id in {line:?}", path.display()))?;
        rows.push((id, name.to_string()));
    }
    Ok(rows)
}

/// Document names indexed by dense doc id.
#[derive(Debug, Clone, Default)]
pub struct DocumentTable {
    names: Vec<String>,
}

impl DocumentTable {
    pub fn load(path: &Path) -> Result<Self> {
        let mut names = Vec::new();
        for (id, name) in read_id_table(path)? {
            if id as usize != names.len() + 1 {
                bail!("{}: doc id {id} breaks the dense id sequence", path.display());
            }
            names.push(name);
        }
        Ok(Self { names })
    }

    pub fn name(&self, doc_id: DocId) -> Option<&str> {
        let idx = (doc_id as usize).checked_sub(1)?;
        self.names.get(idx).map(String::as_str)
    }

    /// First document registered under `name`.
    pub fn id_of(&self, name: &str) -> Option<DocId> {
        self.names.iter().position(|n| n == name).map(|i| i as DocId + 1)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Stem to term id.
#[derive(Debug, Clone, Default)]
pub struct TermTable {
    ids: HashMap<String, TermId>,
}

impl TermTable {
    pub fn load(path: &Path) -> Result<Self> {
        let ids = read_id_table(path)?.into_iter().map(|(id, stem)| (stem, id)).collect();
        Ok(Self { ids })
    }

    pub fn get(&self, stem: &str) -> Option<TermId> {
        self.ids.get(stem).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

pub fn load_term_info(path: &Path) -> Result<HashMap<TermId, TermInfo>> {
    let mut table = HashMap::new();
    for line in open_reader(path)?.lines() {
        let info = TermInfo::parse_line(&line?)?;
        table.insert(info.term_id, info);
    }
    Ok(table)
}

/// Stream forward-index records from a line file.
pub fn read_forward_records(path: &Path) -> Result<impl Iterator<Item = Result<ForwardRecord>>> {
    let reader = open_reader(path)?;
    Ok(reader.lines().map(|line| -> Result<ForwardRecord> { ForwardRecord::parse_line(&line?) }))
}

pub fn count_lines(path: &Path) -> Result<usize> {
    let mut n = 0;
    for line in open_reader(path)?.lines() {
        line?;
        n += 1;
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn document_table_requires_dense_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc_ids.txt");
        fs::write(&path, "1\ta\n2\tb\n3\ta\n").unwrap();
        let docs = DocumentTable::load(&path).unwrap();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs.name(2), Some("b"));
        assert_eq!(docs.name(0), None);
        assert_eq!(docs.id_of("a"), Some(1));

        fs::write(&path, "1\ta\n3\tb\n").unwrap();
        assert!(DocumentTable::load(&path).is_err());
    }

    #[test]
    fn meta_round_trip_checks_version() {
        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let mut meta = MetaFile { num_docs: 3, num_terms: 9, created_at: "2024-01-01T00:00:00Z".into(), version: FORMAT_VERSION };
        save_meta(&paths, &meta).unwrap();
        assert_eq!(load_meta(&paths).unwrap().num_terms, 9);

        meta.version = FORMAT_VERSION + 1;
        save_meta(&paths, &meta).unwrap();
        assert!(load_meta(&paths).is_err());
    }

    #[test]
    fn malformed_table_rows_fail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("term_ids.txt");
        fs::write(&path, "1\tcat\n2 sat\n").unwrap();
        assert!(TermTable::load(&path).is_err());
    }
}
