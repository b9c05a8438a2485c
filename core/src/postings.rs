use crate::{DocId, TermId};
use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: DocId,
    /// Absolute 1-based positions.
    pub positions: Vec<u32>,
}

impl Posting {
    pub fn term_frequency(&self) -> u32 {
        self.positions.len() as u32
    }
}

/// Decoded inverted-index line, ordered by ascending doc id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingsList {
    pub term_id: TermId,
    pub postings: Vec<Posting>,
}

impl PostingsList {
    pub fn document_frequency(&self) -> u32 {
        self.postings.len() as u32
    }

    pub fn occurrences(&self) -> u64 {
        self.postings.iter().map(|p| p.positions.len() as u64).sum()
    }

    pub fn get(&self, doc_id: DocId) -> Option<&Posting> {
        self.postings
            .binary_search_by_key(&doc_id, |p| p.doc_id)
            .ok()
            .map(|i| &self.postings[i])
    }
}

fn parse_gap(token: &str) -> Result<(u32, u32)> {
    let Some((doc, pos)) = token.split_once(':') else {
        bail!("postings token {token:?} is not gap:value");
    };
    let doc = doc.parse().with_context(|| format!("bad doc gap in {token:?}"))?;
    let pos = pos.parse().with_context(|| format!("bad position gap in {token:?}"))?;
    Ok((doc, pos))
}

/// Undo the gap encoding of one inverted-index line.
pub fn decode_line(line: &str) -> Result<PostingsList> {
    let mut tokens = line.trim_end_matches(['\r', '\n']).split('\t');
    let term_id = match tokens.next() {
        Some(t) if !t.is_empty() => t.parse().with_context(|| format!("bad term id {t:?}"))?,
        _ => bail!("empty postings line"),
    };
    let mut postings: Vec<Posting> = Vec::new();
    let mut doc_id: DocId = 0;
    let mut position = 0u32;
    for token in tokens {
        let (doc_gap, gap) = parse_gap(token)?;
        if doc_gap != 0 {
            doc_id += doc_gap;
            position = gap;
            postings.push(Posting { doc_id, positions: vec![position] });
        } else {
            let Some(current) = postings.last_mut() else {
                bail!("postings for term {term_id} start with a same-document gap");
            };
            position += gap;
            current.positions.push(position);
        }
    }
    Ok(PostingsList { term_id, postings })
}

/// Seek to `offset` and decode the single postings line found there.
pub fn read_postings<R: BufRead + Seek>(reader: &mut R, offset: u64) -> Result<PostingsList> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        bail!("offset {offset} is past the end of the inverted index");
    }
    decode_line(&line)
}

/// Independent cursor over an inverted index file.
pub struct PostingsReader {
    reader: BufReader<File>,
}

impl PostingsReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening inverted index {}", path.display()))?;
        Ok(Self { reader: BufReader::new(file) })
    }

    pub fn read(&mut self, offset: u64) -> Result<PostingsList> {
        read_postings(&mut self.reader, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn decodes_documents_and_positions() {
        let list = decode_line("1\t2:3\t0:4\t0:1\t3:1\n").unwrap();
        assert_eq!(list.term_id, 1);
        assert_eq!(
            list.postings,
            vec![
                Posting { doc_id: 2, positions: vec![3, 7, 8] },
                Posting { doc_id: 5, positions: vec![1] },
            ]
        );
        assert_eq!(list.document_frequency(), 2);
        assert_eq!(list.occurrences(), 4);
        assert_eq!(list.get(5).map(Posting::term_frequency), Some(1));
        assert!(list.get(3).is_none());
    }

    #[test]
    fn seeks_to_offset() {
        let data = "1\t1:1\n2\t1:2\t1:1\n";
        let mut cursor = Cursor::new(data.as_bytes());
        let list = read_postings(&mut cursor, 6).unwrap();
        assert_eq!(list.term_id, 2);
        assert_eq!(list.postings.iter().map(|p| p.doc_id).collect::<Vec<_>>(), vec![1, 2]);
        assert!(read_postings(&mut cursor, data.len() as u64).is_err());
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(decode_line("1\t0:3").is_err());
        assert!(decode_line("1\t2-3").is_err());
        assert!(decode_line("").is_err());
    }
}
