use sift_core::inspect::{document_report, term_in_document, term_report};
use sift_core::persist::{load_term_info, read_forward_records, IndexPaths};
use sift_core::pipeline::{build_index, BuildOptions};
use sift_core::postings::PostingsReader;
use sift_core::query::{load_queries, Query};
use sift_core::ranking::RankingModel;
use sift_core::stats::average_query_length;
use sift_core::{ForwardRecord, SearchIndex};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const NEWS: &[(&str, &str)] = &[
    ("AP-001", "Stock markets rallied as investors cheered the rate cut. Markets in Asia followed."),
    ("AP-002", "The central bank cut interest rates again; the bank said inflation was easing."),
    ("AP-003", "<html><body><p>Storms flooded coastal towns.</p><script>track()</script></body></html>"),
    ("AP-004", "Header: one\n\nHeader: two\n\nInvestors sold bank stocks after the bank warned on profits."),
    ("AP-005", "the of and"),
];

fn write_corpus(docs: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, body) in docs {
        fs::write(dir.path().join(name), body).unwrap();
    }
    dir
}

fn build(docs: &[(&str, &str)], options: BuildOptions) -> (TempDir, TempDir, IndexPaths) {
    let corpus = write_corpus(docs);
    let out = tempfile::tempdir().unwrap();
    let paths = IndexPaths::new(out.path());
    build_index(corpus.path(), &paths, &options).unwrap();
    (corpus, out, paths)
}

fn records(path: &Path) -> Vec<ForwardRecord> {
    read_forward_records(path).unwrap().collect::<anyhow::Result<Vec<_>>>().unwrap()
}

#[test]
fn two_document_scenario() {
    let stop_dir = tempfile::tempdir().unwrap();
    let stop = stop_dir.path().join("stop.txt");
    fs::write(&stop, "the\n").unwrap();
    let options = BuildOptions { stop_words: Some(stop), ..Default::default() };
    let (_corpus, _out, paths) = build(&[("doc1", "the cat sat"), ("doc2", "the cat ran")], options);

    assert_eq!(fs::read_to_string(paths.term_ids()).unwrap(), "1\tcat\n2\tsat\n3\tran\n");
    assert_eq!(fs::read_to_string(paths.doc_ids()).unwrap(), "1\tdoc1\n2\tdoc2\n");
    assert_eq!(fs::read_to_string(paths.forward_index()).unwrap(), "1\t1\t1\n1\t2\t2\n2\t1\t1\n2\t3\t2\n");
    assert_eq!(fs::read_to_string(paths.stop_words()).unwrap(), "the\n");
}

#[test]
fn sorted_forward_index_is_term_major() {
    let (_corpus, _out, paths) = build(NEWS, BuildOptions { chunk_len: 3, ..Default::default() });
    let sorted = records(&paths.sorted_forward_index());
    assert_eq!(sorted.len(), records(&paths.forward_index()).len());
    assert!(sorted.windows(2).all(|w| w[0].term_doc_key() <= w[1].term_doc_key()));
}

#[test]
fn postings_round_trip_forward_positions() {
    let (_corpus, _out, paths) = build(NEWS, BuildOptions { chunk_len: 4, ..Default::default() });
    let info = load_term_info(&paths.term_info()).unwrap();
    let mut reader = PostingsReader::open(&paths.inverted_index()).unwrap();

    for record in records(&paths.forward_index()) {
        let list = reader.read(info[&record.term_id].offset).unwrap();
        let posting = list.get(record.doc_id).expect("document missing from postings");
        assert_eq!(posting.positions, record.positions);
    }
}

#[test]
fn term_info_offsets_and_counts_match_postings() {
    let (_corpus, _out, paths) = build(NEWS, BuildOptions::default());
    let info = load_term_info(&paths.term_info()).unwrap();
    let mut reader = PostingsReader::open(&paths.inverted_index()).unwrap();
    assert!(!info.is_empty());

    for (term_id, row) in &info {
        let list = reader.read(row.offset).unwrap();
        assert_eq!(list.term_id, *term_id);
        assert_eq!(list.document_frequency(), row.document_frequency);
        assert_eq!(list.occurrences(), row.occurrences);
    }
}

#[test]
fn stop_word_only_document_still_counts() {
    let (_corpus, _out, paths) = build(NEWS, BuildOptions::default());
    let index = SearchIndex::open(paths).unwrap();
    assert_eq!(index.meta().num_docs, 5);
    assert_eq!(index.stats().num_docs, 5);
    assert_eq!(index.stats().doc_length(5), 0);
    assert_eq!(index.documents().name(5), Some("AP-005"));
}

#[test]
fn non_file_entries_are_skipped() {
    let corpus = write_corpus(&NEWS[..2]);
    fs::create_dir(corpus.path().join("nested")).unwrap();
    let out = tempfile::tempdir().unwrap();
    let summary = build_index(corpus.path(), &IndexPaths::new(out.path()), &BuildOptions::default()).unwrap();
    assert_eq!(summary.num_docs, 2);
}

#[test]
fn every_model_ranks_the_bank_documents() {
    let (_corpus, _out, paths) = build(NEWS, BuildOptions { chunk_len: 2, ..Default::default() });
    let index = SearchIndex::open(paths).unwrap();

    for model in RankingModel::ALL {
        let hits = index.search("bank interest rates", model, Some(2.0)).unwrap();
        let names: Vec<&str> = hits.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names.len(), 3, "{model}: {names:?}");
        assert_eq!(names[0], "AP-002", "{model}: {names:?}");
        assert!(names.contains(&"AP-004"));
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(hits.iter().map(|h| h.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}

#[test]
fn unknown_terms_contribute_nothing() {
    let (_corpus, _out, paths) = build(NEWS, BuildOptions::default());
    let index = SearchIndex::open(paths).unwrap();
    assert!(index.search("zeppelin", RankingModel::Bm25, None).unwrap().is_empty());
    let with_noise = index.search("storms zeppelin", RankingModel::Bm25, None).unwrap();
    let plain = index.search("storms", RankingModel::Bm25, None).unwrap();
    assert_eq!(with_noise, plain);
    assert_eq!(plain[0].name, "AP-003");
}

#[test]
fn ligature_query_matches_normalized_document() {
    let (_corpus, _out, paths) = build(&[("r1", "\u{FB01}nance report"), ("r2", "weather report")], BuildOptions::default());
    let index = SearchIndex::open(paths).unwrap();

    let ligature = index.search("\u{FB01}nance", RankingModel::Bm25, None).unwrap();
    let ascii = index.search("finance", RankingModel::Bm25, None).unwrap();
    assert_eq!(ligature.len(), 1);
    assert_eq!(ligature, ascii);
    assert_eq!(ligature[0].name, "r1");
}

#[test]
fn html_script_text_is_not_indexed() {
    let (_corpus, _out, paths) = build(NEWS, BuildOptions::default());
    let index = SearchIndex::open(paths).unwrap();
    assert!(term_report(&index, "track").is_none());
    assert!(term_report(&index, "Header").is_none());
}

#[test]
fn inspection_reports() {
    let (_corpus, _out, paths) = build(NEWS, BuildOptions::default());
    let index = SearchIndex::open(paths).unwrap();

    let bank = term_report(&index, "Bank").unwrap();
    assert_eq!(bank.stem, "bank");
    assert_eq!(bank.document_frequency, 2);
    assert_eq!(bank.occurrences, 4);

    let doc = document_report(&index, "AP-002").unwrap().unwrap();
    assert_eq!(doc.doc_id, 2);
    assert_eq!(doc.total_terms, index.stats().doc_length(2) as u64);
    assert!(document_report(&index, "AP-999").unwrap().is_none());

    let hit = term_in_document(&index, "banks", "AP-004").unwrap().unwrap();
    assert_eq!(hit.frequency(), 2);
    assert!(hit.positions.windows(2).all(|w| w[0] < w[1]));
    let miss = term_in_document(&index, "bank", "AP-003").unwrap().unwrap();
    assert_eq!(miss.frequency(), 0);
    assert!(term_in_document(&index, "zeppelin", "AP-003").unwrap().is_none());
}

#[test]
fn query_files_and_average_length() {
    let dir = tempfile::tempdir().unwrap();
    let tsv = dir.path().join("queries.tsv");
    fs::write(&tsv, "7\tthe bank rates\n9\tstorms\n").unwrap();
    let xml = dir.path().join("topics.xml");
    fs::write(&xml, r#"<topics><topic number="7"><query>the bank rates</query></topic></topics>"#).unwrap();

    let from_tsv = load_queries(&tsv).unwrap();
    let from_xml = load_queries(&xml).unwrap();
    assert_eq!(from_tsv[0], from_xml[0]);
    assert_eq!(from_tsv[1], Query { id: "9".into(), text: "storms".into() });

    let tokenizer = sift_core::tokenizer::Tokenizer::english();
    let avg = average_query_length(from_tsv.iter().map(|q| q.text.as_str()), &tokenizer);
    assert!((avg - 1.5).abs() < 1e-12);
}

#[test]
fn relevant_documents_cover_every_query_term() {
    let (_corpus, _out, paths) = build(NEWS, BuildOptions::default());
    let index = SearchIndex::open(paths).unwrap();
    let query = index.parse_query("markets investors");
    assert_eq!(query.terms.len(), 2);

    let mut reader = sift_core::persist::open_reader(&index.paths().inverted_index()).unwrap();
    let relevant = sift_core::query::relevant_documents(&query, &mut reader).unwrap();
    let docs: HashMap<u32, usize> = relevant.iter().map(|(d, tf)| (*d, tf.len())).collect();
    assert_eq!(docs, HashMap::from([(1, 2), (4, 1)]));
}
