use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use sift_core::external_sort::DEFAULT_CHUNK_LEN;
use sift_core::inspect::{document_report, term_in_document, term_report};
use sift_core::persist::IndexPaths;
use sift_core::pipeline::{build_index, BuildOptions, DEFAULT_BATCH_SIZE};
use sift_core::SearchIndex;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "sift-indexer")]
#[command(about = "Build and inspect a positional inverted index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build every index file from a directory of documents
    Build {
        /// Corpus directory; each regular file directly inside it is one document
        #[arg(long)]
        corpus: PathBuf,
        /// Output index directory
        #[arg(long)]
        output: PathBuf,
        /// Stop-word file, one word per line (built-in English list otherwise)
        #[arg(long)]
        stop_words: Option<PathBuf>,
        /// Forward records per external-sort chunk
        #[arg(long, default_value_t = DEFAULT_CHUNK_LEN)]
        chunk_records: usize,
        /// Documents tokenized in parallel per batch
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        /// Directory for sort spill files
        #[arg(long)]
        spill_dir: Option<PathBuf>,
    },
    /// Look up terms and documents in a built index
    Info {
        #[arg(long, default_value = "./index")]
        index: PathBuf,
        #[command(subcommand)]
        what: InfoCommand,
    },
}

#[derive(Subcommand)]
enum InfoCommand {
    /// Document frequency, corpus frequency and postings offset of a word
    Term { word: String },
    /// Distinct and total term counts of a document
    Doc { name: String },
    /// Frequency and positions of a word inside one document
    TermInDoc { word: String, name: String },
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { corpus, output, stop_words, chunk_records, batch_size, spill_dir } => {
            if !corpus.is_dir() {
                bail!("corpus directory {} does not exist", corpus.display());
            }
            let options = BuildOptions { stop_words, chunk_len: chunk_records, batch_size, spill_dir };
            let summary = build_index(&corpus, &IndexPaths::new(&output), &options)?;
            tracing::info!(
                num_docs = summary.num_docs,
                skipped = summary.forward.skipped,
                num_terms = summary.num_terms,
                postings = summary.inverted.postings,
                sort_runs = summary.sort_runs,
                avg_doc_length = summary.avg_doc_length,
                output = %output.display(),
                "index built"
            );
            Ok(())
        }
        Commands::Info { index, what } => info(SearchIndex::open(IndexPaths::new(&index))?, what),
    }
}

fn info(index: SearchIndex, what: InfoCommand) -> Result<()> {
    match what {
        InfoCommand::Term { word } => match term_report(&index, &word) {
            Some(t) => println!(
                "{word}: stem {} term id {} document frequency {} corpus frequency {} offset {}",
                t.stem, t.term_id, t.document_frequency, t.occurrences, t.offset
            ),
            None => println!("{word}: not in index"),
        },
        InfoCommand::Doc { name } => match document_report(&index, &name)? {
            Some(d) => println!(
                "{name}: doc id {} distinct terms {} total terms {}",
                d.doc_id, d.distinct_terms, d.total_terms
            ),
            None => println!("{name}: not in index"),
        },
        InfoCommand::TermInDoc { word, name } => match term_in_document(&index, &word, &name)? {
            Some(hit) => {
                let positions: Vec<String> = hit.positions.iter().map(u32::to_string).collect();
                println!(
                    "{word} in {name}: term id {} doc id {} frequency {} positions [{}]",
                    hit.term_id,
                    hit.doc_id,
                    hit.frequency(),
                    positions.join(", ")
                );
            }
            None => println!("{word} in {name}: term or document not in index"),
        },
    }
    Ok(())
}
