use anyhow::Result;
use clap::Parser;
use rayon::prelude::*;
use sift_core::output::{RunWriter, DEFAULT_RUN_TAG};
use sift_core::persist::{create_writer, IndexPaths};
use sift_core::query::load_queries;
use sift_core::stats::average_query_length;
use sift_core::{RankingModel, SearchIndex};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "sift-ranker")]
#[command(about = "Score a query set against a built index and write a ranked run", long_about = None)]
struct Args {
    /// Index directory path
    #[arg(long, default_value = "./index")]
    index: PathBuf,
    /// Query file: `.xml` topics, otherwise `id<TAB>text` lines
    #[arg(long)]
    queries: PathBuf,
    /// okapi-tf, tf-idf, bm25, laplace, jelinek-mercer (or 1-5)
    #[arg(long, default_value = "bm25")]
    model: RankingModel,
    /// Run file to write; stdout when absent
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_RUN_TAG)]
    run_tag: String,
    /// Documents kept per query
    #[arg(long)]
    top_k: Option<usize>,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let started = Instant::now();

    let index = SearchIndex::open(IndexPaths::new(&args.index))?;
    let queries = load_queries(&args.queries)?;
    let avg_query_length = average_query_length(queries.iter().map(|q| q.text.as_str()), index.tokenizer());
    tracing::info!(queries = queries.len(), avg_query_length, model = %args.model, "ranking query set");

    let ranked: Vec<_> = queries
        .par_iter()
        .map(|q| {
            let parsed = index.parse_query(&q.text);
            index.rank(&parsed, args.model, Some(avg_query_length))
        })
        .collect();

    let out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(create_writer(path)?),
        None => Box::new(io::stdout().lock()),
    };
    let mut run = RunWriter::new(out, args.run_tag).with_top_k(args.top_k);
    let mut failed = 0usize;
    for (query, result) in queries.iter().zip(ranked) {
        match result {
            Ok(docs) => {
                if docs.is_empty() {
                    tracing::debug!(query_id = %query.id, "no document matched");
                }
                run.write_query(&query.id, &docs, index.documents())?;
            }
            Err(err) => {
                failed += 1;
                tracing::warn!(query_id = %query.id, error = %err, "query failed, skipping");
            }
        }
    }
    let (_, lines) = run.finish()?;
    tracing::info!(lines, failed, took_s = started.elapsed().as_secs_f64(), "run written");
    Ok(())
}
