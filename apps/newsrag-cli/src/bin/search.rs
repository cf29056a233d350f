use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use tracing::warn;

use newsrag_cli::{init_tracing, snapshot_dir};
use newsrag_core::config::Settings;
use newsrag_core::types::DateRange;
use newsrag_embed::get_default_embedder;
use newsrag_hybrid::{HybridSearcher, IndexHandle, SearchFilter, SearchMode, SearchRequest, SearchResponse, SearchSnapshot};

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Hybrid,
    Lexical,
    Semantic,
}

impl From<Mode> for SearchMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Hybrid => SearchMode::Hybrid,
            Mode::Lexical => SearchMode::Lexical,
            Mode::Semantic => SearchMode::Semantic,
        }
    }
}

/// Search a newspaper snapshot built by `newsrag-indexer`.
#[derive(Parser)]
#[command(name = "newsrag-search", version)]
struct Cli {
    query: String,

    #[arg(short = 'k', long, default_value_t = 10)]
    top_k: usize,

    #[arg(long, value_enum, default_value_t = Mode::Hybrid)]
    mode: Mode,

    /// Earliest publication date, inclusive (YYYY-MM-DD).
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Latest publication date, inclusive (YYYY-MM-DD).
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Restrict to these newspaper titles; repeatable.
    #[arg(long = "source")]
    sources: Vec<String>,

    #[arg(long)]
    min_score: Option<f32>,

    /// Query timeout in milliseconds (default: `embedding.timeout_ms`).
    #[arg(long)]
    timeout_ms: Option<u64>,

    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn request(&self) -> anyhow::Result<SearchRequest> {
        let mut filter = SearchFilter::default();
        if self.from.is_some() || self.to.is_some() {
            let range = DateRange::new(self.from.unwrap_or(NaiveDate::MIN), self.to.unwrap_or(NaiveDate::MAX))?;
            filter = filter.with_date_range(range);
        }
        if !self.sources.is_empty() {
            filter = filter.with_sources(self.sources.iter().cloned());
        }
        let mut request = SearchRequest::new(self.query.clone(), self.top_k).with_mode(self.mode.into()).with_filter(filter);
        if let Some(min) = self.min_score {
            request = request.with_min_score(min);
        }
        Ok(request)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = Settings::load().context("loading newsrag settings")?;
    let dir = snapshot_dir(&settings, cli.snapshot_dir.as_deref());
    let snapshot = SearchSnapshot::load(&dir).with_context(|| format!("loading snapshot from {}", dir.display()))?;
    let request = cli.request()?;

    let timeout = Duration::from_millis(cli.timeout_ms.unwrap_or(settings.embedding.timeout_ms));
    let handle = Arc::new(IndexHandle::new(snapshot));
    let searcher = if request.mode == SearchMode::Lexical {
        HybridSearcher::without_embedder(handle, settings.fusion, timeout)
    } else {
        let embedder = get_default_embedder(&settings.embedding)?;
        if let Some(indexed_with) = handle.load().vector().embedder_id() {
            if indexed_with != embedder.embedder_id() {
                warn!(indexed_with, querying_with = embedder.embedder_id(), "query embedder differs from index embedder");
            }
        }
        HybridSearcher::new(handle, Arc::from(embedder), settings.fusion, timeout)
    };
    let response = searcher.search_text(request).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_human(&cli.query, &response);
    }
    Ok(())
}

fn print_human(query: &str, response: &SearchResponse) {
    println!("🔍 Found {} results for: \"{}\"", response.results.len(), query);
    for (i, r) in response.results.iter().enumerate() {
        let ranks = match (r.lexical_rank, r.vector_rank) {
            (Some(l), Some(v)) => format!("bm25 #{l}, vector #{v}"),
            (Some(l), None) => format!("bm25 #{l}"),
            (None, Some(v)) => format!("vector #{v}"),
            (None, None) => String::new(),
        };
        println!("\n  {}. score={:.4}  [{}]  {}", i + 1, r.score, r.chunk_id, ranks);
        println!("     {}", r.citation());
        println!("     📝 {}", snippet(&r.text, 40));
    }
    if let Some(partial) = response.partial {
        println!("\n⚠️  Only {} of {} requested results matched the filters", partial.returned, partial.requested);
    }
}

fn snippet(text: &str, words: usize) -> String {
    let mut out: Vec<&str> = text.split_whitespace().take(words + 1).collect();
    if out.len() > words {
        out.truncate(words);
        return format!("{} ...", out.join(" "));
    }
    out.join(" ")
}
