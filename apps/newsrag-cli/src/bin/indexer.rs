use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use newsrag_cli::{cache_path, init_tracing, snapshot_dir};
use newsrag_core::config::Settings;
use newsrag_core::data_processor::DataProcessor;
use newsrag_core::store::CorpusStore;
use newsrag_embed::get_default_embedder;
use newsrag_hybrid::SearchSnapshot;
use newsrag_vector::{embed_chunks, EmbeddingCache};

/// Ingest a directory of OCR'd newspaper text and build a search snapshot.
#[derive(Parser)]
#[command(name = "newsrag-indexer", version)]
struct Cli {
    /// Directory of `.txt` issues (default: `paths.data_dir`).
    data_dir: Option<PathBuf>,

    /// Where to write the snapshot (default: `paths.snapshot_dir`).
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Only ingest the first N files.
    #[arg(long)]
    limit: Option<usize>,

    /// Ignore the embedding cache and re-embed every chunk.
    #[arg(long)]
    no_cache: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = Settings::load().context("loading newsrag settings")?;
    let data_dir = cli.data_dir.clone().unwrap_or_else(|| settings.data_dir(Path::new(".")));
    let out_dir = snapshot_dir(&settings, cli.snapshot_dir.as_deref());
    println!("newsrag indexer\n===============");
    println!("Data directory: {}", data_dir.display());
    println!("Snapshot directory: {}", out_dir.display());

    let processor = DataProcessor::new(settings.chunking)?;
    let ingested = match cli.limit {
        Some(limit) => {
            println!("🔢 Limiting ingestion to {limit} files");
            processor.process_directory_limited(&data_dir, limit)?
        }
        None => processor.process_directory(&data_dir)?,
    };
    for failure in &ingested.report.failures {
        warn!(path = %failure.path.display(), reason = %failure.reason, "skipped file");
    }
    println!(
        "📄 {} of {} files ingested, {} chunks",
        ingested.report.processed_files,
        ingested.report.total_files,
        ingested.chunks.len()
    );

    let embedder = get_default_embedder(&settings.embedding)?;
    let cache_file = cache_path(&out_dir);
    let mut cache = if cli.no_cache { EmbeddingCache::new() } else { EmbeddingCache::load_or_default(&cache_file)? };

    let pb = ProgressBar::new(ingested.chunks.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")?
            .progress_chars("#>-"),
    );
    let embedded = embed_chunks(
        &ingested.chunks,
        embedder.as_ref(),
        &mut cache,
        settings.embedding.dimension,
        settings.embedding.batch_size,
        Some(&pb),
    )?;
    pb.finish_with_message("embedded");
    if embedded.failed_chunks() > 0 {
        warn!(failed = embedded.failed_chunks(), "chunks without embeddings remain lexically searchable");
    }

    let store = CorpusStore::from_chunks(ingested.chunks)?;
    let snapshot = SearchSnapshot::build(store, embedded.vectors, &settings, Some(embedder.embedder_id().to_string()))?;
    snapshot.save(&out_dir)?;
    if let Some(parent) = cache_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    cache.save(&cache_file)?;
    ingested.report.save(&out_dir.join("ingest_report.json"))?;

    let stats = snapshot.stats();
    info!(chunks = stats.chunks, embedded = stats.embedded_chunks, "indexing finished");
    println!("\n✅ Indexing completed successfully!");
    println!("📊 {} chunks, {} embedded ({} from cache)", stats.chunks, stats.embedded_chunks, embedded.cache_hits);
    println!("📚 Vocabulary: {} terms", stats.vocabulary);
    if let Some((from, to)) = stats.date_range {
        println!("📅 Coverage: {from} to {to}");
    }
    println!("📰 Sources: {}", stats.sources.join(", "));
    println!("\n💡 To search, use: cargo run --bin newsrag-search -- '<query>'");
    Ok(())
}
