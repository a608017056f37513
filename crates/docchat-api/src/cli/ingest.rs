//! `docchat ingest <dir>`: build or extend the vector index.

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use docchat_core::retrieval::index::DocumentIndex;
use docchat_infra::ingest::chunker::DocumentChunker;
use docchat_infra::ingest::indexer::{DocumentIndexer, IngestProgress};
use docchat_infra::vector::documents::LanceDocumentIndex;
use docchat_infra::vector::lance::LanceVectorStore;
use docchat_types::config::ChatbotConfig;

use crate::state::load_embedder;

pub async fn run_ingest(config: &ChatbotConfig, dir: &Path, rebuild: bool) -> anyhow::Result<()> {
    let start = Instant::now();

    let chunker = DocumentChunker::new(config.ingest.chunk_size, config.ingest.chunk_overlap)?;

    let loading = super::spinner("Loading embedding model...");
    let embedder = load_embedder(config).await;
    loading.finish_and_clear();
    let embedder = embedder?;

    let store = LanceVectorStore::new(config.index.path.clone())
        .await
        .with_context(|| format!("Failed to open vector index at {}", config.index.path.display()))?;
    if rebuild {
        store.drop_table(&config.index.table).await?;
        tracing::info!(table = %config.index.table, "dropped existing table");
    }
    let index = LanceDocumentIndex::create(&store, &config.index.table).await?;
    let before = index.count().await?;

    let indexer = DocumentIndexer::new(embedder, index, chunker, config.ingest.batch_size);

    let bar = ProgressBar::hidden();
    let report = indexer
        .ingest_directory(dir, |progress| match progress {
            IngestProgress::Loaded { files, pages } => {
                println!(
                    "  {} Loaded {files} files ({pages} pages) from {}",
                    style("*").cyan().bold(),
                    style(dir.display()).dim()
                );
            }
            IngestProgress::Split { chunks } => {
                println!(
                    "  {} Split into {chunks} chunks of max {} characters",
                    style("*").cyan().bold(),
                    config.ingest.chunk_size
                );
                bar.set_length(chunks as u64);
                bar.set_style(
                    ProgressStyle::default_bar()
                        .template("  {bar:40.cyan/blue} {pos}/{len} chunks embedded")
                        .unwrap_or_else(|_| ProgressStyle::default_bar()),
                );
                bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
            }
            IngestProgress::Stored { done, .. } => bar.set_position(done as u64),
        })
        .await;
    bar.finish_and_clear();
    let report = report?;

    let after = indexer.index().count().await?;

    println!();
    println!(
        "  {} Stored {} new chunks ({} in '{}')",
        style("✓").green().bold(),
        after.saturating_sub(before),
        after,
        config.index.table
    );
    if report.skipped_files > 0 {
        println!(
            "  {} Skipped {} unreadable files (run with -v for details)",
            style("!").yellow().bold(),
            report.skipped_files
        );
    }
    println!(
        "  {}",
        style(format!("Took {:.2} seconds", start.elapsed().as_secs_f64())).dim()
    );
    Ok(())
}
