use tokio::sync::watch;

use crate::Command;
use folio_pipeline::Indexer;

pub async fn execute(
	indexer: &Indexer,
	command: Command,
	cancel: watch::Receiver<bool>,
) -> color_eyre::Result<()> {
	match command {
		Command::Phase1 { limit, reindex_all, workers, .. } => {
			let report = indexer.phase1(limit, reindex_all, workers, cancel).await?;

			println!("Phase 1 complete.");
			println!(" - processed: {}", report.processed);
			println!(" - skipped:   {}", report.skipped);
			println!(" - errors:    {}", report.errors);
			println!(" - cached:    {}", report.cached_total);
		},
		Command::Phase2 { .. } => {
			let report = indexer.phase2(cancel).await?;

			println!("Phase 2 complete.");
			println!(" - indexed:     {}", report.indexed);
			println!(" - errors:      {}", report.errors);
			println!(" - synced:      {}", report.synced);
			println!(" - sync errors: {}", report.sync_errors);
		},
		Command::Run { limit, reindex_all, workers } => {
			let report = indexer.run(limit, reindex_all, workers, cancel).await?;
			let rate = if report.elapsed_secs > 0.0 {
				report.indexed as f64 / report.elapsed_secs
			} else {
				0.0
			};

			println!("Pipeline run complete.");
			println!(" - processed:   {}", report.processed);
			println!(" - indexed:     {}", report.indexed);
			println!(" - errors:      {}", report.errors);
			println!(" - synced:      {}", report.synced);
			println!(" - sync errors: {}", report.sync_errors);
			println!(" - elapsed:     {:.2}s ({rate:.1} docs/sec)", report.elapsed_secs);
		},
		Command::Status => {
			let (entries, size_bytes) = indexer.cache.stats();

			if !indexer.cache.exists() {
				println!("Cache: empty");
			} else {
				let metadata = indexer.cache.metadata();

				println!("Cache: {entries} entries ({size_bytes} bytes)");
				println!(" - version:       {}", metadata.version);
				println!(" - total docs:    {}", metadata.total_docs);
				println!(" - reindex all:   {}", metadata.reindex_all);
				println!(" - last modified: {}", metadata.last_modified);
			}
		},
		Command::Clean => {
			indexer.cache.clear()?;

			println!("Cache cleared.");
		},
		Command::CreateIndex => {
			let created = indexer.create_index().await?;

			if created {
				println!("Index created.");
			} else {
				println!("Index already exists.");
			}
		},
		Command::ReindexFull => {
			let (phase1, phase2) = indexer.reindex_full(cancel).await?;

			println!("Full reindex complete.");
			println!(" - embedded: {} (errors {})", phase1.processed, phase1.errors);
			println!(" - indexed:  {} (errors {})", phase2.indexed, phase2.errors);
			println!(" - synced:   {} (errors {})", phase2.synced, phase2.sync_errors);
		},
	}

	Ok(())
}
