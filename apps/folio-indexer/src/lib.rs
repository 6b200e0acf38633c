pub mod commands;

use clap::{Parser, Subcommand};
use tokio::sync::watch;

use folio_pipeline::Indexer;

#[derive(Debug, Parser)]
#[command(name = "folio-indexer", about = "Batch indexer: MongoDB -> embeddings -> OpenSearch")]
pub struct Cli {
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Fetch pending documents and fill the embedding cache.
	Phase1 {
		#[arg(long, default_value_t = 0)]
		limit: usize,
		#[arg(long)]
		reindex_all: bool,
		#[arg(long)]
		workers: Option<usize>,
		#[arg(long)]
		quiet: bool,
	},
	/// Bulk-index the cache and back-sync engine ids.
	Phase2 {
		#[arg(long)]
		quiet: bool,
	},
	/// Fully-streaming single-shot run, bypassing the cache.
	Run {
		#[arg(long, default_value_t = 0)]
		limit: usize,
		#[arg(long)]
		reindex_all: bool,
		#[arg(long)]
		workers: Option<usize>,
	},
	/// Show cache status.
	Status,
	/// Remove the embedding cache.
	Clean,
	/// Create the engine index if it does not exist.
	CreateIndex,
	/// Delete and recreate the index, clear cross-reference ids and the
	/// cache, then run both phases with reindex-all.
	ReindexFull,
}
impl Command {
	fn quiet(&self) -> bool {
		matches!(self, Self::Phase1 { quiet: true, .. } | Self::Phase2 { quiet: true })
	}
}

pub async fn run(cli: Cli) -> color_eyre::Result<()> {
	color_eyre::install()?;

	let _ = dotenvy::dotenv();

	init_tracing(cli.command.quiet());

	let cfg = folio_config::Config::from_env()?;
	let (cancel_tx, cancel_rx) = watch::channel(false);

	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			tracing::warn!("Received shutdown signal. Draining pipeline.");

			let _ = cancel_tx.send(true);
		}
	});

	let indexer = Indexer::connect(cfg).await?;

	commands::execute(&indexer, cli.command, cancel_rx).await
}

fn init_tracing(quiet: bool) {
	let default = if quiet { "warn" } else { "info" };
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

	tracing_subscriber::fmt().with_env_filter(filter).init();
}
