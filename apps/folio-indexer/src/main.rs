use clap::Parser;

use folio_indexer::Cli;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	let cli = Cli::parse();

	folio_indexer::run(cli).await
}
