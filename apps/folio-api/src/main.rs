use std::net::SocketAddr;

use folio_api::{routes, state::AppState};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let _ = dotenvy::dotenv();

	init_tracing();

	let cfg = folio_config::Config::from_env()?;
	let addr: SocketAddr = format!("{}:{}", cfg.service.host, cfg.service.port).parse()?;
	let state = AppState::new(cfg).await?;
	let app = routes::router(state);
	let listener = tokio::net::TcpListener::bind(addr).await?;

	tracing::info!(%addr, "Search API listening.");

	axum::serve(listener, app).await?;

	Ok(())
}

fn init_tracing() {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();
}
