use std::sync::{
	Arc,
	atomic::{AtomicI64, AtomicU64, Ordering},
};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Live per-stage gauges plus cumulative counters. Relaxed ordering is
/// enough for progress reporting.
#[derive(Debug, Default)]
pub struct PipelineStats {
	pub docs_in_embed: AtomicI64,
	pub docs_in_index: AtomicI64,
	pub docs_in_sync: AtomicI64,
	pub processed: AtomicU64,
	pub skipped: AtomicU64,
	pub errors: AtomicU64,
}
impl PipelineStats {
	pub fn enter(gauge: &AtomicI64, count: usize) {
		gauge.fetch_add(count as i64, Ordering::Relaxed);
	}

	pub fn leave(gauge: &AtomicI64, count: usize) {
		gauge.fetch_sub(count as i64, Ordering::Relaxed);
	}

	pub fn add_processed(&self, count: usize) {
		self.processed.fetch_add(count as u64, Ordering::Relaxed);
	}

	pub fn add_skipped(&self, count: usize) {
		self.skipped.fetch_add(count as u64, Ordering::Relaxed);
	}

	pub fn add_errors(&self, count: usize) {
		self.errors.fetch_add(count as u64, Ordering::Relaxed);
	}

	pub fn processed(&self) -> u64 {
		self.processed.load(Ordering::Relaxed)
	}

	pub fn skipped(&self) -> u64 {
		self.skipped.load(Ordering::Relaxed)
	}

	pub fn errors(&self) -> u64 {
		self.errors.load(Ordering::Relaxed)
	}
}

/// Logs pipeline progress at a steady tick until aborted.
pub fn spawn_progress_ticker(
	stats: Arc<PipelineStats>,
	total: u64,
	interval: Duration,
) -> JoinHandle<()> {
	tokio::spawn(async move {
		let mut ticker = tokio::time::interval(interval);

		ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

		loop {
			ticker.tick().await;

			tracing::info!(
				total,
				processed = stats.processed(),
				skipped = stats.skipped(),
				errors = stats.errors(),
				embedding = stats.docs_in_embed.load(Ordering::Relaxed),
				indexing = stats.docs_in_index.load(Ordering::Relaxed),
				syncing = stats.docs_in_sync.load(Ordering::Relaxed),
				"Pipeline progress."
			);
		}
	})
}
