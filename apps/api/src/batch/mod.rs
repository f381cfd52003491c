// Batch forecasts: period expansion, the serial orchestrator, progress fan-out
// and the historical timing store behind the time-remaining estimate.

pub mod expand;
pub mod handlers;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod timing;

use std::time::Duration;

pub use orchestrator::BatchOrchestrator;
pub use progress::ProgressRegistry;
pub use timing::TimingStore;

/// Pacing and quality thresholds for batch runs. Loaded from env in `Config`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPolicy {
    /// Pause before every item except the first.
    pub item_delay: Duration,
    /// Rendered files smaller than this are treated as degenerate output.
    pub min_file_bytes: u64,
    /// Extra attempts allowed for an undersized item.
    pub max_size_retries: u32,
    /// Pause between size-check attempts.
    pub retry_backoff: Duration,
    /// One long pause after an item fails for rate-limit reasons.
    pub rate_limit_cooldown: Duration,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            item_delay: Duration::from_secs(2),
            min_file_bytes: 130 * 1024,
            max_size_retries: 2,
            retry_backoff: Duration::from_secs(5),
            rate_limit_cooldown: Duration::from_secs(60),
        }
    }
}
