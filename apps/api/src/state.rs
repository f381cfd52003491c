use std::sync::Arc;

use crate::batch::{BatchOrchestrator, ProgressRegistry};
use crate::config::Config;
use crate::forecast::ForecastPipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pipeline: Arc<ForecastPipeline>,
    pub batch: Arc<BatchOrchestrator>,
    /// Progress channels read by the SSE endpoint and written by the orchestrator.
    pub progress: Arc<ProgressRegistry>,
}
