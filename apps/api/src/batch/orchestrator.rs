//! Batch Orchestrator: one document per expanded date span, strictly serial.
//!
//! Per item: optional inter-item delay → pipeline run → size check (delete and
//! regenerate undersized output up to the retry cap) → progress snapshot.
//! Item failures become error strings; the batch itself only fails on bad input.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};
use uuid::Uuid;

use crate::batch::expand::expand_birth_years;
use crate::batch::models::{BatchForecastInput, BatchForecastResult};
use crate::batch::progress::{estimate_remaining, percent, BatchProgressUpdate, ProgressRegistry};
use crate::batch::timing::TimingStore;
use crate::batch::BatchPolicy;
use crate::errors::AppError;
use crate::forecast::models::{ForecastInput, ForecastResult};
use crate::forecast::ForecastPipeline;

#[derive(Debug, Error)]
enum ItemError {
    #[error(transparent)]
    Pipeline(#[from] AppError),

    #[error("document stayed below {min_bytes} bytes after {attempts} attempts (last was {last_bytes} bytes)")]
    Undersized {
        min_bytes: u64,
        attempts: u32,
        last_bytes: u64,
    },
}

impl ItemError {
    fn is_rate_limited(&self) -> bool {
        match self {
            ItemError::Pipeline(e) => e.is_rate_limited(),
            ItemError::Undersized { .. } => false,
        }
    }
}

/// Running counters for one batch, turned into progress snapshots.
struct SessionTracker {
    session_id: String,
    total: usize,
    start_time: i64,
    historical: Vec<f64>,
    samples: Vec<f64>,
}

impl SessionTracker {
    fn snapshot(&self, completed: usize, current_task: String) -> BatchProgressUpdate {
        let (average, remaining) =
            estimate_remaining(&self.historical, &self.samples, self.total - completed);
        BatchProgressUpdate {
            session_id: self.session_id.clone(),
            total_tasks: self.total,
            completed_tasks: completed,
            current_task,
            estimated_time_remaining: remaining,
            average_task_time: average,
            start_time: self.start_time,
            progress: percent(completed, self.total),
        }
    }
}

pub struct BatchOrchestrator {
    pipeline: Arc<ForecastPipeline>,
    progress: Arc<ProgressRegistry>,
    timing: Arc<TimingStore>,
    policy: BatchPolicy,
}

impl BatchOrchestrator {
    pub fn new(
        pipeline: Arc<ForecastPipeline>,
        progress: Arc<ProgressRegistry>,
        timing: Arc<TimingStore>,
        policy: BatchPolicy,
    ) -> Self {
        Self {
            pipeline,
            progress,
            timing,
            policy,
        }
    }

    pub async fn run(&self, input: BatchForecastInput) -> Result<BatchForecastResult, AppError> {
        let spans = expand_birth_years(&input.birth_year, input.split_month)
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let session_id = input
            .session_id
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let started = Instant::now();
        let mut tracker = SessionTracker {
            session_id: session_id.clone(),
            total: spans.len(),
            start_time: Utc::now().timestamp_millis(),
            historical: self.timing.snapshot().durations,
            samples: Vec::new(),
        };
        info!(
            "Batch {} started: {} forecasts for birth years {}",
            session_id,
            spans.len(),
            input.birth_year
        );

        let mut results: Vec<ForecastResult> = Vec::new();
        let mut errors: Vec<String> = Vec::new();

        for (index, span) in spans.iter().enumerate() {
            if index > 0 && !self.policy.item_delay.is_zero() {
                sleep(self.policy.item_delay).await;
            }

            let item = input.item_input(span);
            let label = item.date_label();
            self.progress.publish(tracker.snapshot(
                index,
                format!("Generating forecast {}/{}: {}", index + 1, tracker.total, label),
            ));

            let item_started = Instant::now();
            match self.run_item(item).await {
                Ok(result) => {
                    let seconds = item_started.elapsed().as_secs_f64();
                    tracker.samples.push(seconds);
                    self.timing.record(&[seconds]);
                    // Awaited so history files are written in item order.
                    if let Err(e) = self.timing.persist().await {
                        warn!("Timing history write task failed: {e}");
                    }
                    results.push(result);
                }
                Err(e) => {
                    warn!("Batch {session_id}: forecast for {label} failed: {e}");
                    errors.push(format!("Failed to generate forecast for {label}: {e}"));
                    if e.is_rate_limited() {
                        warn!(
                            "Rate limit hit, cooling down for {}s",
                            self.policy.rate_limit_cooldown.as_secs()
                        );
                        sleep(self.policy.rate_limit_cooldown).await;
                    }
                }
            }

            self.progress.publish(tracker.snapshot(
                index + 1,
                format!("Finished {}/{}: {}", index + 1, tracker.total, label),
            ));
        }

        self.progress.publish(tracker.snapshot(
            tracker.total,
            format!(
                "Completed: {} successful, {} failed",
                results.len(),
                errors.len()
            ),
        ));

        self.progress.close(&session_id);

        info!(
            "Batch {} finished in {:.1}s: {} successful, {} failed",
            session_id,
            started.elapsed().as_secs_f64(),
            results.len(),
            errors.len()
        );

        Ok(BatchForecastResult {
            session_id,
            total_generated: spans.len(),
            successful: results.len(),
            failed: errors.len(),
            results,
            errors,
        })
    }

    /// Runs one item, regenerating undersized output up to the retry cap.
    async fn run_item(&self, input: ForecastInput) -> Result<ForecastResult, ItemError> {
        let attempts = self.policy.max_size_retries + 1;
        let mut last_bytes = 0;

        for attempt in 1..=attempts {
            if attempt > 1 {
                sleep(self.policy.retry_backoff).await;
            }

            let result = self.pipeline.run(input.clone()).await?;
            let size = self.pipeline.file_size(result.id).await?;
            if size >= self.policy.min_file_bytes {
                return Ok(result);
            }

            warn!(
                "Forecast {} is {} bytes, below the {} byte minimum (attempt {}/{})",
                result.id, size, self.policy.min_file_bytes, attempt, attempts
            );
            last_bytes = size;
            self.pipeline
                .delete(result.id, result.remote_id.as_deref())
                .await?;
        }

        Err(ItemError::Undersized {
            min_bytes: self.policy.min_file_bytes,
            attempts,
            last_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::batch::timing::HistoricalTiming;
    use crate::forecast::test_support::{
        pipeline_in, RecordingUploader, StubGenerator, StubRenderer, TWO_LIFE_PATHS,
    };
    use crate::llm_client::{LlmError, TextGenerator};

    const MIN_BYTES: u64 = 100;

    fn quick_policy() -> BatchPolicy {
        BatchPolicy {
            item_delay: Duration::ZERO,
            min_file_bytes: MIN_BYTES,
            max_size_retries: 2,
            retry_backoff: Duration::from_secs(5),
            rate_limit_cooldown: Duration::from_secs(60),
        }
    }

    struct Harness {
        orchestrator: BatchOrchestrator,
        progress: Arc<ProgressRegistry>,
        timing: Arc<TimingStore>,
    }

    fn harness(
        dir: &Path,
        generator: Arc<dyn TextGenerator>,
        renderer: Arc<StubRenderer>,
        uploader: Option<Arc<RecordingUploader>>,
        policy: BatchPolicy,
    ) -> Harness {
        let pipeline = Arc::new(pipeline_in(dir, generator, renderer, uploader));
        let progress = Arc::new(ProgressRegistry::new(Duration::from_secs(3600)));
        let timing = Arc::new(TimingStore::with_history(
            dir.join("timing.json"),
            HistoricalTiming::default(),
        ));
        Harness {
            orchestrator: BatchOrchestrator::new(
                pipeline,
                progress.clone(),
                timing.clone(),
                policy,
            ),
            progress,
            timing,
        }
    }

    fn batch_input(birth_year: &str) -> BatchForecastInput {
        serde_json::from_value(serde_json::json!({
            "birthYear": birth_year,
            "targetPeriod": "Q1 2025",
            "sessionId": "session-1"
        }))
        .unwrap()
    }

    fn pdf_count(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "pdf"))
            .count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_items_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(
            dir.path(),
            Arc::new(StubGenerator::always(TWO_LIFE_PATHS)),
            StubRenderer::fixed(500),
            None,
            quick_policy(),
        );

        let result = h.orchestrator.run(batch_input("1980")).await.unwrap();
        assert_eq!(result.session_id, "session-1");
        assert_eq!(result.total_generated, 12);
        assert_eq!(result.successful, 12);
        assert_eq!(result.failed, 0);
        assert!(result.errors.is_empty());
        assert_eq!(pdf_count(dir.path()), 12);
        assert_eq!(h.timing.snapshot().total_operations, 12);
        assert_eq!(h.progress.len(), 0, "session is released when the batch ends");
    }

    #[tokio::test(start_paused = true)]
    async fn test_items_share_target_period_and_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(StubGenerator::always(TWO_LIFE_PATHS));
        let h = harness(
            dir.path(),
            generator.clone(),
            StubRenderer::fixed(500),
            None,
            quick_policy(),
        );

        let mut input = batch_input("1980");
        input.split_month = true;
        h.orchestrator.run(input).await.unwrap();

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 24);
        assert!(prompts.iter().all(|p| p.contains("Q1 2025")));
        assert!(prompts[0].contains("[Start 01/01/1980] to [End 15/01/1980]"));
        assert!(prompts[3].contains("[Start 16/02/1980] to [End 29/02/1980]"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_undersized_item_is_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = StubRenderer::sized(vec![10, 10], 500);
        let h = harness(
            dir.path(),
            Arc::new(StubGenerator::always(TWO_LIFE_PATHS)),
            renderer.clone(),
            None,
            quick_policy(),
        );

        let result = h.orchestrator.run(batch_input("1980")).await.unwrap();
        assert_eq!(result.successful, 12);
        assert_eq!(renderer.renders(), 14);
        // Undersized attempts were deleted, so only accepted files remain.
        assert_eq!(pdf_count(dir.path()), 12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_undersized_item_gives_up_after_retry_cap() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = StubRenderer::sized(vec![10, 10, 10], 500);
        let uploader = Arc::new(RecordingUploader::working());
        let h = harness(
            dir.path(),
            Arc::new(StubGenerator::always(TWO_LIFE_PATHS)),
            renderer.clone(),
            Some(uploader.clone()),
            quick_policy(),
        );

        let mut input = batch_input("1980");
        input.upload = true;
        let result = h.orchestrator.run(input).await.unwrap();

        assert_eq!(result.successful, 11);
        assert_eq!(result.failed, 1);
        assert!(result.errors[0].contains("01/01/1980"));
        assert!(result.errors[0].contains("below 100 bytes after 3 attempts"));
        assert_eq!(renderer.renders(), 14);
        // Remote copies of the rejected attempts are removed too.
        assert_eq!(uploader.deleted().len(), 3);
        for item in &result.results {
            let size = std::fs::metadata(dir.path().join(format!("{}.pdf", item.id)))
                .unwrap()
                .len();
            assert!(size >= MIN_BYTES);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_generator_failure_is_recorded_and_batch_continues() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(StubGenerator::scripted(vec![Err(LlmError::Api {
            status: 400,
            message: "content policy".to_string(),
        })]));
        let h = harness(
            dir.path(),
            generator,
            StubRenderer::fixed(500),
            None,
            quick_policy(),
        );

        let started = Instant::now();
        let result = h.orchestrator.run(batch_input("1980")).await.unwrap();
        assert_eq!(result.successful, 11);
        assert_eq!(result.failed, 1);
        assert!(result.errors[0].contains("content policy"));
        assert!(started.elapsed() < Duration::from_secs(60), "no cooldown for ordinary errors");
    }

    /// Notes how many samples the timing store holds each time a forecast starts.
    struct TimingWatcher {
        inner: StubGenerator,
        store: OnceLock<Arc<TimingStore>>,
        seen: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl TextGenerator for TimingWatcher {
        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            if let Some(store) = self.store.get() {
                self.seen
                    .lock()
                    .unwrap()
                    .push(store.snapshot().total_operations);
            }
            self.inner.generate(prompt).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timing_is_recorded_as_each_item_finishes() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = Arc::new(TimingWatcher {
            inner: StubGenerator::scripted(vec![
                Ok(TWO_LIFE_PATHS.to_string()),
                Err(LlmError::Api {
                    status: 400,
                    message: "content policy".to_string(),
                }),
            ]),
            store: OnceLock::new(),
            seen: Mutex::new(Vec::new()),
        });
        let h = harness(
            dir.path(),
            watcher.clone(),
            StubRenderer::fixed(500),
            None,
            quick_policy(),
        );
        assert!(watcher.store.set(h.timing.clone()).is_ok());

        let result = h.orchestrator.run(batch_input("1980")).await.unwrap();
        assert_eq!(result.failed, 1);

        let seen = watcher.seen.lock().unwrap().clone();
        assert_eq!(seen[..4], [0, 1, 1, 2], "failed items add no sample");
        assert_eq!(seen.len(), 12);
        assert_eq!(h.timing.snapshot().total_operations, 11);

        let on_disk = TimingStore::load(dir.path().join("timing.json")).await;
        assert_eq!(on_disk.snapshot().total_operations, 11);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_triggers_one_cooldown() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(StubGenerator::scripted(vec![Err(LlmError::RateLimited {
            retries: 3,
        })]));
        let h = harness(
            dir.path(),
            generator,
            StubRenderer::fixed(500),
            None,
            quick_policy(),
        );

        let started = Instant::now();
        let result = h.orchestrator.run(batch_input("1980")).await.unwrap();
        assert_eq!(result.failed, 1);
        assert!(started.elapsed() >= Duration::from_secs(60));
        assert!(started.elapsed() < Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_inter_item_delay_skips_first_item() {
        let dir = tempfile::tempdir().unwrap();
        let mut policy = quick_policy();
        policy.item_delay = Duration::from_secs(2);
        let h = harness(
            dir.path(),
            Arc::new(StubGenerator::always(TWO_LIFE_PATHS)),
            StubRenderer::fixed(500),
            None,
            policy,
        );

        let started = Instant::now();
        h.orchestrator.run(batch_input("1980")).await.unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(22));
        assert!(elapsed < Duration::from_secs(24));
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscriber_receives_final_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(
            dir.path(),
            Arc::new(StubGenerator::always(TWO_LIFE_PATHS)),
            StubRenderer::fixed(500),
            None,
            quick_policy(),
        );

        let mut rx = h.progress.subscribe("session-1");
        h.orchestrator.run(batch_input("1980")).await.unwrap();

        rx.changed().await.unwrap();
        let last = rx.borrow_and_update().clone().unwrap();
        assert_eq!(last.completed_tasks, 12);
        assert_eq!(last.total_tasks, 12);
        assert_eq!(last.progress, 100.0);
        assert_eq!(last.estimated_time_remaining, 0.0);
        assert!(last.current_task.starts_with("Completed: 12 successful"));
        assert!(rx.changed().await.is_err(), "stream ends after close");
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_birth_year_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let h = harness(
            dir.path(),
            Arc::new(StubGenerator::always(TWO_LIFE_PATHS)),
            StubRenderer::fixed(500),
            None,
            quick_policy(),
        );

        let err = h.orchestrator.run(batch_input("80s")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
