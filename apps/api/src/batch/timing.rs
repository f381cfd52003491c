//! Historical per-item durations, persisted as JSON between restarts.
//!
//! Loaded once at startup. Writes happen in a background task via temp file
//! plus rename; a failed write is logged and the in-memory state stays current.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// Samples kept for the running average.
pub const MAX_SAMPLES: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalTiming {
    /// Seconds per successful batch item, oldest first.
    pub durations: Vec<f64>,
    pub average_duration: f64,
    pub total_operations: u64,
}

impl HistoricalTiming {
    pub fn record(&mut self, seconds: f64) {
        self.durations.push(seconds);
        if self.durations.len() > MAX_SAMPLES {
            let excess = self.durations.len() - MAX_SAMPLES;
            self.durations.drain(..excess);
        }
        self.average_duration = self.durations.iter().sum::<f64>() / self.durations.len() as f64;
        self.total_operations += 1;
    }
}

pub struct TimingStore {
    path: PathBuf,
    state: Mutex<HistoricalTiming>,
}

impl TimingStore {
    /// Reads `path`. A missing or unreadable file starts from empty history.
    pub async fn load(path: PathBuf) -> Self {
        let timing = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<HistoricalTiming>(&bytes) {
                Ok(timing) => {
                    info!(
                        "Loaded {} historical timings from {}",
                        timing.durations.len(),
                        path.display()
                    );
                    timing
                }
                Err(e) => {
                    warn!("Ignoring malformed timing file {}: {e}", path.display());
                    HistoricalTiming::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HistoricalTiming::default(),
            Err(e) => {
                warn!("Could not read timing file {}: {e}", path.display());
                HistoricalTiming::default()
            }
        };
        Self::with_history(path, timing)
    }

    pub fn with_history(path: PathBuf, timing: HistoricalTiming) -> Self {
        Self {
            path,
            state: Mutex::new(timing),
        }
    }

    pub fn snapshot(&self) -> HistoricalTiming {
        self.lock().clone()
    }

    /// Appends samples in memory. Call [`TimingStore::persist`] to write them out.
    pub fn record(&self, seconds: &[f64]) {
        let mut state = self.lock();
        for &s in seconds {
            state.record(s);
        }
    }

    /// Writes the current history in the background.
    pub fn persist(self: &Arc<Self>) -> JoinHandle<()> {
        let snapshot = self.snapshot();
        let path = self.path.clone();
        tokio::spawn(async move {
            if let Err(e) = write_atomic(&path, &snapshot).await {
                warn!("Failed to persist timing history: {e:#}");
            }
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HistoricalTiming> {
        // A poisoned lock still holds a valid history.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

async fn write_atomic(path: &Path, timing: &HistoricalTiming) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let bytes = serde_json::to_vec_pretty(timing)?;
    let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
    tokio::fs::write(&temp_path, bytes)
        .await
        .with_context(|| format!("writing {}", temp_path.display()))?;
    tokio::fs::rename(&temp_path, path)
        .await
        .with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}
