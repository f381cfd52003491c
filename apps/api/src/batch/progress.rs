//! Per-session batch progress.
//!
//! Each session owns a `watch` channel holding the latest snapshot. Readers
//! (the SSE handler) may subscribe before, during or after the batch starts.
//! `close` drops the sender, which ends every reader after its final snapshot.
//! A closed session keeps that snapshot for [`CLOSED_SESSION_GRACE`] so a reader
//! arriving late still gets it and ends. Sessions nobody closed are evicted once
//! idle for longer than the TTL.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgressUpdate {
    pub session_id: String,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub current_task: String,
    /// Seconds.
    pub estimated_time_remaining: f64,
    /// Seconds.
    pub average_task_time: f64,
    /// Unix milliseconds.
    pub start_time: i64,
    /// 0–100.
    pub progress: f64,
}

pub type ProgressReceiver = watch::Receiver<Option<BatchProgressUpdate>>;

/// How long a closed session still answers late subscribers. Capped by the TTL.
pub const CLOSED_SESSION_GRACE: Duration = Duration::from_secs(60);

/// Average seconds per item and estimated seconds left.
///
/// Samples from the running session count twice as much as historical ones.
pub fn estimate_remaining(historical: &[f64], session: &[f64], remaining_tasks: usize) -> (f64, f64) {
    let weight = historical.len() as f64 + 2.0 * session.len() as f64;
    if weight == 0.0 {
        return (0.0, 0.0);
    }
    let total = historical.iter().sum::<f64>() + 2.0 * session.iter().sum::<f64>();
    let average = total / weight;
    (round1(average), (average * remaining_tasks as f64).round())
}

pub fn percent(completed: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    round1(completed as f64 * 100.0 / total as f64)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

enum SessionState {
    Open(watch::Sender<Option<BatchProgressUpdate>>),
    /// The batch finished; holds its last snapshot.
    Closed(Option<BatchProgressUpdate>),
}

struct SessionEntry {
    state: SessionState,
    last_touched: Instant,
}

impl SessionEntry {
    fn open() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            state: SessionState::Open(sender),
            last_touched: Instant::now(),
        }
    }

    fn is_open(&self) -> bool {
        matches!(self.state, SessionState::Open(_))
    }
}

pub struct ProgressRegistry {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    ttl: Duration,
}

impl ProgressRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Receiver for a session's snapshots, registering the session if needed.
    ///
    /// For a closed session the receiver holds the final snapshot and its
    /// sender is already gone, so it ends right after that snapshot.
    pub fn subscribe(&self, session_id: &str) -> ProgressReceiver {
        let mut sessions = self.lock();
        let entry = sessions
            .entry(session_id.to_string())
            .or_insert_with(SessionEntry::open);
        match &entry.state {
            SessionState::Open(sender) => {
                entry.last_touched = Instant::now();
                sender.subscribe()
            }
            SessionState::Closed(last) => {
                let (_, rx) = watch::channel(last.clone());
                rx
            }
        }
    }

    /// Sends a snapshot. Publishing to a closed session starts it over.
    pub fn publish(&self, update: BatchProgressUpdate) {
        let mut sessions = self.lock();
        let entry = sessions
            .entry(update.session_id.clone())
            .or_insert_with(SessionEntry::open);
        if !entry.is_open() {
            *entry = SessionEntry::open();
        }
        entry.last_touched = Instant::now();
        debug!(
            "Progress {}: {}/{}",
            update.session_id, update.completed_tasks, update.total_tasks
        );
        if let SessionState::Open(sender) = &entry.state {
            sender.send_replace(Some(update));
        }
    }

    pub fn close(&self, session_id: &str) {
        let mut sessions = self.lock();
        let Some(entry) = sessions.get_mut(session_id) else {
            return;
        };
        if let SessionState::Open(sender) = &entry.state {
            let last = sender.borrow().clone();
            // Replacing the state drops the sender and ends current readers.
            entry.state = SessionState::Closed(last);
            entry.last_touched = Instant::now();
            debug!("Progress session {session_id} closed");
        }
    }

    /// Evicts sessions idle for longer than the TTL and closed sessions past
    /// their grace period. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let grace = self.ttl.min(CLOSED_SESSION_GRACE);
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, entry| {
            let limit = if entry.is_open() { self.ttl } else { grace };
            now.duration_since(entry.last_touched) <= limit
        });
        before - sessions.len()
    }

    /// Sessions still open. Closed sessions waiting out their grace are not counted.
    pub fn len(&self) -> usize {
        self.lock().values().filter(|entry| entry.is_open()).count()
    }

    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let evicted = self.sweep();
                if evicted > 0 {
                    info!(
                        "Evicted {} idle progress sessions, {} still open",
                        evicted,
                        self.len()
                    );
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}
