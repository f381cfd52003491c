use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream};
use tracing::warn;

use crate::batch::models::{BatchForecastInput, BatchForecastResult};
use crate::batch::progress::ProgressReceiver;
use crate::errors::AppError;
use crate::state::AppState;

/// POST /api/forecast/batch
pub async fn handle_create_batch(
    State(state): State<AppState>,
    Json(input): Json<BatchForecastInput>,
) -> Result<Json<BatchForecastResult>, AppError> {
    let result = state.batch.run(input).await?;
    Ok(Json(result))
}

/// GET /api/forecast/batch/:session_id/progress
/// Server-sent `progress` events until the batch closes its session.
pub async fn handle_batch_progress(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.progress.subscribe(&session_id);
    // Replay the current snapshot to late subscribers.
    rx.mark_changed();
    Sse::new(progress_events(rx)).keep_alive(KeepAlive::default())
}

fn progress_events(rx: ProgressReceiver) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(rx, |mut rx| async move {
        loop {
            rx.changed().await.ok()?;
            let Some(update) = rx.borrow_and_update().clone() else {
                continue;
            };
            match Event::default().event("progress").json_data(&update) {
                Ok(event) => return Some((Ok(event), rx)),
                Err(e) => warn!("Skipping unserializable progress update: {e}"),
            }
        }
    })
}
