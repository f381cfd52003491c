use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::forecast::models::{ForecastInput, ForecastResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteQuery {
    #[serde(default, alias = "driveFileId")]
    pub remote_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

/// POST /api/forecast
pub async fn handle_create_forecast(
    State(state): State<AppState>,
    Json(input): Json<ForecastInput>,
) -> Result<Json<ForecastResult>, AppError> {
    let result = state.pipeline.run(input).await?;
    Ok(Json(result))
}

/// DELETE /api/forecast/:id?remoteId=...
pub async fn handle_delete_forecast(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<DeleteQuery>,
) -> Result<Json<DeleteResponse>, AppError> {
    state
        .pipeline
        .delete(id, params.remote_id.as_deref())
        .await?;
    Ok(Json(DeleteResponse { success: true }))
}
