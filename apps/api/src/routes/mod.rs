pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::services::ServeDir;

use crate::batch::handlers as batch_handlers;
use crate::forecast::handlers as forecast_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let generated = ServeDir::new(&state.config.generated_dir);

    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/forecast",
            post(forecast_handlers::handle_create_forecast),
        )
        .route(
            "/api/forecast/:id",
            delete(forecast_handlers::handle_delete_forecast),
        )
        .route("/api/forecast/batch", post(batch_handlers::handle_create_batch))
        .route(
            "/api/forecast/batch/:session_id/progress",
            get(batch_handlers::handle_batch_progress),
        )
        .nest_service("/static", generated)
        .with_state(state)
}
