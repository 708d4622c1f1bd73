//! CarpeCarb server - the lookup pipeline behind an HTTP callable endpoint.
//!
//! - `POST /v1/carbs` with `{"input": "..."}` or `{"foodItem": "..."}`
//! - `GET /health`

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use carpecarb_lookup::CompletionClient;
use tower_http::trace::TraceLayer;

pub use config::AppConfig;
pub use state::AppState;

pub fn router<C: CompletionClient + 'static>(state: AppState<C>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/v1/carbs", post(handlers::lookup_carbs::<C>))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
