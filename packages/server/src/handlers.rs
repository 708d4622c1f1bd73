use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use carpecarb_lookup::{CompletionClient, LookupError, LookupResult, Mode};
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn health() -> &'static str {
    "OK"
}

/// Callable lookup: `{"input": ...}` for several items, `{"foodItem": ...}`
/// for a single one.
pub async fn lookup_carbs<C: CompletionClient + 'static>(
    State(state): State<AppState<C>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<LookupResult>, ApiError> {
    let Json(body) = payload.map_err(|e| {
        LookupError::InvalidArgument(format!("request body must be JSON: {}", e.body_text()))
    })?;

    let (raw, mode) = parse_callable(&body)?;
    let result = state.service.lookup(raw, mode).await?;
    Ok(Json(result))
}

/// Pick the input text and mode out of a callable request body.
pub fn parse_callable(body: &Value) -> Result<(&str, Mode), LookupError> {
    let (field, mode) = if body.get("input").is_some() {
        ("input", Mode::Multi)
    } else if body.get("foodItem").is_some() {
        ("foodItem", Mode::Single)
    } else {
        return Err(LookupError::InvalidArgument("input is required".into()));
    };

    body[field]
        .as_str()
        .map(|raw| (raw, mode))
        .ok_or_else(|| LookupError::InvalidArgument(format!("{field} must be a string")))
}
