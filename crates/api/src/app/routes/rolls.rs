use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    response::IntoResponse,
    routing::put,
    Json, Router,
};
use serde_json::json;

use stockledger_core::RollId;

use crate::app::errors::{self, ApiResult};
use crate::app::dto;
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new().route("/:id", put(resize_roll).delete(remove_roll))
}

pub async fn resize_roll(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    payload: Result<Json<dto::ResizeRollRequest>, JsonRejection>,
) -> ApiResult {
    let roll_id: RollId = errors::parse_id(&id)?;
    let body = errors::body(payload)?;

    let resized = services
        .ledger()
        .resize_roll(ctx.actor(), roll_id, body.quantity)
        .await
        .map_err(errors::ledger_error_to_response)?;

    Ok(Json(json!({
        "roll": dto::roll_to_json(&resized.roll),
        "quantityRemaining": resized.quantity_remaining,
    }))
    .into_response())
}

pub async fn remove_roll(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let roll_id: RollId = errors::parse_id(&id)?;

    let level = services
        .ledger()
        .remove_roll(ctx.actor(), roll_id)
        .await
        .map_err(errors::ledger_error_to_response)?;

    Ok(Json(json!({
        "materialId": level.material_id,
        "quantityRemaining": level.quantity_remaining,
    }))
    .into_response())
}
