use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::json;

use stockledger_core::ProcessingRecordId;

use crate::app::errors::{self, ApiResult};
use crate::app::dto;
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(send_for_processing).get(list_processing))
        .route("/:id/receive", post(receive_from_processing))
}

pub async fn send_for_processing(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    payload: Result<Json<dto::SendForProcessingRequest>, JsonRejection>,
) -> ApiResult {
    let body = errors::body(payload)?;

    let sent = services
        .ledger()
        .send_for_processing(ctx.actor(), body.material_id, body.quantity, body.provider)
        .await
        .map_err(errors::ledger_error_to_response)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "recordId": sent.record.id,
            "quantityRemaining": sent.quantity_remaining,
        })),
    )
        .into_response())
}

pub async fn receive_from_processing(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    payload: Result<Json<dto::ReceiveFromProcessingRequest>, JsonRejection>,
) -> ApiResult {
    let record_id: ProcessingRecordId = errors::parse_id(&id)?;
    let body = errors::body(payload)?;

    let received = services
        .ledger()
        .receive_from_processing(ctx.actor(), record_id, body.quantity)
        .await
        .map_err(errors::ledger_error_to_response)?;

    Ok(Json(json!({
        "recordId": received.record.id,
        "status": received.record.status.as_str(),
        "quantityRemaining": received.quantity_remaining,
    }))
    .into_response())
}

pub async fn list_processing(Extension(services): Extension<Arc<AppServices>>) -> ApiResult {
    let records = services
        .ledger()
        .processing_records()
        .await
        .map_err(errors::ledger_error_to_response)?;

    Ok(Json(records.iter().map(dto::processing_to_json).collect::<Vec<_>>()).into_response())
}
