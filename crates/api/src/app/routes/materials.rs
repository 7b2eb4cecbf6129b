use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use stockledger_core::MaterialId;
use stockledger_infra::ledger::NewMaterial;

use crate::app::errors::{self, ApiResult};
use crate::app::dto;
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(add_material).get(list_materials))
        .route("/low-stock", get(low_stock))
        .route("/:id", get(get_material).put(update_material).delete(delete_material))
        .route("/:id/adjust", post(adjust_material))
        .route("/:id/rolls", post(receive_rolls).get(list_rolls))
}

pub async fn add_material(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    payload: Result<Json<dto::CreateMaterialRequest>, JsonRejection>,
) -> ApiResult {
    let body = errors::body(payload)?;
    let details = body
        .details
        .into_details()
        .map_err(errors::domain_error_to_response)?;

    let material = services
        .ledger()
        .add_material(
            ctx.actor(),
            NewMaterial {
                details,
                opening_stock: body.opening_stock,
            },
        )
        .await
        .map_err(errors::ledger_error_to_response)?;

    Ok((StatusCode::CREATED, Json(dto::material_to_json(&material))).into_response())
}

pub async fn list_materials(Extension(services): Extension<Arc<AppServices>>) -> ApiResult {
    let materials = services
        .ledger()
        .materials()
        .await
        .map_err(errors::ledger_error_to_response)?;

    Ok(Json(materials.iter().map(dto::material_to_json).collect::<Vec<_>>()).into_response())
}

pub async fn get_material(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let material_id: MaterialId = errors::parse_id(&id)?;

    let material = services
        .ledger()
        .material(material_id)
        .await
        .map_err(errors::ledger_error_to_response)?;

    Ok(Json(dto::material_to_json(&material)).into_response())
}

pub async fn update_material(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    payload: Result<Json<dto::MaterialDetailsRequest>, JsonRejection>,
) -> ApiResult {
    let material_id: MaterialId = errors::parse_id(&id)?;
    let details = errors::body(payload)?
        .into_details()
        .map_err(errors::domain_error_to_response)?;

    let material = services
        .ledger()
        .update_material(ctx.actor(), material_id, details)
        .await
        .map_err(errors::ledger_error_to_response)?;

    Ok(Json(dto::material_to_json(&material)).into_response())
}

pub async fn delete_material(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let material_id: MaterialId = errors::parse_id(&id)?;

    services
        .ledger()
        .delete_material(ctx.actor(), material_id)
        .await
        .map_err(errors::ledger_error_to_response)?;

    Ok(Json(json!({ "ok": true })).into_response())
}

pub async fn adjust_material(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    payload: Result<Json<dto::AdjustStockRequest>, JsonRejection>,
) -> ApiResult {
    let material_id: MaterialId = errors::parse_id(&id)?;
    let body = errors::body(payload)?;

    let level = services
        .ledger()
        .adjust_material_direct(ctx.actor(), material_id, body.delta, body.reason)
        .await
        .map_err(errors::ledger_error_to_response)?;

    Ok(Json(json!({
        "materialId": level.material_id,
        "quantityRemaining": level.quantity_remaining,
    }))
    .into_response())
}

pub async fn receive_rolls(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    payload: Result<Json<dto::ReceiveRollsRequest>, JsonRejection>,
) -> ApiResult {
    let material_id: MaterialId = errors::parse_id(&id)?;
    let body = errors::body(payload)?;

    let received = services
        .ledger()
        .receive_rolls(ctx.actor(), material_id, body.quantities)
        .await
        .map_err(errors::ledger_error_to_response)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "materialId": received.material_id,
            "rolls": received.rolls.iter().map(dto::roll_to_json).collect::<Vec<_>>(),
            "quantityRemaining": received.quantity_remaining,
        })),
    )
        .into_response())
}

pub async fn list_rolls(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let material_id: MaterialId = errors::parse_id(&id)?;

    let rolls = services
        .ledger()
        .rolls(material_id)
        .await
        .map_err(errors::ledger_error_to_response)?;

    Ok(Json(rolls.iter().map(dto::roll_to_json).collect::<Vec<_>>()).into_response())
}

/// Served from the low-stock projection, so it may trail a just-committed
/// operation by a moment.
pub async fn low_stock(Extension(services): Extension<Arc<AppServices>>) -> ApiResult {
    Ok(Json(services.low_stock().below_reorder_point()).into_response())
}
