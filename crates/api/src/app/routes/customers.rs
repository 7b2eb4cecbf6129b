use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;

use stockledger_core::CustomerId;

use crate::app::errors::{self, ApiResult};
use crate::app::dto;
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_customers).post(add_customer))
        .route("/:id", get(get_customer).put(update_customer).delete(delete_customer))
}

pub async fn add_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    payload: Result<Json<dto::CustomerRequest>, JsonRejection>,
) -> ApiResult {
    let body = errors::body(payload)?;

    let customer = services
        .ledger()
        .add_customer(ctx.actor(), body.into())
        .await
        .map_err(errors::ledger_error_to_response)?;

    Ok((StatusCode::CREATED, Json(dto::customer_to_json(&customer))).into_response())
}

pub async fn list_customers(Extension(services): Extension<Arc<AppServices>>) -> ApiResult {
    let customers = services
        .ledger()
        .customers()
        .await
        .map_err(errors::ledger_error_to_response)?;

    Ok(Json(customers.iter().map(dto::customer_to_json).collect::<Vec<_>>()).into_response())
}

pub async fn get_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> ApiResult {
    let customer_id: CustomerId = errors::parse_id(&id)?;

    let customer = services
        .ledger()
        .customer(customer_id)
        .await
        .map_err(errors::ledger_error_to_response)?;

    Ok(Json(dto::customer_to_json(&customer)).into_response())
}

pub async fn update_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    payload: Result<Json<dto::CustomerRequest>, JsonRejection>,
) -> ApiResult {
    let customer_id: CustomerId = errors::parse_id(&id)?;
    let body = errors::body(payload)?;

    let customer = services
        .ledger()
        .update_customer(ctx.actor(), customer_id, body.into())
        .await
        .map_err(errors::ledger_error_to_response)?;

    Ok(Json(dto::customer_to_json(&customer)).into_response())
}

pub async fn delete_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let customer_id: CustomerId = errors::parse_id(&id)?;

    services
        .ledger()
        .delete_customer(ctx.actor(), customer_id)
        .await
        .map_err(errors::ledger_error_to_response)?;

    Ok(Json(json!({ "ok": true })).into_response())
}
