use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
    Json, Router,
};
use serde_json::json;

use stockledger_core::SaleId;
use stockledger_infra::ledger::NewSale;

use crate::app::errors::{self, ApiResult};
use crate::app::dto;
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(record_sale).get(list_sales))
        .route("/:id", delete(delete_sale))
}

pub async fn record_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    payload: Result<Json<dto::RecordSaleRequest>, JsonRejection>,
) -> ApiResult {
    let body = errors::body(payload)?;

    let recorded = services
        .ledger()
        .record_sale(
            ctx.actor(),
            NewSale {
                material_id: body.material_id,
                quantity: body.quantity,
                customer_id: body.customer_id,
                unit_price: body.unit_price,
                amount_due: body.amount_due,
            },
        )
        .await
        .map_err(errors::ledger_error_to_response)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "saleId": recorded.sale.id,
            "materialId": recorded.sale.material_id,
            "quantityRemaining": recorded.quantity_remaining,
        })),
    )
        .into_response())
}

pub async fn delete_sale(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> ApiResult {
    let sale_id: SaleId = errors::parse_id(&id)?;

    let deleted = services
        .ledger()
        .delete_sale(ctx.actor(), sale_id)
        .await
        .map_err(errors::ledger_error_to_response)?;

    Ok(Json(json!({
        "ok": true,
        "quantityRemaining": deleted.quantity_remaining,
    }))
    .into_response())
}

pub async fn list_sales(Extension(services): Extension<Arc<AppServices>>) -> ApiResult {
    let sales = services
        .ledger()
        .sales()
        .await
        .map_err(errors::ledger_error_to_response)?;

    Ok(Json(sales.iter().map(dto::sale_to_json).collect::<Vec<_>>()).into_response())
}
