use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::app::errors::{self, ApiResult};
use crate::app::dto;
use crate::app::services::AppServices;

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1_000;

pub fn router() -> Router {
    Router::new().route("/", get(list_logs))
}

/// Activity log, newest first.
pub async fn list_logs(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::LogsQuery>,
) -> ApiResult {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);

    let entries = services
        .ledger()
        .activity(limit)
        .await
        .map_err(errors::ledger_error_to_response)?;

    Ok(Json(entries.iter().map(dto::activity_to_json).collect::<Vec<_>>()).into_response())
}
