//! Failure responses.
//!
//! Every failure has the body `{ "error": "<Kind>", "message": "...", ...context }`
//! where `<Kind>` is the ledger's stable error name.
//!
//! | Kind | Status |
//! |------|--------|
//! | `InvalidQuantity`, `InvalidId`, `Validation` | 400 |
//! | `UnknownMaterial`, `UnknownSale`, `UnknownRecord`, `UnknownRoll`, `UnknownCustomer` | 404 |
//! | `Conflict`, `MaterialInUse` | 409 |
//! | `InsufficientStock`, `OverReturn` | 422 |
//! | `StorageUnavailable` | 503 |

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{Map, Value as JsonValue, json};
use tracing::error;

use stockledger_core::DomainError;
use stockledger_infra::LedgerError;

/// Handler result: both arms are complete responses.
pub type ApiResult = Result<Response, Response>;

pub fn ledger_error_to_response(err: LedgerError) -> Response {
    let kind = err.kind();
    let message = err.to_string();
    match err {
        LedgerError::Domain(domain) => domain_error_to_response(domain),
        LedgerError::StorageUnavailable(_) => {
            error!(error = %message, "ledger storage unavailable");
            json_error(StatusCode::SERVICE_UNAVAILABLE, kind, message)
        }
        LedgerError::Conflict(_) => json_error(StatusCode::CONFLICT, kind, message),
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    let kind = err.kind();
    let message = err.to_string();
    let (status, context) = match err {
        DomainError::Validation(_) | DomainError::InvalidId(_) => (StatusCode::BAD_REQUEST, json!({})),
        DomainError::InvalidQuantity { requested } => {
            (StatusCode::BAD_REQUEST, json!({ "requested": requested }))
        }
        DomainError::UnknownMaterial(id) => (StatusCode::NOT_FOUND, json!({ "materialId": id })),
        DomainError::UnknownSale(id) => (StatusCode::NOT_FOUND, json!({ "saleId": id })),
        DomainError::UnknownRecord(id) => (StatusCode::NOT_FOUND, json!({ "recordId": id })),
        DomainError::UnknownRoll(id) => (StatusCode::NOT_FOUND, json!({ "rollId": id })),
        DomainError::UnknownCustomer(id) => (StatusCode::NOT_FOUND, json!({ "customerId": id })),
        DomainError::InsufficientStock { material_id, requested, available } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "materialId": material_id, "requested": requested, "available": available }),
        ),
        DomainError::OverReturn { record_id, requested, outstanding } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "recordId": record_id, "requested": requested, "outstanding": outstanding }),
        ),
        DomainError::MaterialInUse { material_id, sales, open_processing } => (
            StatusCode::CONFLICT,
            json!({ "materialId": material_id, "sales": sales, "openProcessing": open_processing }),
        ),
        DomainError::Conflict(_) => (StatusCode::CONFLICT, json!({})),
    };
    json_error_with(status, kind, message, context)
}

/// Unwrap a JSON body, turning a malformed one into a `Validation` failure.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| json_error(StatusCode::BAD_REQUEST, "Validation", rejection.body_text()))
}

/// Parse a path id, turning a malformed one into an `InvalidId` failure.
pub fn parse_id<T>(raw: &str) -> Result<T, Response>
where
    T: core::str::FromStr<Err = DomainError>,
{
    raw.parse().map_err(domain_error_to_response)
}

pub fn json_error(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Response {
    json_error_with(status, kind, message, json!({}))
}

fn json_error_with(
    status: StatusCode,
    kind: &'static str,
    message: impl Into<String>,
    context: JsonValue,
) -> Response {
    let mut body = Map::new();
    body.insert("error".to_string(), JsonValue::from(kind));
    body.insert("message".to_string(), JsonValue::from(message.into()));
    if let JsonValue::Object(extra) = context {
        body.extend(extra);
    }
    (status, Json(JsonValue::Object(body))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockledger_core::{MaterialId, ProcessingRecordId};

    #[test]
    fn stock_rejections_are_unprocessable() {
        let resp = ledger_error_to_response(LedgerError::from(DomainError::InsufficientStock {
            material_id: MaterialId::new(),
            requested: 4,
            available: 3,
        }));
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let resp = domain_error_to_response(DomainError::OverReturn {
            record_id: ProcessingRecordId::new(),
            requested: 2,
            outstanding: 1,
        });
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn statuses_follow_kinds() {
        let cases = [
            (LedgerError::from(DomainError::invalid_quantity(0)), StatusCode::BAD_REQUEST),
            (LedgerError::from(DomainError::UnknownMaterial(MaterialId::new())), StatusCode::NOT_FOUND),
            (LedgerError::from(DomainError::conflict("duplicate")), StatusCode::CONFLICT),
            (LedgerError::Conflict("stale version".into()), StatusCode::CONFLICT),
            (LedgerError::StorageUnavailable("disk".into()), StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (err, status) in cases {
            assert_eq!(ledger_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn malformed_path_id_is_a_bad_request() {
        let resp = parse_id::<MaterialId>("42").unwrap_err();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
