use serde::Deserialize;
use serde_json::{Value as JsonValue, json};

use stockledger_core::{CustomerId, DomainError, MaterialId, Quantity};
use stockledger_events::ActivityLogEntry;
use stockledger_inventory::{
    Material, MaterialDetails, MaterialKind, ProcessingRecord, Roll, Sale, UnitOfMeasure,
};
use stockledger_parties::{Customer, CustomerDetails};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialDetailsRequest {
    pub name: String,
    #[serde(default, alias = "type")]
    pub kind: MaterialKind,
    #[serde(default)]
    pub colour: Option<String>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub unit: UnitOfMeasure,
    #[serde(default)]
    pub reorder_point: Option<i64>,
}

impl MaterialDetailsRequest {
    pub fn into_details(self) -> Result<MaterialDetails, DomainError> {
        let reorder_point = self.reorder_point.map(Quantity::non_negative).transpose()?;
        Ok(MaterialDetails {
            name: self.name,
            kind: self.kind,
            colour: blank_to_none(self.colour),
            supplier: blank_to_none(self.supplier),
            unit: self.unit,
            reorder_point,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaterialRequest {
    #[serde(flatten)]
    pub details: MaterialDetailsRequest,
    #[serde(default)]
    pub opening_stock: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockRequest {
    pub delta: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveRollsRequest {
    pub quantities: Vec<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeRollRequest {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSaleRequest {
    #[serde(alias = "material_id")]
    pub material_id: MaterialId,
    #[serde(alias = "quantity_sold", alias = "quantitySold")]
    pub quantity: i64,
    #[serde(default, alias = "customer_id")]
    pub customer_id: Option<CustomerId>,
    #[serde(default, alias = "price")]
    pub unit_price: u64,
    #[serde(default, alias = "amount_due")]
    pub amount_due: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendForProcessingRequest {
    #[serde(alias = "material_id")]
    pub material_id: MaterialId,
    pub quantity: i64,
    #[serde(default, alias = "service_provider")]
    pub provider: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveFromProcessingRequest {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRequest {
    pub name: String,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl From<CustomerRequest> for CustomerDetails {
    fn from(body: CustomerRequest) -> Self {
        CustomerDetails {
            name: body.name,
            contact: blank_to_none(body.contact),
            location: blank_to_none(body.location),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn material_to_json(m: &Material) -> JsonValue {
    let details = m.details();
    json!({
        "id": m.id_typed(),
        "name": details.name,
        "kind": details.kind,
        "colour": details.colour,
        "supplier": details.supplier,
        "unit": details.unit,
        "reorderPoint": details.reorder_point,
        "quantityOnHand": m.quantity_on_hand(),
        "needsReorder": m.needs_reorder(),
    })
}

pub fn roll_to_json(r: &Roll) -> JsonValue {
    json!({
        "id": r.id,
        "materialId": r.material_id,
        "quantity": r.quantity,
        "receivedAt": r.received_at.to_rfc3339(),
    })
}

pub fn sale_to_json(s: &Sale) -> JsonValue {
    json!({
        "id": s.id,
        "materialId": s.material_id,
        "customerId": s.customer_id,
        "quantity": s.quantity,
        "unitPrice": s.unit_price,
        "totalPrice": s.total_price(),
        "amountDue": s.amount_due,
        "soldAt": s.sold_at.to_rfc3339(),
    })
}

pub fn processing_to_json(r: &ProcessingRecord) -> JsonValue {
    json!({
        "id": r.id,
        "materialId": r.material_id,
        "provider": r.provider,
        "quantitySent": r.quantity_sent,
        "quantityReturned": r.quantity_returned,
        "outstanding": r.outstanding(),
        "status": r.status.as_str(),
        "sentAt": r.sent_at.to_rfc3339(),
        "lastReceivedAt": r.last_received_at.map(|t| t.to_rfc3339()),
    })
}

pub fn customer_to_json(c: &Customer) -> JsonValue {
    json!({
        "id": c.id,
        "name": c.details.name,
        "contact": c.details.contact,
        "location": c.details.location,
        "debt": c.debt,
    })
}

pub fn activity_to_json(e: &ActivityLogEntry) -> JsonValue {
    json!({
        "id": e.id,
        "recordedAt": e.recorded_at.to_rfc3339(),
        "actor": e.actor,
        "action": e.action.as_str(),
        "entity": e.entity.as_str(),
        "entityId": e.entity_id,
        "description": e.description,
        "changes": e.changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sale_request_accepts_legacy_field_names() {
        let material_id = MaterialId::new();
        let body: RecordSaleRequest = serde_json::from_value(json!({
            "material_id": material_id,
            "quantity_sold": 4,
            "price": 120,
        }))
        .unwrap();
        assert_eq!(body.material_id, material_id);
        assert_eq!(body.quantity, 4);
        assert_eq!(body.unit_price, 120);
        assert_eq!(body.customer_id, None);
    }

    #[test]
    fn negative_reorder_point_is_rejected() {
        let body: CreateMaterialRequest = serde_json::from_value(json!({
            "name": "Voile",
            "type": "ensiz",
            "reorderPoint": -1,
        }))
        .unwrap();
        assert_eq!(body.details.kind, MaterialKind::Narrow);
        assert_eq!(
            body.details.into_details().unwrap_err(),
            DomainError::InvalidQuantity { requested: -1 }
        );
    }

    #[test]
    fn blank_optional_text_is_dropped() {
        let details: CustomerDetails = CustomerRequest {
            name: "Nazli".to_string(),
            contact: Some(" ".to_string()),
            location: Some("Bursa".to_string()),
        }
        .into();
        assert_eq!(details.contact, None);
        assert_eq!(details.location.as_deref(), Some("Bursa"));
    }
}
