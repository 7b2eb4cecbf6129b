//! SQLite-backed ledger store.
//!
//! Each record is kept as a JSON `data` column next to the few columns the
//! store needs to query on (material identity, owning material, processing
//! status). Customer debt lives in its own column so charges can be applied
//! incrementally.
//!
//! ## Error mapping
//!
//! | SQLx error | StoreError |
//! |------------|------------|
//! | Database (unique violation) | `Conflict` |
//! | Decode / ColumnDecode | `Corrupt` |
//! | anything else | `Unavailable` |

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use tracing::{debug, instrument};
use uuid::Uuid;

use stockledger_core::{
    ActivityId, Actor, AggregateRoot, CustomerId, ExpectedVersion, MaterialId, ProcessingRecordId,
    RollId, SaleId,
};
use stockledger_events::{ActivityAction, ActivityLogEntry, EntityKind, EventEnvelope};
use stockledger_inventory::{Material, MaterialDetails, ProcessingRecord, Roll, Sale};
use stockledger_parties::Customer;

use super::identity_key;
use super::r#trait::{LedgerStore, LedgerTransaction, MaterialReferences, StoreError};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS materials (
        id TEXT PRIMARY KEY,
        name_key TEXT NOT NULL,
        kind TEXT NOT NULL,
        supplier_key TEXT NOT NULL,
        name TEXT NOT NULL,
        version INTEGER NOT NULL,
        data TEXT NOT NULL
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS materials_identity ON materials (name_key, kind, supplier_key)",
    r#"
    CREATE TABLE IF NOT EXISTS rolls (
        id TEXT PRIMARY KEY,
        material_id TEXT NOT NULL,
        data TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS rolls_material ON rolls (material_id)",
    r#"
    CREATE TABLE IF NOT EXISTS sales (
        id TEXT PRIMARY KEY,
        material_id TEXT NOT NULL,
        data TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS sales_material ON sales (material_id)",
    r#"
    CREATE TABLE IF NOT EXISTS processing_records (
        id TEXT PRIMARY KEY,
        material_id TEXT NOT NULL,
        status TEXT NOT NULL,
        data TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS processing_material ON processing_records (material_id, status)",
    r#"
    CREATE TABLE IF NOT EXISTS customers (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        debt INTEGER NOT NULL DEFAULT 0,
        data TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS material_events (
        event_id TEXT PRIMARY KEY,
        material_id TEXT NOT NULL,
        sequence_number INTEGER NOT NULL,
        event_type TEXT NOT NULL,
        actor TEXT NOT NULL,
        committed_at TEXT NOT NULL,
        payload TEXT NOT NULL,
        UNIQUE (material_id, sequence_number)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS activity_log (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL,
        recorded_at TEXT NOT NULL,
        actor TEXT NOT NULL,
        action TEXT NOT NULL,
        entity TEXT NOT NULL,
        entity_id TEXT NOT NULL,
        description TEXT NOT NULL,
        changes TEXT NOT NULL
    )
    "#,
];

/// SQLite ledger store.
///
/// Runs on a single pooled connection: SQLite serializes writers anyway, and a
/// single connection keeps `sqlite::memory:` databases alive for the life of
/// the store.
#[derive(Debug, Clone)]
pub struct SqliteLedgerStore {
    pool: SqlitePool,
}

impl SqliteLedgerStore {
    /// Open (creating if needed) the database at `url` and bootstrap the schema.
    #[instrument(skip_all, err)]
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| map_sqlx_error("connect", e))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        let store = Self { pool };
        store.bootstrap().await?;
        Ok(store)
    }

    async fn bootstrap(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("bootstrap", e))?;
        }
        debug!("sqlite schema ready");
        Ok(())
    }

    async fn fetch_data<T: DeserializeOwned>(
        &self,
        operation: &str,
        sql: &str,
        key: String,
    ) -> Result<Option<T>, StoreError> {
        let row = sqlx::query(sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        row.map(|r| decode_data(&r)).transpose()
    }

    async fn fetch_all_data<T: DeserializeOwned>(&self, operation: &str, sql: &str) -> Result<Vec<T>, StoreError> {
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        rows.iter().map(decode_data).collect()
    }
}

struct SqliteTransaction {
    tx: Transaction<'static, Sqlite>,
}

impl SqliteTransaction {
    async fn fetch_data<T: DeserializeOwned>(
        &mut self,
        operation: &str,
        sql: &str,
        key: String,
    ) -> Result<Option<T>, StoreError> {
        let row = sqlx::query(sql)
            .bind(key)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        row.map(|r| decode_data(&r)).transpose()
    }

    async fn count(&mut self, operation: &str, sql: &str, key: String) -> Result<usize, StoreError> {
        let count: i64 = sqlx::query_scalar(sql)
            .bind(key)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn execute<'q>(
        &mut self,
        operation: &str,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Result<u64, StoreError> {
        let result = query
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl LedgerTransaction for SqliteTransaction {
    async fn read_material(&mut self, id: MaterialId) -> Result<Option<Material>, StoreError> {
        self.fetch_data("read_material", "SELECT data FROM materials WHERE id = ?", id.to_string())
            .await
    }

    async fn find_material(&mut self, details: &MaterialDetails) -> Result<Option<MaterialId>, StoreError> {
        let (name_key, kind, supplier_key) = identity_key(details);
        let id: Option<String> = sqlx::query_scalar(
            "SELECT id FROM materials WHERE name_key = ? AND kind = ? AND supplier_key = ?",
        )
        .bind(name_key)
        .bind(kind)
        .bind(supplier_key)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_material", e))?;

        id.map(|s| MaterialId::from_str(&s).map_err(|e| StoreError::Corrupt(e.to_string())))
            .transpose()
    }

    async fn write_material(&mut self, material: &Material, expected: ExpectedVersion) -> Result<(), StoreError> {
        let (name_key, kind, supplier_key) = identity_key(material.details());
        let data = encode_data(material)?;
        let version = to_i64(material.version());
        let id = material.id_typed();

        let affected = match expected {
            ExpectedVersion::New => {
                let query = sqlx::query(
                    r#"
                    INSERT INTO materials (id, name_key, kind, supplier_key, name, version, data)
                    VALUES (?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(id.to_string())
                .bind(name_key)
                .bind(kind)
                .bind(supplier_key)
                .bind(material.name().to_string())
                .bind(version)
                .bind(data);
                self.execute("insert_material", query).await?
            }
            ExpectedVersion::Exact(previous) => {
                let query = sqlx::query(
                    r#"
                    UPDATE materials
                    SET name_key = ?, kind = ?, supplier_key = ?, name = ?, version = ?, data = ?
                    WHERE id = ? AND version = ?
                    "#,
                )
                .bind(name_key)
                .bind(kind)
                .bind(supplier_key)
                .bind(material.name().to_string())
                .bind(version)
                .bind(data)
                .bind(id.to_string())
                .bind(to_i64(previous));
                self.execute("update_material", query).await?
            }
        };

        if affected == 0 {
            return Err(StoreError::Conflict(format!(
                "material {id} is no longer at {expected:?}"
            )));
        }
        Ok(())
    }

    async fn delete_material(&mut self, id: MaterialId) -> Result<(), StoreError> {
        let key = id.to_string();
        self.execute(
            "delete_material_rolls",
            sqlx::query("DELETE FROM rolls WHERE material_id = ?").bind(key.clone()),
        )
        .await?;
        self.execute(
            "delete_material_processing",
            sqlx::query("DELETE FROM processing_records WHERE material_id = ? AND status = 'returned'")
                .bind(key.clone()),
        )
        .await?;
        self.execute(
            "delete_material",
            sqlx::query("DELETE FROM materials WHERE id = ?").bind(key),
        )
        .await?;
        Ok(())
    }

    async fn material_references(&mut self, id: MaterialId) -> Result<MaterialReferences, StoreError> {
        let sales = self
            .count(
                "material_references",
                "SELECT COUNT(*) FROM sales WHERE material_id = ?",
                id.to_string(),
            )
            .await?;
        let open_processing = self
            .count(
                "material_references",
                "SELECT COUNT(*) FROM processing_records WHERE material_id = ? AND status != 'returned'",
                id.to_string(),
            )
            .await?;
        Ok(MaterialReferences { sales, open_processing })
    }

    async fn insert_roll(&mut self, roll: &Roll) -> Result<(), StoreError> {
        let query = sqlx::query("INSERT INTO rolls (id, material_id, data) VALUES (?, ?, ?)")
            .bind(roll.id.to_string())
            .bind(roll.material_id.to_string())
            .bind(encode_data(roll)?);
        self.execute("insert_roll", query).await?;
        Ok(())
    }

    async fn read_roll(&mut self, id: RollId) -> Result<Option<Roll>, StoreError> {
        self.fetch_data("read_roll", "SELECT data FROM rolls WHERE id = ?", id.to_string())
            .await
    }

    async fn update_roll(&mut self, roll: &Roll) -> Result<(), StoreError> {
        let query = sqlx::query("UPDATE rolls SET data = ? WHERE id = ?")
            .bind(encode_data(roll)?)
            .bind(roll.id.to_string());
        self.execute("update_roll", query).await?;
        Ok(())
    }

    async fn delete_roll(&mut self, id: RollId) -> Result<(), StoreError> {
        let query = sqlx::query("DELETE FROM rolls WHERE id = ?").bind(id.to_string());
        self.execute("delete_roll", query).await?;
        Ok(())
    }

    async fn insert_sale(&mut self, sale: &Sale) -> Result<(), StoreError> {
        let query = sqlx::query("INSERT INTO sales (id, material_id, data) VALUES (?, ?, ?)")
            .bind(sale.id.to_string())
            .bind(sale.material_id.to_string())
            .bind(encode_data(sale)?);
        self.execute("insert_sale", query).await?;
        Ok(())
    }

    async fn read_sale(&mut self, id: SaleId) -> Result<Option<Sale>, StoreError> {
        self.fetch_data("read_sale", "SELECT data FROM sales WHERE id = ?", id.to_string())
            .await
    }

    async fn delete_sale(&mut self, id: SaleId) -> Result<(), StoreError> {
        let query = sqlx::query("DELETE FROM sales WHERE id = ?").bind(id.to_string());
        self.execute("delete_sale", query).await?;
        Ok(())
    }

    async fn insert_processing(&mut self, record: &ProcessingRecord) -> Result<(), StoreError> {
        let query = sqlx::query(
            "INSERT INTO processing_records (id, material_id, status, data) VALUES (?, ?, ?, ?)",
        )
        .bind(record.id.to_string())
        .bind(record.material_id.to_string())
        .bind(record.status.as_str())
        .bind(encode_data(record)?);
        self.execute("insert_processing", query).await?;
        Ok(())
    }

    async fn read_processing(&mut self, id: ProcessingRecordId) -> Result<Option<ProcessingRecord>, StoreError> {
        self.fetch_data(
            "read_processing",
            "SELECT data FROM processing_records WHERE id = ?",
            id.to_string(),
        )
        .await
    }

    async fn update_processing(&mut self, record: &ProcessingRecord) -> Result<(), StoreError> {
        let query = sqlx::query("UPDATE processing_records SET status = ?, data = ? WHERE id = ?")
            .bind(record.status.as_str())
            .bind(encode_data(record)?)
            .bind(record.id.to_string());
        self.execute("update_processing", query).await?;
        Ok(())
    }

    async fn insert_customer(&mut self, customer: &Customer) -> Result<(), StoreError> {
        let query = sqlx::query("INSERT INTO customers (id, name, debt, data) VALUES (?, ?, ?, ?)")
            .bind(customer.id.to_string())
            .bind(customer.name().to_string())
            .bind(customer.debt)
            .bind(encode_data(customer)?);
        self.execute("insert_customer", query).await?;
        Ok(())
    }

    async fn read_customer(&mut self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        let row = sqlx::query("SELECT data, debt FROM customers WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("read_customer", e))?;
        row.map(|r| decode_customer(&r)).transpose()
    }

    async fn update_customer(&mut self, customer: &Customer) -> Result<(), StoreError> {
        let query = sqlx::query("UPDATE customers SET name = ?, data = ? WHERE id = ?")
            .bind(customer.name().to_string())
            .bind(encode_data(customer)?)
            .bind(customer.id.to_string());
        self.execute("update_customer", query).await?;
        Ok(())
    }

    async fn delete_customer(&mut self, id: CustomerId) -> Result<(), StoreError> {
        let query = sqlx::query("DELETE FROM customers WHERE id = ?").bind(id.to_string());
        self.execute("delete_customer", query).await?;
        Ok(())
    }

    async fn charge_customer(&mut self, id: CustomerId, amount: i64) -> Result<(), StoreError> {
        // SQLite turns an overflowing integer sum into a REAL, so the new
        // total is computed here.
        let debt: Option<i64> = sqlx::query_scalar("SELECT debt FROM customers WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("charge_customer", e))?;
        let Some(debt) = debt else {
            return Ok(());
        };
        let debt = debt.checked_add(amount).ok_or_else(|| {
            StoreError::OutOfRange(format!("charging {amount} would overflow the debt of customer {id}"))
        })?;

        let query = sqlx::query("UPDATE customers SET debt = ? WHERE id = ?")
            .bind(debt)
            .bind(id.to_string());
        self.execute("charge_customer", query).await?;
        Ok(())
    }

    async fn append_event(&mut self, envelope: &EventEnvelope<JsonValue>) -> Result<(), StoreError> {
        let payload = serde_json::to_string(envelope.payload())
            .map_err(|e| StoreError::Corrupt(format!("failed to encode event payload: {e}")))?;
        let query = sqlx::query(
            r#"
            INSERT INTO material_events
                (event_id, material_id, sequence_number, event_type, actor, committed_at, payload)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(envelope.event_id().to_string())
        .bind(envelope.material_id().to_string())
        .bind(to_i64(envelope.sequence_number()))
        .bind(envelope.event_type().to_string())
        .bind(envelope.actor().as_str().to_string())
        .bind(envelope.committed_at())
        .bind(payload);
        self.execute("append_event", query).await?;
        Ok(())
    }

    async fn append_log(&mut self, entry: &ActivityLogEntry) -> Result<(), StoreError> {
        let changes = serde_json::to_string(&entry.changes)
            .map_err(|e| StoreError::Corrupt(format!("failed to encode activity changes: {e}")))?;
        let query = sqlx::query(
            r#"
            INSERT INTO activity_log (id, recorded_at, actor, action, entity, entity_id, description, changes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.recorded_at)
        .bind(entry.actor.as_str().to_string())
        .bind(entry.action.as_str())
        .bind(entry.entity.as_str())
        .bind(entry.entity_id.to_string())
        .bind(entry.description.clone())
        .bind(changes);
        self.execute("append_log", query).await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(|e| map_sqlx_error("commit", e))
    }
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, StoreError> {
        let tx = self.pool.begin().await.map_err(|e| map_sqlx_error("begin", e))?;
        Ok(Box::new(SqliteTransaction { tx }))
    }

    async fn material(&self, id: MaterialId) -> Result<Option<Material>, StoreError> {
        self.fetch_data("material", "SELECT data FROM materials WHERE id = ?", id.to_string())
            .await
    }

    async fn materials(&self) -> Result<Vec<Material>, StoreError> {
        self.fetch_all_data("materials", "SELECT data FROM materials ORDER BY name, id")
            .await
    }

    async fn roll(&self, id: RollId) -> Result<Option<Roll>, StoreError> {
        self.fetch_data("roll", "SELECT data FROM rolls WHERE id = ?", id.to_string())
            .await
    }

    async fn rolls(&self, material_id: MaterialId) -> Result<Vec<Roll>, StoreError> {
        let rows = sqlx::query("SELECT data FROM rolls WHERE material_id = ?")
            .bind(material_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("rolls", e))?;
        let mut rolls: Vec<Roll> = rows.iter().map(decode_data).collect::<Result<_, _>>()?;
        rolls.sort_by_key(|r| (r.received_at, r.id));
        Ok(rolls)
    }

    async fn sale(&self, id: SaleId) -> Result<Option<Sale>, StoreError> {
        self.fetch_data("sale", "SELECT data FROM sales WHERE id = ?", id.to_string())
            .await
    }

    async fn sales(&self) -> Result<Vec<Sale>, StoreError> {
        let mut sales: Vec<Sale> = self.fetch_all_data("sales", "SELECT data FROM sales").await?;
        sales.sort_by(|a, b| b.sold_at.cmp(&a.sold_at).then(b.id.cmp(&a.id)));
        Ok(sales)
    }

    async fn processing_record(&self, id: ProcessingRecordId) -> Result<Option<ProcessingRecord>, StoreError> {
        self.fetch_data(
            "processing_record",
            "SELECT data FROM processing_records WHERE id = ?",
            id.to_string(),
        )
        .await
    }

    async fn processing_records(&self) -> Result<Vec<ProcessingRecord>, StoreError> {
        let mut records: Vec<ProcessingRecord> = self
            .fetch_all_data("processing_records", "SELECT data FROM processing_records")
            .await?;
        records.sort_by(|a, b| b.sent_at.cmp(&a.sent_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        let row = sqlx::query("SELECT data, debt FROM customers WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("customer", e))?;
        row.map(|r| decode_customer(&r)).transpose()
    }

    async fn customers(&self) -> Result<Vec<Customer>, StoreError> {
        let rows = sqlx::query("SELECT data, debt FROM customers ORDER BY name, id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("customers", e))?;
        rows.iter().map(decode_customer).collect()
    }

    async fn events(&self, material_id: MaterialId) -> Result<Vec<EventEnvelope<JsonValue>>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT event_id, material_id, sequence_number, event_type, actor, committed_at, payload
            FROM material_events
            WHERE material_id = ?
            ORDER BY sequence_number ASC
            "#,
        )
        .bind(material_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("events", e))?;
        rows.iter().map(decode_event).collect()
    }

    async fn activity(&self, limit: usize) -> Result<Vec<ActivityLogEntry>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, recorded_at, actor, action, entity, entity_id, description, changes
            FROM activity_log
            ORDER BY seq DESC
            LIMIT ?
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("activity", e))?;
        rows.iter().map(decode_activity).collect()
    }
}

fn to_i64(version: u64) -> i64 {
    i64::try_from(version).unwrap_or(i64::MAX)
}

fn encode_data<T: Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| StoreError::Corrupt(format!("failed to encode record: {e}")))
}

fn decode_data<T: DeserializeOwned>(row: &SqliteRow) -> Result<T, StoreError> {
    let data: String = row
        .try_get("data")
        .map_err(|e| map_sqlx_error("decode", e))?;
    serde_json::from_str(&data).map_err(|e| StoreError::Corrupt(format!("failed to decode record: {e}")))
}

fn decode_customer(row: &SqliteRow) -> Result<Customer, StoreError> {
    let mut customer: Customer = decode_data(row)?;
    customer.debt = row.try_get("debt").map_err(|e| map_sqlx_error("decode", e))?;
    Ok(customer)
}

fn decode_event(row: &SqliteRow) -> Result<EventEnvelope<JsonValue>, StoreError> {
    let column = |name: &str| -> Result<String, StoreError> {
        row.try_get::<String, _>(name).map_err(|e| map_sqlx_error("decode", e))
    };
    let sequence_number: i64 = row
        .try_get("sequence_number")
        .map_err(|e| map_sqlx_error("decode", e))?;
    let committed_at: DateTime<Utc> = row
        .try_get("committed_at")
        .map_err(|e| map_sqlx_error("decode", e))?;

    Ok(EventEnvelope::new(
        Uuid::parse_str(&column("event_id")?).map_err(corrupt)?,
        MaterialId::from_str(&column("material_id")?).map_err(corrupt)?,
        column("event_type")?,
        u64::try_from(sequence_number).map_err(corrupt)?,
        Actor::new(column("actor")?),
        committed_at,
        serde_json::from_str(&column("payload")?).map_err(corrupt)?,
    ))
}

fn decode_activity(row: &SqliteRow) -> Result<ActivityLogEntry, StoreError> {
    let column = |name: &str| -> Result<String, StoreError> {
        row.try_get::<String, _>(name).map_err(|e| map_sqlx_error("decode", e))
    };

    let recorded_at: DateTime<Utc> = row
        .try_get("recorded_at")
        .map_err(|e| map_sqlx_error("decode", e))?;

    Ok(ActivityLogEntry {
        id: ActivityId::from_str(&column("id")?).map_err(corrupt)?,
        recorded_at,
        actor: Actor::new(column("actor")?),
        action: ActivityAction::from_str(&column("action")?).map_err(corrupt)?,
        entity: EntityKind::from_str(&column("entity")?).map_err(corrupt)?,
        entity_id: Uuid::parse_str(&column("entity_id")?).map_err(corrupt)?,
        description: column("description")?,
        changes: serde_json::from_str(&column("changes")?).map_err(corrupt)?,
    })
}

fn corrupt(err: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(err.to_string())
}

/// Map SQLx errors to `StoreError` (see the module docs for the table).
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::Conflict(format!("unique constraint violated in {operation}: {}", db_err.message()))
        }
        sqlx::Error::Database(db_err) => {
            StoreError::Unavailable(format!("database error in {operation}: {}", db_err.message()))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Corrupt(format!("failed to decode row in {operation}: {err}"))
        }
        _ => StoreError::Unavailable(format!("sqlx error in {operation}: {err}")),
    }
}
