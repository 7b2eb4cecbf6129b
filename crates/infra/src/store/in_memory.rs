use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use stockledger_core::{
    AggregateRoot, CustomerId, ExpectedVersion, MaterialId, ProcessingRecordId, RollId, SaleId,
};
use stockledger_events::{ActivityLogEntry, EventEnvelope};
use stockledger_inventory::{Material, MaterialDetails, ProcessingRecord, ProcessingStatus, Roll, Sale};
use stockledger_parties::Customer;

use super::identity_key;
use super::r#trait::{LedgerStore, LedgerTransaction, MaterialReferences, StoreError};

#[derive(Debug, Default)]
struct Tables {
    materials: HashMap<MaterialId, Material>,
    rolls: HashMap<RollId, Roll>,
    sales: HashMap<SaleId, Sale>,
    processing: HashMap<ProcessingRecordId, ProcessingRecord>,
    customers: HashMap<CustomerId, Customer>,
    events: Vec<EventEnvelope<JsonValue>>,
    activity: Vec<ActivityLogEntry>,
}

/// In-memory ledger store.
///
/// Intended for tests/dev. Transactions stage their writes privately and
/// apply them under a single write lock on commit.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables.read().map_err(|_| poisoned())
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("in-memory store lock poisoned".to_string())
}

fn debt_overflow(id: CustomerId, amount: i64) -> StoreError {
    StoreError::OutOfRange(format!("charging {amount} would overflow the debt of customer {id}"))
}

/// Pending changes to one table. `Some` upserts, `None` deletes.
#[derive(Debug)]
struct Staged<K, V> {
    changes: HashMap<K, Option<V>>,
}

impl<K, V> Default for Staged<K, V> {
    fn default() -> Self {
        Self { changes: HashMap::new() }
    }
}

impl<K, V> Staged<K, V>
where
    K: Eq + Hash + Copy,
    V: Clone,
{
    fn get(&self, base: &HashMap<K, V>, key: &K) -> Option<V> {
        match self.changes.get(key) {
            Some(change) => change.clone(),
            None => base.get(key).cloned(),
        }
    }

    fn put(&mut self, key: K, value: V) {
        self.changes.insert(key, Some(value));
    }

    fn remove(&mut self, key: K) {
        self.changes.insert(key, None);
    }

    /// Rows as this transaction sees them.
    fn visible(&self, base: &HashMap<K, V>) -> Vec<V> {
        let mut rows: Vec<V> = base
            .iter()
            .filter(|(k, _)| !self.changes.contains_key(k))
            .map(|(_, v)| v.clone())
            .collect();
        rows.extend(self.changes.values().flatten().cloned());
        rows
    }

    fn apply_to(self, base: &mut HashMap<K, V>) {
        for (key, change) in self.changes {
            match change {
                Some(value) => {
                    base.insert(key, value);
                }
                None => {
                    base.remove(&key);
                }
            }
        }
    }
}

struct InMemoryTransaction {
    tables: Arc<RwLock<Tables>>,
    materials: Staged<MaterialId, Material>,
    rolls: Staged<RollId, Roll>,
    sales: Staged<SaleId, Sale>,
    processing: Staged<ProcessingRecordId, ProcessingRecord>,
    customers: Staged<CustomerId, Customer>,
    /// Net debt change per customer.
    charges: HashMap<CustomerId, i64>,
    events: Vec<EventEnvelope<JsonValue>>,
    activity: Vec<ActivityLogEntry>,
    /// Committed version each written material must still have at commit.
    expectations: HashMap<MaterialId, ExpectedVersion>,
}

impl InMemoryTransaction {
    fn base(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables.read().map_err(|_| poisoned())
    }

    fn pending_charge(&self, id: CustomerId) -> i64 {
        self.charges.get(&id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl LedgerTransaction for InMemoryTransaction {
    async fn read_material(&mut self, id: MaterialId) -> Result<Option<Material>, StoreError> {
        let base = self.base()?;
        Ok(self.materials.get(&base.materials, &id))
    }

    async fn find_material(&mut self, details: &MaterialDetails) -> Result<Option<MaterialId>, StoreError> {
        let base = self.base()?;
        let key = identity_key(details);
        Ok(self
            .materials
            .visible(&base.materials)
            .into_iter()
            .find(|m| !m.is_deleted() && identity_key(m.details()) == key)
            .map(|m| m.id_typed()))
    }

    async fn write_material(&mut self, material: &Material, expected: ExpectedVersion) -> Result<(), StoreError> {
        let id = material.id_typed();
        let current = {
            let base = self.base()?;
            self.materials.get(&base.materials, &id).map(|m| m.version())
        };
        if !expected.matches(current) {
            return Err(StoreError::Conflict(format!(
                "material {id} expected {expected:?}, found {current:?}"
            )));
        }
        self.expectations.entry(id).or_insert(expected);
        self.materials.put(id, material.clone());
        Ok(())
    }

    async fn delete_material(&mut self, id: MaterialId) -> Result<(), StoreError> {
        let (rolls, returned) = {
            let base = self.base()?;
            let rolls: Vec<RollId> = self
                .rolls
                .visible(&base.rolls)
                .into_iter()
                .filter(|r| r.material_id == id)
                .map(|r| r.id)
                .collect();
            let returned: Vec<ProcessingRecordId> = self
                .processing
                .visible(&base.processing)
                .into_iter()
                .filter(|p| p.material_id == id && p.status == ProcessingStatus::Returned)
                .map(|p| p.id)
                .collect();
            (rolls, returned)
        };
        for roll in rolls {
            self.rolls.remove(roll);
        }
        for record in returned {
            self.processing.remove(record);
        }
        self.materials.remove(id);
        Ok(())
    }

    async fn material_references(&mut self, id: MaterialId) -> Result<MaterialReferences, StoreError> {
        let base = self.base()?;
        let sales = self
            .sales
            .visible(&base.sales)
            .iter()
            .filter(|s| s.material_id == id)
            .count();
        let open_processing = self
            .processing
            .visible(&base.processing)
            .iter()
            .filter(|p| p.material_id == id && p.is_open())
            .count();
        Ok(MaterialReferences { sales, open_processing })
    }

    async fn insert_roll(&mut self, roll: &Roll) -> Result<(), StoreError> {
        self.rolls.put(roll.id, roll.clone());
        Ok(())
    }

    async fn read_roll(&mut self, id: RollId) -> Result<Option<Roll>, StoreError> {
        let base = self.base()?;
        Ok(self.rolls.get(&base.rolls, &id))
    }

    async fn update_roll(&mut self, roll: &Roll) -> Result<(), StoreError> {
        self.rolls.put(roll.id, roll.clone());
        Ok(())
    }

    async fn delete_roll(&mut self, id: RollId) -> Result<(), StoreError> {
        self.rolls.remove(id);
        Ok(())
    }

    async fn insert_sale(&mut self, sale: &Sale) -> Result<(), StoreError> {
        self.sales.put(sale.id, sale.clone());
        Ok(())
    }

    async fn read_sale(&mut self, id: SaleId) -> Result<Option<Sale>, StoreError> {
        let base = self.base()?;
        Ok(self.sales.get(&base.sales, &id))
    }

    async fn delete_sale(&mut self, id: SaleId) -> Result<(), StoreError> {
        self.sales.remove(id);
        Ok(())
    }

    async fn insert_processing(&mut self, record: &ProcessingRecord) -> Result<(), StoreError> {
        self.processing.put(record.id, record.clone());
        Ok(())
    }

    async fn read_processing(&mut self, id: ProcessingRecordId) -> Result<Option<ProcessingRecord>, StoreError> {
        let base = self.base()?;
        Ok(self.processing.get(&base.processing, &id))
    }

    async fn update_processing(&mut self, record: &ProcessingRecord) -> Result<(), StoreError> {
        self.processing.put(record.id, record.clone());
        Ok(())
    }

    async fn insert_customer(&mut self, customer: &Customer) -> Result<(), StoreError> {
        self.customers.put(customer.id, customer.clone());
        Ok(())
    }

    async fn read_customer(&mut self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        let charge = self.pending_charge(id);
        let base = self.base()?;
        self.customers
            .get(&base.customers, &id)
            .map(|mut c| {
                c.debt = c.debt.checked_add(charge).ok_or_else(|| debt_overflow(id, charge))?;
                Ok(c)
            })
            .transpose()
    }

    async fn update_customer(&mut self, customer: &Customer) -> Result<(), StoreError> {
        self.customers.put(customer.id, customer.clone());
        Ok(())
    }

    async fn delete_customer(&mut self, id: CustomerId) -> Result<(), StoreError> {
        self.customers.remove(id);
        Ok(())
    }

    async fn charge_customer(&mut self, id: CustomerId, amount: i64) -> Result<(), StoreError> {
        if let Some(customer) = self.read_customer(id).await? {
            customer.debt.checked_add(amount).ok_or_else(|| debt_overflow(id, amount))?;
        }
        let pending = self
            .pending_charge(id)
            .checked_add(amount)
            .ok_or_else(|| debt_overflow(id, amount))?;
        self.charges.insert(id, pending);
        Ok(())
    }

    async fn append_event(&mut self, envelope: &EventEnvelope<JsonValue>) -> Result<(), StoreError> {
        let duplicate = |e: &EventEnvelope<JsonValue>| {
            e.material_id() == envelope.material_id() && e.sequence_number() == envelope.sequence_number()
        };
        if self.events.iter().any(duplicate) || self.base()?.events.iter().any(duplicate) {
            return Err(StoreError::Conflict(format!(
                "event {} already journaled for material {}",
                envelope.sequence_number(),
                envelope.material_id()
            )));
        }
        self.events.push(envelope.clone());
        Ok(())
    }

    async fn append_log(&mut self, entry: &ActivityLogEntry) -> Result<(), StoreError> {
        self.activity.push(entry.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let tx = *self;
        let mut tables = tx.tables.write().map_err(|_| poisoned())?;

        for (id, expected) in &tx.expectations {
            let actual = tables.materials.get(id).map(|m| m.version());
            if !expected.matches(actual) {
                return Err(StoreError::Conflict(format!(
                    "material {id} changed concurrently (expected {expected:?}, found {actual:?})"
                )));
            }
        }

        // Debts are settled before any table changes.
        let mut debts = Vec::with_capacity(tx.charges.len());
        for (id, amount) in &tx.charges {
            let current = match tables.customers.get(id) {
                Some(existing) => Some(existing.debt),
                None => tx.customers.changes.get(id).cloned().flatten().map(|c| c.debt),
            };
            if let Some(current) = current {
                let debt = current.checked_add(*amount).ok_or_else(|| debt_overflow(*id, *amount))?;
                debts.push((*id, debt));
            }
        }

        // Customer updates replace details only; debt moves through charges.
        let mut customers = tx.customers;
        for (id, change) in customers.changes.iter_mut() {
            if let (Some(updated), Some(existing)) = (change.as_mut(), tables.customers.get(id)) {
                updated.debt = existing.debt;
            }
        }

        tx.materials.apply_to(&mut tables.materials);
        tx.rolls.apply_to(&mut tables.rolls);
        tx.sales.apply_to(&mut tables.sales);
        tx.processing.apply_to(&mut tables.processing);
        customers.apply_to(&mut tables.customers);
        for (id, debt) in debts {
            if let Some(customer) = tables.customers.get_mut(&id) {
                customer.debt = debt;
            }
        }
        tables.events.extend(tx.events);
        tables.activity.extend(tx.activity);
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, StoreError> {
        Ok(Box::new(InMemoryTransaction {
            tables: Arc::clone(&self.tables),
            materials: Staged::default(),
            rolls: Staged::default(),
            sales: Staged::default(),
            processing: Staged::default(),
            customers: Staged::default(),
            charges: HashMap::new(),
            events: Vec::new(),
            activity: Vec::new(),
            expectations: HashMap::new(),
        }))
    }

    async fn material(&self, id: MaterialId) -> Result<Option<Material>, StoreError> {
        Ok(self.read()?.materials.get(&id).cloned())
    }

    async fn materials(&self) -> Result<Vec<Material>, StoreError> {
        let mut materials: Vec<Material> = self.read()?.materials.values().cloned().collect();
        materials.sort_by(|a, b| a.name().cmp(b.name()).then(a.id_typed().cmp(&b.id_typed())));
        Ok(materials)
    }

    async fn roll(&self, id: RollId) -> Result<Option<Roll>, StoreError> {
        Ok(self.read()?.rolls.get(&id).cloned())
    }

    async fn rolls(&self, material_id: MaterialId) -> Result<Vec<Roll>, StoreError> {
        let mut rolls: Vec<Roll> = self
            .read()?
            .rolls
            .values()
            .filter(|r| r.material_id == material_id)
            .cloned()
            .collect();
        rolls.sort_by_key(|r| (r.received_at, r.id));
        Ok(rolls)
    }

    async fn sale(&self, id: SaleId) -> Result<Option<Sale>, StoreError> {
        Ok(self.read()?.sales.get(&id).cloned())
    }

    async fn sales(&self) -> Result<Vec<Sale>, StoreError> {
        let mut sales: Vec<Sale> = self.read()?.sales.values().cloned().collect();
        sales.sort_by(|a, b| b.sold_at.cmp(&a.sold_at).then(b.id.cmp(&a.id)));
        Ok(sales)
    }

    async fn processing_record(&self, id: ProcessingRecordId) -> Result<Option<ProcessingRecord>, StoreError> {
        Ok(self.read()?.processing.get(&id).cloned())
    }

    async fn processing_records(&self) -> Result<Vec<ProcessingRecord>, StoreError> {
        let mut records: Vec<ProcessingRecord> = self.read()?.processing.values().cloned().collect();
        records.sort_by(|a, b| b.sent_at.cmp(&a.sent_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        Ok(self.read()?.customers.get(&id).cloned())
    }

    async fn customers(&self) -> Result<Vec<Customer>, StoreError> {
        let mut customers: Vec<Customer> = self.read()?.customers.values().cloned().collect();
        customers.sort_by(|a, b| a.name().cmp(b.name()).then(a.id.cmp(&b.id)));
        Ok(customers)
    }

    async fn events(&self, material_id: MaterialId) -> Result<Vec<EventEnvelope<JsonValue>>, StoreError> {
        let mut events: Vec<EventEnvelope<JsonValue>> = self
            .read()?
            .events
            .iter()
            .filter(|e| e.material_id() == material_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.sequence_number());
        Ok(events)
    }

    async fn activity(&self, limit: usize) -> Result<Vec<ActivityLogEntry>, StoreError> {
        Ok(self.read()?.activity.iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stockledger_parties::CustomerDetails;

    #[tokio::test]
    async fn overflowing_debt_fails_commit_and_keeps_store_usable() {
        let store = InMemoryLedgerStore::new();
        let customer = Customer::register(
            CustomerId::new(),
            CustomerDetails {
                name: "Moda Evi".to_string(),
                ..CustomerDetails::default()
            },
            Utc::now(),
        )
        .unwrap();
        let mut tx = store.begin().await.unwrap();
        tx.insert_customer(&customer).await.unwrap();
        tx.commit().await.unwrap();

        // Both charges fit the debt each transaction saw.
        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        first.charge_customer(customer.id, i64::MAX).await.unwrap();
        second.charge_customer(customer.id, 1).await.unwrap();
        first.commit().await.unwrap();
        assert!(matches!(second.commit().await, Err(StoreError::OutOfRange(_))));

        let mut tx = store.begin().await.unwrap();
        assert!(matches!(
            tx.charge_customer(customer.id, 1).await,
            Err(StoreError::OutOfRange(_))
        ));
        tx.charge_customer(customer.id, -i64::MAX).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.customer(customer.id).await.unwrap().unwrap().debt, 0);
    }
}
