use std::sync::{Arc, Mutex};

use anyhow::Context;

use stockledger_events::InMemoryEventBus;
use stockledger_infra::config::StoreConfig;
use stockledger_infra::projections::LowStockProjection;
use stockledger_infra::store::LedgerStore;
use stockledger_infra::workers::{ProjectionWorker, WorkerHandle};
use stockledger_infra::{LedgerEnvelope, StockLedger};

pub type LedgerBus = Arc<InMemoryEventBus<LedgerEnvelope>>;

/// Everything a request handler needs: the ledger itself and the low-stock
/// read model its published events keep current.
pub struct AppServices {
    ledger: StockLedger<LedgerBus>,
    low_stock: Arc<LowStockProjection>,
    worker: Mutex<Option<WorkerHandle>>,
}

impl AppServices {
    pub fn ledger(&self) -> &StockLedger<LedgerBus> {
        &self.ledger
    }

    pub fn low_stock(&self) -> &LowStockProjection {
        &self.low_stock
    }

    /// Stop the projection worker. Safe to call more than once.
    pub fn shutdown(&self) {
        let handle = match self.worker.lock() {
            Ok(mut worker) => worker.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            handle.shutdown();
        }
    }
}

/// Open the configured store and wire the ledger around it.
pub async fn build_services(config: &StoreConfig) -> anyhow::Result<AppServices> {
    let store = config.open().await.context("failed to open ledger store")?;
    services_for_store(store).await
}

/// Wire ledger, bus and low-stock projection around an already open store.
///
/// Runs before any request is served, so nothing commits while the seed is
/// read. Envelopes the seed already covers are skipped by the projection's
/// sequence cursor.
pub async fn services_for_store(store: Arc<dyn LedgerStore>) -> anyhow::Result<AppServices> {
    let bus: LedgerBus = Arc::new(InMemoryEventBus::new());
    let low_stock = Arc::new(LowStockProjection::new());

    let projection = Arc::clone(&low_stock);
    let worker = ProjectionWorker::spawn("low-stock-projection", &bus, move |env: LedgerEnvelope| {
        projection.apply_envelope(&env)
    })
    .context("failed to spawn low-stock projection worker")?;

    let materials = store
        .materials()
        .await
        .context("failed to load materials for the low-stock report")?;
    low_stock.seed(materials);

    Ok(AppServices {
        ledger: StockLedger::new(store, bus),
        low_stock,
        worker: Mutex::new(Some(worker)),
    })
}
