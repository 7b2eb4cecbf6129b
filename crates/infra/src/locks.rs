//! Per-material serialization.
//!
//! Stock-changing operations on the same material run one at a time; those on
//! different materials never wait on each other. A material's entry lives only
//! while some operation holds or waits for it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use stockledger_core::MaterialId;

type LockTable = Arc<Mutex<HashMap<MaterialId, Arc<AsyncMutex<()>>>>>;

/// Table of one async mutex per material in use.
#[derive(Debug, Clone, Default)]
pub struct MaterialLocks {
    locks: LockTable,
}

/// Held for the duration of one ledger operation.
#[derive(Debug)]
pub struct MaterialGuard {
    guard: Option<OwnedMutexGuard<()>>,
    material_id: MaterialId,
    locks: LockTable,
}

impl MaterialLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other operation holds `material_id`, then hold it until
    /// the returned guard is dropped.
    pub async fn acquire(&self, material_id: MaterialId) -> MaterialGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(material_id).or_default())
        };
        let guard = lock.lock_owned().await;
        debug!(material_id = %material_id, "material lock acquired");
        MaterialGuard {
            guard: Some(guard),
            material_id,
            locks: Arc::clone(&self.locks),
        }
    }

    /// Number of materials currently held or waited on.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for MaterialGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Waiters clone the entry under this same table lock, so a count of
        // one means nobody else can reach it.
        if locks
            .get(&self.material_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.material_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_material_waits_for_the_holder() {
        let locks = MaterialLocks::new();
        let id = MaterialId::new();

        let first = locks.acquire(id).await;
        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(id).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(first);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn different_materials_do_not_block_each_other() {
        let locks = MaterialLocks::new();
        let _a = locks.acquire(MaterialId::new()).await;
        let _b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(MaterialId::new()))
            .await
            .expect("second material must not wait");
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn entries_are_released_with_the_last_guard() {
        let locks = MaterialLocks::new();
        let id = MaterialId::new();

        let first = locks.acquire(id).await;
        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(id).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(first);
        assert_eq!(locks.len(), 1, "waiter still needs the entry");
        waiter.await.unwrap();
        assert!(locks.is_empty());

        for _ in 0..100 {
            drop(locks.acquire(MaterialId::new()).await);
        }
        assert!(locks.is_empty());
    }
}
