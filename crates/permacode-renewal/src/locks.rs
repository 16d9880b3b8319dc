//! # Per-Code Locks
//!
//! Serializes renewals of the same code string across concurrent orders.
//!
//! ## The Race Being Closed
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Order A                         Order B                                │
//! │  ───────                         ───────                                │
//! │  lookup SAVE10 → record R1                                              │
//! │                                  lookup SAVE10 → record R1              │
//! │  rename R1 → SAVE10_aaa…                                                │
//! │                                  rename R1 → SAVE10_bbb…   (aaa lost)   │
//! │  upsert SAVE10 → R2                                                     │
//! │                                  upsert SAVE10 → R2 (in place)          │
//! │                                                                         │
//! │  With CodeLocks, B's lookup waits until A has reissued, so B finds R2  │
//! │  and performs its own full cycle.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Locks only coordinate handlers sharing one `CodeLocks` (one process).
//! Across processes, rely on the store's atomic `renew`.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

type LockKey = (String, String);

/// Registry of async mutexes keyed by `(tenant_id, code)`.
///
/// Cloning shares the registry.
#[derive(Debug, Clone, Default)]
pub struct CodeLocks {
    slots: Arc<DashMap<LockKey, Arc<Mutex<()>>>>,
}

impl CodeLocks {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, tenant_id: &str, code: &str) -> Arc<Mutex<()>> {
        self.slots
            .entry((tenant_id.to_string(), code.to_string()))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Acquires the lock for one code.
    pub async fn lock(&self, tenant_id: &str, code: &str) -> OwnedMutexGuard<()> {
        self.slot(tenant_id, code).lock_owned().await
    }

    /// Acquires the locks for several codes.
    ///
    /// Codes are deduplicated and taken in sorted order, so two orders sharing
    /// codes can't deadlock.
    pub async fn lock_all<I, S>(&self, tenant_id: &str, codes: I) -> CodeLockSet
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut codes: Vec<String> = codes.into_iter().map(|c| c.as_ref().to_string()).collect();
        codes.sort();
        codes.dedup();

        let mut guards = Vec::with_capacity(codes.len());
        for code in &codes {
            guards.push(self.lock(tenant_id, code).await);
            trace!(tenant_id = %tenant_id, code = %code, "Code lock acquired");
        }

        CodeLockSet {
            codes,
            guards,
            registry: self.clone(),
        }
    }

    /// Number of registered slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true when no slot is registered.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drops slots nobody holds or waits on.
    pub fn prune(&self) {
        self.slots.retain(|_, slot| Arc::strong_count(slot) > 1);
    }
}

/// Guards for a set of codes.
///
/// Dropping the set releases every guard and prunes idle slots, whichever
/// way the holder returns.
#[derive(Debug)]
pub struct CodeLockSet {
    codes: Vec<String>,
    guards: Vec<OwnedMutexGuard<()>>,
    registry: CodeLocks,
}

impl CodeLockSet {
    /// Codes held, sorted.
    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    /// Number of locks held.
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    /// Returns true when no lock is held.
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}

impl Drop for CodeLockSet {
    fn drop(&mut self) {
        self.guards.clear();
        self.registry.prune();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_code_is_exclusive() {
        let locks = CodeLocks::new();
        let _held = locks.lock("t1", "SAVE10").await;

        let waiting = tokio::time::timeout(Duration::from_millis(50), locks.lock("t1", "SAVE10")).await;
        assert!(waiting.is_err());
    }

    #[tokio::test]
    async fn test_other_codes_and_tenants_are_independent() {
        let locks = CodeLocks::new();
        let _held = locks.lock("t1", "SAVE10").await;

        let other_code = tokio::time::timeout(Duration::from_millis(50), locks.lock("t1", "SAVE20")).await;
        let other_tenant = tokio::time::timeout(Duration::from_millis(50), locks.lock("t2", "SAVE10")).await;
        assert!(other_code.is_ok());
        assert!(other_tenant.is_ok());
    }

    #[tokio::test]
    async fn test_lock_all_sorts_and_dedups() {
        let locks = CodeLocks::new();
        let set = locks.lock_all("t1", ["VIP7", "SAVE10", "VIP7"]).await;

        assert_eq!(set.codes(), &["SAVE10".to_string(), "VIP7".to_string()]);
        assert_eq!(set.len(), 2);
    }

    #[tokio::test]
    async fn test_overlapping_sets_do_not_deadlock() {
        let locks = CodeLocks::new();

        let a = {
            let locks = locks.clone();
            tokio::spawn(async move {
                for _ in 0..50 {
                    let _set = locks.lock_all("t1", ["A", "B"]).await;
                    tokio::task::yield_now().await;
                }
            })
        };
        let b = {
            let locks = locks.clone();
            tokio::spawn(async move {
                for _ in 0..50 {
                    let _set = locks.lock_all("t1", ["B", "A"]).await;
                    tokio::task::yield_now().await;
                }
            })
        };

        let joined = tokio::time::timeout(Duration::from_secs(5), async {
            a.await.unwrap();
            b.await.unwrap();
        })
        .await;
        assert!(joined.is_ok());
    }

    #[tokio::test]
    async fn test_prune_keeps_held_slots() {
        let locks = CodeLocks::new();
        let held = locks.lock("t1", "SAVE10").await;
        drop(locks.lock("t1", "SAVE20").await);

        locks.prune();
        assert_eq!(locks.len(), 1);

        drop(held);
        locks.prune();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_dropping_a_set_prunes() {
        let locks = CodeLocks::new();
        let set = locks.lock_all("t1", ["SAVE10", "VIP7"]).await;
        assert_eq!(locks.len(), 2);

        drop(set);
        assert!(locks.is_empty());
    }
}
