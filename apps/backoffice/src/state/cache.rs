//! # Cash-flow Cache
//!
//! Ledgers computed by `compute_cash_flow`, kept until a write could have
//! changed them.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  compute_cash_flow(ctx, period)                                         │
//! │       │                                                                 │
//! │       ├── hit, revision unchanged ──► cached CashFlowLedger             │
//! │       │                                                                 │
//! │       └── miss ─► revision ─► read store ─► reports::cash_flow ─► insert│
//! │                                                                         │
//! │  ChangeFeed ──► listener task                                           │
//! │                   sales / receivables / payables ──► drop tenant rows   │
//! │                   lagged                         ──► drop everything    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entry is stamped with the tenant's cash-flow revision from the
//! [`ChangeFeed`]. The feed bumps that revision before a write returns, so a
//! lookup right after a sale already misses. The listener task only frees
//! memory.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bizdesk_core::reports::CashFlowLedger;
use bizdesk_core::Period;
use bizdesk_db::{ChangeFeed, Table};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

type Key = (String, Period);

/// Shared handle; clones see the same entries.
#[derive(Debug, Clone)]
pub struct CashFlowCache {
    feed: ChangeFeed,
    ledgers: Arc<Mutex<HashMap<Key, (u64, CashFlowLedger)>>>,
}

/// Listener task handle. Dropping it stops the task.
#[derive(Debug)]
pub struct Invalidator {
    handle: JoinHandle<()>,
}

impl Drop for Invalidator {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl CashFlowCache {
    pub fn new(feed: ChangeFeed) -> Self {
        CashFlowCache {
            feed,
            ledgers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn with_ledgers<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut HashMap<Key, (u64, CashFlowLedger)>) -> R,
    {
        let mut ledgers = self.ledgers.lock().expect("Cash-flow cache mutex poisoned");
        f(&mut ledgers)
    }

    /// Taken before reading the store; pass it back to [`Self::insert`].
    pub fn revision(&self, tenant_id: &str) -> u64 {
        self.feed.revision(tenant_id, &Table::CASH_FLOW)
    }

    /// The cached ledger, if no cash-flow write happened since it was stored.
    pub fn get(&self, tenant_id: &str, period: &Period) -> Option<CashFlowLedger> {
        let current = self.revision(tenant_id);
        let key = (tenant_id.to_string(), *period);
        self.with_ledgers(|ledgers| {
            let fresh = matches!(ledgers.get(&key), Some((stamp, _)) if *stamp == current);
            if fresh {
                ledgers.get(&key).map(|(_, ledger)| ledger.clone())
            } else {
                ledgers.remove(&key);
                None
            }
        })
    }

    /// Stores `ledger` unless a cash-flow write was published since `revision`.
    pub fn insert(&self, revision: u64, tenant_id: &str, period: Period, ledger: CashFlowLedger) -> bool {
        if revision != self.revision(tenant_id) {
            return false;
        }
        self.with_ledgers(|ledgers| {
            ledgers.insert((tenant_id.to_string(), period), (revision, ledger));
        });
        true
    }

    pub fn invalidate_tenant(&self, tenant_id: &str) {
        self.with_ledgers(|ledgers| ledgers.retain(|(tenant, _), _| tenant != tenant_id));
    }

    pub fn clear(&self) {
        self.with_ledgers(|ledgers| ledgers.clear());
    }

    pub fn len(&self) -> usize {
        self.with_ledgers(|ledgers| ledgers.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entry present, stale or not.
    #[cfg(test)]
    pub(crate) fn holds(&self, tenant_id: &str, period: &Period) -> bool {
        self.with_ledgers(|ledgers| ledgers.contains_key(&(tenant_id.to_string(), *period)))
    }

    /// Evicts on every committed change to a cash-flow table.
    ///
    /// Runs until the returned guard is dropped or the feed's sender side
    /// is gone. Must be called from inside a tokio runtime.
    pub fn spawn_invalidator(&self) -> Invalidator {
        let mut rx = self.feed.subscribe();
        let cache = self.clone();

        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) if event.table.affects_cash_flow() => {
                        debug!(tenant_id = %event.tenant_id, table = ?event.table, "Cash-flow cache invalidated");
                        cache.invalidate_tenant(&event.tenant_id);
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Change feed lagged, clearing cash-flow cache");
                        cache.clear();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        Invalidator { handle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizdesk_core::Money;
    use bizdesk_db::{ChangeEvent, ChangeKind};
    use chrono::NaiveDate;

    fn period() -> Period {
        Period::month_of(NaiveDate::from_ymd_opt(2026, 10, 16).unwrap())
    }

    fn ledger() -> CashFlowLedger {
        CashFlowLedger {
            period: period(),
            movements: Vec::new(),
            total_inflow: Money::zero(),
            total_outflow: Money::zero(),
            balance: Money::zero(),
        }
    }

    async fn settle(cache: &CashFlowCache, expected_len: usize) {
        for _ in 0..100 {
            if cache.len() == expected_len {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("cache never reached {expected_len} entries");
    }

    #[test]
    fn test_stale_insert_is_dropped() {
        let feed = ChangeFeed::new();
        let cache = CashFlowCache::new(feed.clone());
        let revision = cache.revision("t1");
        feed.publish(ChangeEvent::new("t1", Table::Sales, ChangeKind::Insert, "s1"));

        assert!(!cache.insert(revision, "t1", period(), ledger()));
        assert!(cache.is_empty());
        assert!(cache.insert(cache.revision("t1"), "t1", period(), ledger()));
        assert!(cache.get("t1", &period()).is_some());
        assert!(cache.get("t2", &period()).is_none());
    }

    #[test]
    fn test_write_misses_without_listener() {
        let feed = ChangeFeed::new();
        let cache = CashFlowCache::new(feed.clone());
        cache.insert(cache.revision("t1"), "t1", period(), ledger());
        cache.insert(cache.revision("t2"), "t2", period(), ledger());

        feed.publish(ChangeEvent::new("t1", Table::Receivables, ChangeKind::Update, "r1"));
        feed.publish(ChangeEvent::new("t2", Table::Customers, ChangeKind::Update, "c1"));

        assert!(cache.get("t1", &period()).is_none());
        assert!(!cache.holds("t1", &period()));
        assert!(cache.get("t2", &period()).is_some());
    }

    #[test]
    fn test_invalidate_only_that_tenant() {
        let cache = CashFlowCache::new(ChangeFeed::new());
        cache.insert(cache.revision("t1"), "t1", period(), ledger());
        cache.insert(cache.revision("t2"), "t2", period(), ledger());

        cache.invalidate_tenant("t1");
        assert!(cache.get("t1", &period()).is_none());
        assert!(cache.get("t2", &period()).is_some());
    }

    #[tokio::test]
    async fn test_listener_ignores_catalog_changes() {
        let feed = ChangeFeed::new();
        let cache = CashFlowCache::new(feed.clone());
        let _invalidator = cache.spawn_invalidator();
        cache.insert(cache.revision("t1"), "t1", period(), ledger());
        cache.insert(cache.revision("t2"), "t2", period(), ledger());

        feed.publish(ChangeEvent::new("t1", Table::Products, ChangeKind::Update, "p1"));
        feed.publish(ChangeEvent::new("t2", Table::Payables, ChangeKind::Insert, "b1"));

        // Events arrive in order, so the product update was already seen.
        settle(&cache, 1).await;
        assert!(cache.get("t1", &period()).is_some());
    }

    #[tokio::test]
    async fn test_dropping_invalidator_stops_listener() {
        let feed = ChangeFeed::new();
        let cache = CashFlowCache::new(feed.clone());
        let invalidator = cache.spawn_invalidator();
        assert_eq!(feed.subscriber_count(), 1);

        drop(invalidator);
        for _ in 0..100 {
            if feed.subscriber_count() == 0 {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("listener still subscribed after its guard was dropped");
    }
}
