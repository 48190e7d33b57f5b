//! # Change Feed
//!
//! In-process notification of committed writes, per table.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Repository / SaleWorkflow                                              │
//! │        │ write committed                                                │
//! │        ▼                                                                │
//! │  ChangeFeed::publish(ChangeEvent) ──► broadcast::Sender (cap 256)       │
//! │                                            │                            │
//! │                     ┌──────────────────────┼─────────────────────┐      │
//! │                     ▼                      ▼                     ▼      │
//! │              cash-flow cache        other subscribers       (none: ok)  │
//! │              "recompute on notify"                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Events are only sent after commit, so a subscriber never sees a write
//! that was rolled back. Publishing with no subscribers is not an error.
//!
//! Alongside the channel the feed keeps a revision counter per
//! (tenant, table), bumped synchronously inside `publish`. Once a write
//! call has returned, its revision bump is visible to every reader, even
//! if no subscriber task has run yet.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Customers,
    Suppliers,
    Products,
    Sales,
    SaleItems,
    Receivables,
    Payables,
}

impl Table {
    /// Tables whose rows feed the cash-flow ledger.
    pub const CASH_FLOW: [Table; 3] = [Table::Sales, Table::Receivables, Table::Payables];

    pub const fn affects_cash_flow(&self) -> bool {
        matches!(self, Table::Sales | Table::Receivables | Table::Payables)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub tenant_id: String,
    pub table: Table,
    pub kind: ChangeKind,
    pub row_id: String,
}

impl ChangeEvent {
    pub fn new(tenant_id: &str, table: Table, kind: ChangeKind, row_id: &str) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            table,
            kind,
            row_id: row_id.to_string(),
        }
    }
}

/// Cloneable publisher handle; every clone feeds the same channel and
/// shares the same revision counters.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
    revisions: Arc<Mutex<HashMap<(String, Table), u64>>>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            revisions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Number of changes published so far for `tenant_id` across `tables`.
    ///
    /// Only ever grows. Two equal readings mean no write to those tables
    /// was published in between.
    pub fn revision(&self, tenant_id: &str, tables: &[Table]) -> u64 {
        let revisions = self.revisions.lock().expect("Change feed revision mutex poisoned");
        tables
            .iter()
            .filter_map(|table| revisions.get(&(tenant_id.to_string(), *table)))
            .sum()
    }

    pub fn publish(&self, event: ChangeEvent) {
        trace!(table = ?event.table, kind = ?event.kind, row_id = %event.row_id, "Publishing change");
        {
            let mut revisions = self.revisions.lock().expect("Change feed revision mutex poisoned");
            *revisions.entry((event.tenant_id.clone(), event.table)).or_insert(0) += 1;
        }
        // Err only means nobody is listening.
        let _ = self.tx.send(event);
    }

    pub fn publish_all(&self, events: impl IntoIterator<Item = ChangeEvent>) {
        for event in events {
            self.publish(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let feed = ChangeFeed::new();
        let mut rx = feed.subscribe();

        feed.publish_all([
            ChangeEvent::new("t", Table::Sales, ChangeKind::Insert, "s1"),
            ChangeEvent::new("t", Table::Products, ChangeKind::Update, "p1"),
        ]);

        assert_eq!(rx.recv().await.unwrap().row_id, "s1");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.table, Table::Products);
        assert!(!second.table.affects_cash_flow());
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let feed = ChangeFeed::new();
        feed.publish(ChangeEvent::new("t", Table::Payables, ChangeKind::Delete, "p"));
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn test_revision_moves_on_publish() {
        let feed = ChangeFeed::new();
        let other = feed.clone();
        assert_eq!(feed.revision("t1", &Table::CASH_FLOW), 0);

        other.publish(ChangeEvent::new("t1", Table::Sales, ChangeKind::Insert, "s1"));
        other.publish(ChangeEvent::new("t1", Table::Products, ChangeKind::Update, "p1"));
        other.publish(ChangeEvent::new("t2", Table::Payables, ChangeKind::Insert, "b1"));

        // Visible through every clone without a subscriber running.
        assert_eq!(feed.revision("t1", &Table::CASH_FLOW), 1);
        assert_eq!(feed.revision("t1", &[Table::Products]), 1);
        assert_eq!(feed.revision("t2", &Table::CASH_FLOW), 1);
        assert_eq!(feed.revision("t3", &Table::CASH_FLOW), 0);
    }
}
