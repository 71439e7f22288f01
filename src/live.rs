// Live queries over store collections

use crate::error::{Result, StoreError};
use crate::filter::Filter;
use crate::record::Record;
use crate::store::{RawRow, select_rows};
use rusqlite::Connection;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;
use tracing::{debug, warn};

/// Identifier of a registered live query
pub type SubscriptionId = u64;

/// A change notification for a live query
#[derive(Debug, Clone, PartialEq)]
pub enum ResultsChange<T> {
    /// The result set at subscription time. Carries no deltas.
    Initial { list: Vec<T> },
    /// The result set after a committed write, with index deltas
    Updated(UpdatedResults<T>),
}

impl<T> ResultsChange<T> {
    /// The full result set carried by this notification
    pub fn list(&self) -> &[T] {
        match self {
            ResultsChange::Initial { list } => list,
            ResultsChange::Updated(updated) => &updated.list,
        }
    }
}

/// Deltas of one update notification
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatedResults<T> {
    /// Indexes (in `list`) of inserted records
    pub insertions: Vec<usize>,
    /// Indexes (in `list`) of records whose stored data changed
    pub changes: Vec<usize>,
    /// Indexes (in the previous result set) of removed records
    pub deletions: Vec<usize>,
    /// The full result set after the change
    pub list: Vec<T>,
}

#[derive(Debug)]
pub(crate) enum RawChange {
    Initial {
        rows: Vec<String>,
    },
    Updated {
        insertions: Vec<usize>,
        changes: Vec<usize>,
        deletions: Vec<usize>,
        rows: Vec<String>,
    },
}

#[derive(Debug, Default, PartialEq)]
struct Deltas {
    insertions: Vec<usize>,
    changes: Vec<usize>,
    deletions: Vec<usize>,
}

impl Deltas {
    fn is_empty(&self) -> bool {
        self.insertions.is_empty() && self.changes.is_empty() && self.deletions.is_empty()
    }
}

/// Diff two result sets by record id
fn diff(old: &[RawRow], new: &[RawRow]) -> Deltas {
    let previous: HashMap<&str, &str> = old.iter().map(|(id, data)| (id.as_str(), data.as_str())).collect();
    let current: HashSet<&str> = new.iter().map(|(id, _)| id.as_str()).collect();

    let mut deltas = Deltas::default();
    for (index, (id, data)) in new.iter().enumerate() {
        match previous.get(id.as_str()) {
            None => deltas.insertions.push(index),
            Some(old_data) if *old_data != data.as_str() => deltas.changes.push(index),
            Some(_) => {}
        }
    }
    for (index, (id, _)) in old.iter().enumerate() {
        if !current.contains(id.as_str()) {
            deltas.deletions.push(index);
        }
    }
    deltas
}

struct LiveQuery {
    id: SubscriptionId,
    collection: &'static str,
    filters: Vec<Filter>,
    snapshot: Vec<RawRow>,
    sender: Sender<RawChange>,
    active: Arc<AtomicBool>,
}

/// Live queries registered on one store
///
/// Each query first delivers a [`ResultsChange::Initial`] snapshot, then one
/// [`ResultsChange::Updated`] per committed write that changed its result
/// set, queued in commit order. A query that can no longer be evaluated is
/// disconnected.
#[derive(Default)]
pub(crate) struct LiveRegistry {
    queries: Vec<LiveQuery>,
    next_id: SubscriptionId,
}

impl LiveRegistry {
    pub(crate) fn register<T: Record>(&mut self, filters: &[Filter], rows: Vec<RawRow>) -> Subscription<T> {
        self.next_id += 1;
        let id = self.next_id;
        let (sender, receiver) = mpsc::channel();
        let active = Arc::new(AtomicBool::new(true));

        // The receiver is alive, so this cannot fail
        let _ = sender.send(RawChange::Initial {
            rows: rows.iter().map(|(_, data)| data.clone()).collect(),
        });

        self.queries.push(LiveQuery {
            id,
            collection: T::collection_name(),
            filters: filters.to_vec(),
            snapshot: rows,
            sender,
            active: Arc::clone(&active),
        });
        debug!(id, collection = T::collection_name(), "Registered live query");

        Subscription {
            id,
            receiver,
            active,
            _marker: PhantomData,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.queries.len()
    }

    /// Re-evaluate live queries on the touched collections after a commit
    pub(crate) fn refresh(&mut self, conn: &Connection, touched: &BTreeSet<&'static str>) {
        self.queries.retain_mut(|query| {
            if !query.active.load(Ordering::Acquire) {
                debug!(id = query.id, "Dropping cancelled live query");
                return false;
            }
            if !touched.contains(query.collection) {
                return true;
            }

            let rows = match select_rows(conn, query.collection, &query.filters) {
                Ok(rows) => rows,
                Err(e) => {
                    warn!(id = query.id, collection = query.collection, error = %e, "Failed to re-run live query, disconnecting");
                    query.active.store(false, Ordering::Release);
                    return false;
                }
            };

            let deltas = diff(&query.snapshot, &rows);
            if deltas.is_empty() {
                return true;
            }

            let change = RawChange::Updated {
                insertions: deltas.insertions,
                changes: deltas.changes,
                deletions: deltas.deletions,
                rows: rows.iter().map(|(_, data)| data.clone()).collect(),
            };
            query.snapshot = rows;

            if query.sender.send(change).is_err() {
                debug!(id = query.id, "Subscriber gone, dropping live query");
                query.active.store(false, Ordering::Release);
                return false;
            }
            true
        });
    }

    /// Disconnect every subscriber
    pub(crate) fn clear(&mut self) {
        for query in self.queries.drain(..) {
            query.active.store(false, Ordering::Release);
        }
    }
}

/// Handle to a live query
///
/// Dropping the handle cancels the live query.
pub struct Subscription<T> {
    id: SubscriptionId,
    receiver: Receiver<RawChange>,
    active: Arc<AtomicBool>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Record> Subscription<T> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Whether the live query is still registered with an open store
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Next queued notification, without blocking
    pub fn try_next(&self) -> Result<Option<ResultsChange<T>>> {
        match self.receiver.try_recv() {
            Ok(raw) => decode(raw).map(Some),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                self.active.store(false, Ordering::Release);
                Ok(None)
            }
        }
    }

    /// Next notification, waiting at most `timeout`
    pub fn next_timeout(&self, timeout: Duration) -> Result<Option<ResultsChange<T>>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(raw) => decode(raw).map(Some),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                self.active.store(false, Ordering::Release);
                Ok(None)
            }
        }
    }

    /// All queued notifications, in commit order
    pub fn drain(&self) -> Result<Vec<ResultsChange<T>>> {
        let mut changes = Vec::new();
        while let Some(change) = self.try_next()? {
            changes.push(change);
        }
        Ok(changes)
    }

    /// Stop receiving notifications
    pub fn cancel(self) {
        debug!(id = self.id, "Cancelling subscription");
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.active.load(Ordering::Acquire))
            .finish()
    }
}

fn decode_rows<T: Record>(rows: Vec<String>) -> Result<Vec<T>> {
    rows.iter()
        .map(|data| serde_json::from_str(data).map_err(StoreError::from))
        .collect()
}

fn decode<T: Record>(raw: RawChange) -> Result<ResultsChange<T>> {
    match raw {
        RawChange::Initial { rows } => Ok(ResultsChange::Initial {
            list: decode_rows(rows)?,
        }),
        RawChange::Updated {
            insertions,
            changes,
            deletions,
            rows,
        } => Ok(ResultsChange::Updated(UpdatedResults {
            insertions,
            changes,
            deletions,
            list: decode_rows(rows)?,
        })),
    }
}
