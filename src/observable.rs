//! Observable State: the slots consumers watch for "current records",
//! "loading" and "row count".
//!
//! Each slot is a `watch` channel. Only the sync coordinator publishes (the
//! publish methods are crate-private); any number of consumers subscribe.
//! A receiver always sees a whole value, never a partially written one.

use std::sync::Arc;
use tokio::sync::watch;

use crate::state::Record;

struct Slots {
    records: watch::Sender<Vec<Record>>,
    is_loading: watch::Sender<bool>,
    row_count: watch::Sender<i64>,
}

#[derive(Clone)]
pub struct ObservableState {
    slots: Arc<Slots>,
}

impl ObservableState {
    pub fn new() -> Self {
        let (records, _) = watch::channel(Vec::new());
        let (is_loading, _) = watch::channel(false);
        let (row_count, _) = watch::channel(0);
        Self {
            slots: Arc::new(Slots {
                records,
                is_loading,
                row_count,
            }),
        }
    }

    pub fn subscribe_records(&self) -> watch::Receiver<Vec<Record>> {
        self.slots.records.subscribe()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.slots.is_loading.subscribe()
    }

    pub fn subscribe_row_count(&self) -> watch::Receiver<i64> {
        self.slots.row_count.subscribe()
    }

    pub fn records(&self) -> Vec<Record> {
        self.slots.records.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        *self.slots.is_loading.borrow()
    }

    pub fn row_count(&self) -> i64 {
        *self.slots.row_count.borrow()
    }

    // send_replace stores the value even while nobody is subscribed

    pub(crate) fn publish_records(&self, records: Vec<Record>) {
        log::debug!("Publishing {} records", records.len());
        self.slots.records.send_replace(records);
    }

    pub(crate) fn publish_loading(&self, loading: bool) {
        self.slots.is_loading.send_replace(loading);
    }

    pub(crate) fn publish_row_count(&self, count: i64) {
        self.slots.row_count.send_replace(count);
    }
}

impl Default for ObservableState {
    fn default() -> Self {
        Self::new()
    }
}
