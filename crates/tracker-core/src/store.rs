//! Observable in-memory record collection
//!
//! The store is the single source of truth the UI binds to. It is owned and
//! mutated by the sync engine only; observers get consistent snapshots
//! through [`RecordStore::subscribe`].

use std::sync::Arc;

use tokio::sync::watch;

use crate::models::{Priority, Record, RecordId};

/// Immutable view of the store contents published to observers.
pub type RecordsView = Arc<Vec<Record>>;

/// Ordered record collection keyed by record id.
#[derive(Debug)]
pub struct RecordStore {
    records: RecordsView,
    publisher: watch::Sender<RecordsView>,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore {
    pub fn new() -> Self {
        let records: RecordsView = Arc::new(Vec::new());
        let (publisher, _) = watch::channel(Arc::clone(&records));
        Self { records, publisher }
    }

    /// Observe the store. Every published value is a complete set.
    pub fn subscribe(&self) -> watch::Receiver<RecordsView> {
        self.publisher.subscribe()
    }

    /// Swap the entire set. When the input repeats an id, the last
    /// occurrence wins.
    pub fn replace_all(&mut self, records: Vec<Record>) {
        let mut deduplicated: Vec<Record> = Vec::with_capacity(records.len());
        for record in records {
            if let Some(slot) = deduplicated.iter_mut().find(|r| r.id == record.id) {
                *slot = record;
            } else {
                deduplicated.push(record);
            }
        }
        self.records = Arc::new(deduplicated);
        self.publish();
    }

    /// Insert a record, or overwrite the record with the same id in place.
    pub fn upsert(&mut self, record: Record) {
        let records = Arc::make_mut(&mut self.records);
        if let Some(slot) = records.iter_mut().find(|r| r.id == record.id) {
            *slot = record;
        } else {
            records.push(record);
        }
        self.publish();
    }

    /// Remove a record. Returns whether it was present.
    pub fn remove(&mut self, id: &RecordId) -> bool {
        let Some(index) = self.records.iter().position(|r| &r.id == id) else {
            return false;
        };
        Arc::make_mut(&mut self.records).remove(index);
        self.publish();
        true
    }

    pub fn clear(&mut self) {
        if self.records.is_empty() {
            return;
        }
        self.records = Arc::new(Vec::new());
        self.publish();
    }

    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.records.iter().find(|r| &r.id == id)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Shared handle on the current contents.
    pub fn view(&self) -> RecordsView {
        Arc::clone(&self.records)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records not yet completed, in collection order.
    pub fn pending(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(|r| !r.completed)
    }

    /// Completed records, in collection order.
    pub fn completed(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(|r| r.completed)
    }

    /// First pending record of the highest priority class present.
    ///
    /// Classes are searched urgent, high, medium, low; within a class the
    /// collection order decides.
    pub fn most_urgent(&self) -> Option<&Record> {
        most_urgent(&self.records)
    }

    fn publish(&self) {
        self.publisher.send_replace(Arc::clone(&self.records));
    }
}

/// Most urgent pending record of any record slice, see
/// [`RecordStore::most_urgent`].
pub fn most_urgent(records: &[Record]) -> Option<&Record> {
    Priority::URGENCY_ORDER
        .iter()
        .find_map(|priority| {
            records
                .iter()
                .find(|r| !r.completed && r.priority == *priority)
        })
        .or_else(|| records.iter().find(|r| !r.completed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordDraft;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn record(name: &str, priority: Priority) -> Record {
        RecordDraft::new(name, "Brand", "Category")
            .unwrap()
            .with_priority(priority)
            .into_record(RecordId::new(), Utc::now())
    }

    fn names<'a>(records: impl Iterator<Item = &'a Record>) -> Vec<&'a str> {
        records.map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn upsert_inserts_then_overwrites_in_place() {
        let mut store = RecordStore::new();
        let first = record("first", Priority::Low);
        let second = record("second", Priority::Low);
        store.upsert(first.clone());
        store.upsert(second);

        let mut renamed = first;
        renamed.name = "renamed".to_string();
        store.upsert(renamed);

        assert_eq!(store.len(), 2);
        assert_eq!(names(store.records().iter()), vec!["renamed", "second"]);
    }

    #[test]
    fn remove_missing_is_noop() {
        let mut store = RecordStore::new();
        store.upsert(record("kept", Priority::Low));
        assert!(!store.remove(&RecordId::new()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn replace_all_deduplicates_ids() {
        let mut store = RecordStore::new();
        let original = record("original", Priority::Low);
        let mut duplicate = original.clone();
        duplicate.name = "duplicate".to_string();

        store.replace_all(vec![original, duplicate, record("other", Priority::High)]);
        assert_eq!(names(store.records().iter()), vec!["duplicate", "other"]);
    }

    #[test]
    fn pending_and_completed_views() {
        let mut store = RecordStore::new();
        let mut done = record("done", Priority::Medium);
        done.completed = true;
        store.replace_all(vec![record("todo", Priority::Medium), done]);

        assert_eq!(names(store.pending()), vec!["todo"]);
        assert_eq!(names(store.completed()), vec!["done"]);
    }

    #[test]
    fn most_urgent_prefers_urgent_class() {
        let mut store = RecordStore::new();
        store.replace_all(vec![
            record("low", Priority::Low),
            record("medium", Priority::Medium),
            record("high", Priority::High),
            record("urgent", Priority::Urgent),
        ]);
        assert_eq!(store.most_urgent().unwrap().name, "urgent");
    }

    #[test]
    fn most_urgent_breaks_ties_by_collection_order() {
        let mut store = RecordStore::new();
        let mut done = record("done-urgent", Priority::Urgent);
        done.completed = true;
        store.replace_all(vec![
            done,
            record("first-high", Priority::High),
            record("second-high", Priority::High),
        ]);
        assert_eq!(store.most_urgent().unwrap().name, "first-high");
    }

    #[test]
    fn most_urgent_empty_pending_is_none() {
        let mut store = RecordStore::new();
        assert!(store.most_urgent().is_none());

        let mut done = record("done", Priority::Urgent);
        done.completed = true;
        store.upsert(done);
        assert!(store.most_urgent().is_none());
    }

    #[test]
    fn observers_see_whole_sets() {
        let mut store = RecordStore::new();
        let receiver = store.subscribe();
        store.upsert(record("one", Priority::Low));
        assert_eq!(receiver.borrow().len(), 1);

        store.replace_all(vec![
            record("a", Priority::Low),
            record("b", Priority::Low),
            record("c", Priority::Low),
        ]);
        assert_eq!(receiver.borrow().len(), 3);

        store.clear();
        assert!(receiver.borrow().is_empty());
    }
}
