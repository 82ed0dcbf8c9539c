use std::sync::Arc;

use crate::record::Record;

/// The full record set of a session. Filled once, never mutated afterwards.
/// Clones share the same allocation.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Arc<Vec<Record>>,
}

impl RecordStore {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: Arc::new(records),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The first `count` records in source order.
    pub fn prefix(&self, count: usize) -> &[Record] {
        &self.records[..count.min(self.records.len())]
    }

    /// Identity of the underlying allocation, used to tell stores apart.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.records) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_clamped_to_length() {
        let store = RecordStore::new(vec![Record::default(); 3]);
        assert_eq!(store.prefix(2).len(), 2);
        assert_eq!(store.prefix(10).len(), 3);
        assert!(RecordStore::default().prefix(5).is_empty());
    }

    #[test]
    fn clones_share_identity() {
        let store = RecordStore::new(vec![Record::default()]);
        assert_eq!(store.id(), store.clone().id());
        assert_ne!(store.id(), RecordStore::new(vec![Record::default()]).id());
    }
}
