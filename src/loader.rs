use tracing::{debug, error, info, trace};

use crate::domain::PAGE_SIZE;
use crate::record::Record;
use crate::source::DataSource;
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadState {
    pub loaded_count: usize,
    pub page_size: usize,
    pub exhausted: bool,
}

impl LoadState {
    pub fn new(page_size: usize) -> Self {
        Self {
            loaded_count: 0,
            page_size: page_size.max(1),
            exhausted: false,
        }
    }
}

impl Default for LoadState {
    fn default() -> Self {
        Self::new(PAGE_SIZE)
    }
}

/// Reveals the record store page by page.
///
/// The revealed window is always `store[..loaded_count]` in source order.
/// `loaded_count` never decreases and `exhausted` never reverts. The store is
/// fetched from the source on the first advance and kept for the session.
pub struct WindowLoader {
    source: Box<dyn DataSource>,
    store: Option<RecordStore>,
    state: LoadState,
    pending: bool,
    last_error: Option<String>,
}

impl WindowLoader {
    pub fn new(source: Box<dyn DataSource>, page_size: usize) -> Self {
        Self {
            source,
            store: None,
            state: LoadState::new(page_size),
            pending: false,
            last_error: None,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_exhausted(&self) -> bool {
        self.state.exhausted
    }

    pub fn source_name(&self) -> String {
        self.source.name()
    }

    /// Reason the source could not be read, if it failed.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Size of the full store, once it has been fetched.
    pub fn total(&self) -> Option<usize> {
        self.store.as_ref().map(|s| s.len())
    }

    pub fn store(&self) -> Option<&RecordStore> {
        self.store.as_ref()
    }

    pub fn window(&self) -> &[Record] {
        match &self.store {
            Some(store) => store.prefix(self.state.loaded_count),
            None => &[],
        }
    }

    /// Marks a page load as pending. Returns `false` if one is already
    /// pending or nothing is left to load, so repeated triggers collapse
    /// into a single page.
    pub fn request(&mut self) -> bool {
        if self.pending || self.state.exhausted {
            trace!(
                "Load request ignored (pending: {}, exhausted: {})",
                self.pending, self.state.exhausted
            );
            return false;
        }
        self.pending = true;
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Performs the pending load, if any. Returns whether the window changed.
    pub fn settle(&mut self) -> bool {
        if !self.pending {
            return false;
        }
        let before = self.state.loaded_count;
        self.advance();
        self.pending = false;
        self.state.loaded_count != before
    }

    /// Reveals the next page and returns the new `loaded_count`.
    pub fn advance(&mut self) -> usize {
        if self.state.exhausted {
            debug!("Advance on exhausted window ({})", self.state.loaded_count);
            return self.state.loaded_count;
        }

        let Some(available) = self.ensure_store() else {
            self.state.exhausted = true;
            return self.state.loaded_count;
        };

        let remaining = available.saturating_sub(self.state.loaded_count);
        let revealed = remaining.min(self.state.page_size);
        self.state.loaded_count += revealed;
        if revealed < self.state.page_size {
            self.state.exhausted = true;
            info!(
                "Window exhausted at {} of {} records",
                self.state.loaded_count, available
            );
        } else {
            debug!(
                "Window advanced to {} of {} records",
                self.state.loaded_count, available
            );
        }
        self.state.loaded_count
    }

    // Failures are absorbed here: the loader reports them as an empty page.
    fn ensure_store(&mut self) -> Option<usize> {
        if let Some(store) = &self.store {
            return Some(store.len());
        }
        match self.source.fetch() {
            Ok(records) => {
                let store = RecordStore::new(records);
                let len = store.len();
                self.store = Some(store);
                Some(len)
            }
            Err(e) => {
                error!("Could not read {}: {}", self.source.name(), e);
                self.last_error = Some(e.to_string());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FileSource;
    use crate::source::tests::VecSource;

    fn named(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| Record {
                rank: Some(i as u32 + 1),
                name: format!("College {}", i + 1),
                ..Default::default()
            })
            .collect()
    }

    fn loader(n: usize) -> WindowLoader {
        WindowLoader::new(Box::new(VecSource::new(named(n))), PAGE_SIZE)
    }

    #[test]
    fn starts_empty() {
        let loader = loader(5);
        assert_eq!(loader.state(), LoadState::new(10));
        assert!(loader.window().is_empty());
        assert_eq!(loader.total(), None);
    }

    #[test]
    fn twenty_five_records_exhaust_after_three_pages() {
        let mut loader = loader(25);
        assert_eq!(loader.advance(), 10);
        assert_eq!(loader.advance(), 20);
        assert!(!loader.is_exhausted());
        assert_eq!(loader.advance(), 25);
        assert!(loader.is_exhausted());

        let before = loader.state();
        assert_eq!(loader.advance(), 25);
        assert_eq!(loader.state(), before);
    }

    #[test]
    fn exact_multiple_exhausts_on_empty_page() {
        let mut loader = loader(20);
        loader.advance();
        loader.advance();
        assert!(!loader.is_exhausted());
        assert_eq!(loader.advance(), 20);
        assert!(loader.is_exhausted());
    }

    #[test]
    fn window_is_source_prefix_and_monotonic() {
        let mut loader = loader(37);
        let mut last = 0;
        let mut was_exhausted = false;
        for _ in 0..8 {
            let count = loader.advance();
            assert!(count >= last);
            assert!(!was_exhausted || loader.is_exhausted());
            last = count;
            was_exhausted = loader.is_exhausted();

            let ranks: Vec<u32> = loader.window().iter().filter_map(|r| r.rank).collect();
            let expected: Vec<u32> = (1..=count as u32).collect();
            assert_eq!(ranks, expected);
        }
        assert_eq!(last, 37);
    }

    #[test]
    fn unavailable_source_is_exhausted_with_error() {
        let mut loader = WindowLoader::new(Box::new(VecSource::failing()), PAGE_SIZE);
        assert_eq!(loader.advance(), 0);
        assert!(loader.is_exhausted());
        assert!(loader.last_error().unwrap().contains("source offline"));
        assert!(loader.window().is_empty());
    }

    #[test]
    fn duplicate_requests_load_one_page() {
        let mut loader = loader(25);
        assert!(loader.request());
        assert!(!loader.request());
        assert!(!loader.request());
        assert!(loader.settle());
        assert_eq!(loader.state().loaded_count, 10);
        assert!(!loader.settle());
        assert_eq!(loader.state().loaded_count, 10);
    }

    #[test]
    fn no_requests_once_exhausted() {
        let mut loader = loader(3);
        loader.advance();
        assert!(loader.is_exhausted());
        assert!(!loader.request());
        assert!(!loader.is_pending());
    }

    #[test]
    fn store_is_fetched_once() {
        let mut loader = loader(25);
        loader.advance();
        let id = loader.store().unwrap().id();
        loader.advance();
        loader.advance();
        assert_eq!(loader.store().unwrap().id(), id);
    }

    #[test]
    fn pages_through_json_document() {
        let path = format!("{}/tests/fixtures/colleges.json", env!("CARGO_MANIFEST_DIR"));
        let source = FileSource::new(&path).unwrap();
        let mut loader = WindowLoader::new(Box::new(source), PAGE_SIZE);
        let counts: Vec<usize> = (0..4).map(|_| loader.advance()).collect();
        assert_eq!(counts, vec![10, 20, 25, 25]);
        assert!(loader.is_exhausted());
        assert_eq!(loader.source_name(), "colleges.json");
        assert!(loader.last_error().is_none());
    }
}
