use std::sync::Arc;
use std::time::Instant;

use tracing::trace;

use crate::filter::filter;
use crate::record::Record;
use crate::sort::{SortDirective, sort};
use crate::store::RecordStore;

/// The rows the presentation shows: `filter(sort(window, directive), query)`.
/// Returned values are indices into `window`.
pub fn compose(window: &[Record], directive: &SortDirective, query: &str) -> Vec<usize> {
    let sorted = sort(window, directive);
    filter(window, &sorted, query)
}

#[derive(Debug, Clone, PartialEq)]
struct ComposeKey {
    store: usize,
    window_len: usize,
    directive: SortDirective,
    query: String,
}

/// Memoizes [`compose`] on its inputs.
///
/// A window is always a prefix of an immutable store, so the store identity
/// and the window length identify it.
#[derive(Debug, Default)]
pub struct ViewComposer {
    key: Option<ComposeKey>,
    rows: Arc<Vec<usize>>,
    recomputations: usize,
}

impl ViewComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Arc<Vec<usize>> {
        Arc::clone(&self.rows)
    }

    /// How often the view had to be rebuilt.
    pub fn recomputations(&self) -> usize {
        self.recomputations
    }

    pub fn compose(
        &mut self,
        store: Option<&RecordStore>,
        window: &[Record],
        directive: &SortDirective,
        query: &str,
    ) -> Arc<Vec<usize>> {
        let key = ComposeKey {
            store: store.map(|s| s.id()).unwrap_or(0),
            window_len: window.len(),
            directive: *directive,
            query: query.to_string(),
        };
        if self.key.as_ref() == Some(&key) {
            trace!("View unchanged ({} rows)", self.rows.len());
            return self.rows();
        }

        let start_time = Instant::now();
        self.rows = Arc::new(compose(window, directive, query));
        self.key = Some(key);
        self.recomputations += 1;
        trace!(
            "Composed {} of {} rows ({}, query \"{}\") in {}µs",
            self.rows.len(),
            window.len(),
            directive,
            query,
            start_time.elapsed().as_micros()
        );
        self.rows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldValue, SortField};
    use crate::sort::Direction;

    fn alphabet(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| Record {
                rank: Some(i as u32 + 1),
                name: ((b'A' + i as u8) as char).to_string(),
                fees: Some(FieldValue::Number(100.0 * (i as f64 + 1.0))),
                ..Default::default()
            })
            .collect()
    }

    fn names(window: &[Record], rows: &[usize]) -> Vec<String> {
        rows.iter().map(|&i| window[i].name.clone()).collect()
    }

    #[test]
    fn descending_fees_then_query_on_first_page() {
        let store = RecordStore::new(alphabet(12));
        let window = store.prefix(10);
        let directive = SortDirective::by(SortField::Fees, Direction::Descending);

        let rows = compose(window, &directive, "");
        assert_eq!(window[rows[0]].fees, Some(FieldValue::Number(1000.0)));
        assert_eq!(window[rows[0]].name, "J");

        let rows = compose(window, &directive, "a");
        assert_eq!(names(window, &rows), vec!["A"]);
    }

    #[test]
    fn sort_runs_before_filter() {
        let window = vec![
            Record {
                name: "Beta Tech".into(),
                fees: Some(FieldValue::Text("$900".into())),
                ..Default::default()
            },
            Record {
                name: "Alpha Arts".into(),
                fees: Some(FieldValue::Text("$100".into())),
                ..Default::default()
            },
            Record {
                name: "Gamma Tech".into(),
                fees: Some(FieldValue::Text("$300".into())),
                ..Default::default()
            },
        ];
        let directive = SortDirective::by(SortField::Fees, Direction::Ascending);
        let rows = compose(&window, &directive, "TECH");
        assert_eq!(names(&window, &rows), vec!["Gamma Tech", "Beta Tech"]);
    }

    #[test]
    fn unsorted_empty_query_is_the_window() {
        let window = alphabet(5);
        assert_eq!(compose(&window, &SortDirective::Unsorted, ""), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn recomputes_only_when_inputs_change() {
        let store = RecordStore::new(alphabet(12));
        let mut composer = ViewComposer::new();
        let directive = SortDirective::by(SortField::Name, Direction::Descending);

        composer.compose(Some(&store), store.prefix(10), &directive, "");
        composer.compose(Some(&store), store.prefix(10), &directive, "");
        assert_eq!(composer.recomputations(), 1);

        composer.compose(Some(&store), store.prefix(10), &directive, "b");
        assert_eq!(composer.recomputations(), 2);

        let rows = composer.compose(Some(&store), store.prefix(12), &directive, "b");
        assert_eq!(composer.recomputations(), 3);
        assert_eq!(*rows, vec![1]);

        composer.compose(Some(&store), store.prefix(12), &SortDirective::Unsorted, "b");
        assert_eq!(composer.recomputations(), 4);
    }

    #[test]
    fn window_stays_in_load_order_under_sort_and_filter() {
        let store = RecordStore::new(alphabet(12));
        let mut composer = ViewComposer::new();
        let directive = SortDirective::by(SortField::Fees, Direction::Descending);
        composer.compose(Some(&store), store.prefix(10), &directive, "c");

        let ranks: Vec<u32> = store.prefix(10).iter().filter_map(|r| r.rank).collect();
        assert_eq!(ranks, (1..=10).collect::<Vec<u32>>());
    }
}
