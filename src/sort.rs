use std::cmp::Ordering;
use std::fmt;

use tracing::trace;

use crate::record::{FieldValue, Record, SortField};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Ascending,
    Descending,
}

/// The user's chosen sort. A field always comes with a direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirective {
    #[default]
    Unsorted,
    By { field: SortField, direction: Direction },
}

impl SortDirective {
    pub fn by(field: SortField, direction: Direction) -> Self {
        SortDirective::By { field, direction }
    }
}

impl fmt::Display for SortDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirective::Unsorted => f.write_str("unsorted"),
            SortDirective::By { field, direction } => {
                let arrow = match direction {
                    Direction::Ascending => "↑",
                    Direction::Descending => "↓",
                };
                write!(f, "{} {}", field.title(), arrow)
            }
        }
    }
}

/// Number hidden in a decorated string: everything except digits, `.` and
/// `-` is dropped and the rest must parse as a finite float.
pub fn numeric_like(s: &str) -> Option<f64> {
    let stripped: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    stripped.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Comparison view of a field value. Lives only for the duration of a sort.
#[derive(Debug, Clone, PartialEq)]
enum SortKey<'a> {
    Missing,
    Number { value: f64, native: bool },
    Text(&'a str),
}

impl<'a> SortKey<'a> {
    fn of(value: Option<&'a FieldValue>) -> Self {
        match value {
            None => SortKey::Missing,
            Some(FieldValue::Number(n)) if n.is_nan() => SortKey::Missing,
            Some(FieldValue::Number(n)) => SortKey::Number {
                value: *n,
                native: true,
            },
            Some(FieldValue::Text(s)) => match numeric_like(s) {
                Some(value) => SortKey::Number {
                    value,
                    native: false,
                },
                None => SortKey::Text(s),
            },
        }
    }

    fn class(&self) -> u8 {
        match self {
            SortKey::Missing => 0,
            SortKey::Number { .. } => 1,
            SortKey::Text(_) => 2,
        }
    }

    // Ascending order: missing < numbers < text.
    fn value_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Number { value: a, .. }, SortKey::Number { value: b, .. }) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            _ => self.class().cmp(&other.class()),
        }
    }

    // At equal numeric value a native number goes before a decorated string.
    fn tie_break(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Number { native: a, .. }, SortKey::Number { native: b, .. }) => b.cmp(a),
            _ => Ordering::Equal,
        }
    }
}

fn compare(a: &SortKey, b: &SortKey, direction: Direction) -> Ordering {
    let primary = match direction {
        Direction::Ascending => a.value_cmp(b),
        Direction::Descending => a.value_cmp(b).reverse(),
    };
    primary.then_with(|| a.tie_break(b))
}

/// Orders `records` by `directive` and returns the permutation as indices
/// into `records`.
///
/// Missing values sort lowest, numbers (native or coerced from decorated
/// text) next and unparseable text last; descending reverses that. When a
/// native number and a decorated string are worth the same, the native number
/// comes first in both directions, so `500` precedes `"$500"`. All other ties
/// keep their input order.
pub fn sort(records: &[Record], directive: &SortDirective) -> Vec<usize> {
    let mut rows: Vec<usize> = (0..records.len()).collect();
    let SortDirective::By { field, direction } = *directive else {
        return rows;
    };

    let values: Vec<Option<FieldValue>> = records.iter().map(|r| r.value(field)).collect();
    let keys: Vec<SortKey> = values.iter().map(|v| SortKey::of(v.as_ref())).collect();

    rows.sort_by(|&a, &b| compare(&keys[a], &keys[b], direction));
    trace!("Sorted {} rows by {}", rows.len(), directive);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_fees(fees: Vec<Option<FieldValue>>) -> Vec<Record> {
        fees.into_iter()
            .enumerate()
            .map(|(i, fees)| Record {
                rank: Some(i as u32 + 1),
                name: format!("College {}", i + 1),
                fees,
                ..Default::default()
            })
            .collect()
    }

    fn text(s: &str) -> Option<FieldValue> {
        Some(FieldValue::Text(s.to_string()))
    }

    fn num(n: f64) -> Option<FieldValue> {
        Some(FieldValue::Number(n))
    }

    fn fees_in_order(records: &[Record], rows: &[usize]) -> Vec<Option<FieldValue>> {
        rows.iter().map(|&i| records[i].fees.clone()).collect()
    }

    #[test]
    fn numeric_like_strips_decoration() {
        assert_eq!(numeric_like("₹1,20,000"), Some(120000.0));
        assert_eq!(numeric_like("$1,000.50"), Some(1000.5));
        assert_eq!(numeric_like("-3 pts"), Some(-3.0));
        assert_eq!(numeric_like("N/A"), None);
        assert_eq!(numeric_like("12-14 LPA"), None);
        assert_eq!(numeric_like(""), None);
    }

    #[test]
    fn unsorted_is_identity() {
        let records = with_fees(vec![num(3.0), num(1.0), num(2.0)]);
        assert_eq!(sort(&records, &SortDirective::Unsorted), vec![0, 1, 2]);
    }

    #[test]
    fn mixed_fees_sort_by_value() {
        let records = with_fees(vec![text("$1,000"), text("$500"), num(500.0)]);
        let rows = sort(&records, &SortDirective::by(SortField::Fees, Direction::Ascending));
        assert_eq!(
            fees_in_order(&records, &rows),
            vec![num(500.0), text("$500"), text("$1,000")]
        );
    }

    #[test]
    fn descending_reverses_values() {
        let records = with_fees(vec![text("₹90,000"), num(120000.0), text("₹1,50,000")]);
        let rows = sort(&records, &SortDirective::by(SortField::Fees, Direction::Descending));
        assert_eq!(rows, vec![2, 1, 0]);
    }

    #[test]
    fn unparseable_text_sorts_lexically_after_numbers() {
        let records = with_fees(vec![text("on request"), num(10.0), text("free"), text("$5")]);
        let rows = sort(&records, &SortDirective::by(SortField::Fees, Direction::Ascending));
        assert_eq!(
            fees_in_order(&records, &rows),
            vec![text("$5"), num(10.0), text("free"), text("on request")]
        );
    }

    #[test]
    fn missing_values_are_lowest() {
        let records = with_fees(vec![num(2.0), None, num(1.0), None]);
        let asc = sort(&records, &SortDirective::by(SortField::Fees, Direction::Ascending));
        assert_eq!(asc, vec![1, 3, 2, 0]);
        let desc = sort(&records, &SortDirective::by(SortField::Fees, Direction::Descending));
        assert_eq!(desc, vec![0, 2, 1, 3]);
    }

    #[test]
    fn equal_values_keep_input_order() {
        let records = with_fees(vec![num(7.0), num(3.0), num(7.0), num(3.0), num(7.0)]);
        let desc = sort(&records, &SortDirective::by(SortField::Fees, Direction::Descending));
        assert_eq!(desc, vec![0, 2, 4, 1, 3]);
        let again = sort(&records, &SortDirective::by(SortField::Fees, Direction::Descending));
        assert_eq!(desc, again);
    }

    #[test]
    fn sorting_does_not_touch_records() {
        let records = with_fees(vec![text("₹1,20,000"), text("₹20,000")]);
        let copy = records.clone();
        sort(&records, &SortDirective::by(SortField::Fees, Direction::Ascending));
        assert_eq!(records, copy);
    }

    #[test]
    fn directive_renders_field_and_arrow() {
        let directive = SortDirective::by(SortField::Fees, Direction::Descending);
        assert_eq!(directive.to_string(), "Course Fees ↓");
        assert_eq!(SortDirective::default().to_string(), "unsorted");
    }
}
