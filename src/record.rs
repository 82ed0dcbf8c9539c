use std::fmt;

use serde::{Deserialize, Deserializer};

/// A single cell value of a sortable field.
///
/// Documents mix native numbers and decorated strings (`"₹1,20,000"`) in the
/// same field, so both are kept exactly as they were read.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Record {
    #[serde(default, alias = "college_rank", deserialize_with = "rank_or_missing")]
    pub rank: Option<u32>,
    #[serde(default, alias = "college_name", deserialize_with = "text_or_empty")]
    pub name: String,
    #[serde(default, alias = "college_location", deserialize_with = "text_or_empty")]
    pub location: String,
    #[serde(default, alias = "college_course", deserialize_with = "text_or_empty")]
    pub course: String,
    #[serde(default, alias = "college_fees")]
    pub fees: Option<FieldValue>,
    #[serde(default, alias = "college_placement")]
    pub placement: Option<FieldValue>,
    #[serde(default, alias = "college_review_rating")]
    pub review_rating: Option<FieldValue>,
    #[serde(default, alias = "college_rating")]
    pub rating: Option<FieldValue>,
}

/// Reads a rank given as a number (`3`, `3.0`) or as text (`"3"`, `"#3"`).
pub fn parse_rank(value: FieldValue) -> Option<u32> {
    match value {
        FieldValue::Number(n) if n.is_finite() && n >= 0.0 && n <= u32::MAX as f64 => Some(n as u32),
        FieldValue::Number(_) => None,
        FieldValue::Text(s) => s.trim().trim_start_matches('#').trim().parse().ok(),
    }
}

fn rank_or_missing<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<FieldValue>::deserialize(deserializer)?.and_then(parse_rank))
}

// `null` reads as the empty string, which `Record::value` treats as missing.
fn text_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<FieldValue>::deserialize(deserializer)?;
    Ok(value.map(|v| v.to_string()).unwrap_or_default())
}

impl Record {
    /// Value of `field`, or `None` when the record does not carry it.
    /// Empty strings for the text columns count as missing.
    pub fn value(&self, field: SortField) -> Option<FieldValue> {
        let text = |s: &str| (!s.is_empty()).then(|| FieldValue::Text(s.to_string()));
        match field {
            SortField::Rank => self.rank.map(|r| FieldValue::Number(r as f64)),
            SortField::Name => text(&self.name),
            SortField::Location => text(&self.location),
            SortField::Course => text(&self.course),
            SortField::Fees => self.fees.clone(),
            SortField::Placement => self.placement.clone(),
            SortField::UserReviews => self.review_rating.clone(),
            SortField::Rating => self.rating.clone(),
        }
    }

    /// Cell text as shown in tables and copied to the clipboard.
    pub fn cell(&self, field: SortField) -> String {
        match (field, self.value(field)) {
            (SortField::Rank, Some(v)) => format!("#{v}"),
            (SortField::UserReviews | SortField::Rating, Some(v)) => format!("{v} / 10"),
            (_, Some(v)) => v.to_string(),
            (_, None) => String::from("∅"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
    Rank,
    Name,
    Location,
    Course,
    Fees,
    Placement,
    UserReviews,
    Rating,
}

impl SortField {
    pub const ALL: [SortField; 8] = [
        SortField::Rank,
        SortField::Name,
        SortField::Location,
        SortField::Course,
        SortField::Fees,
        SortField::Placement,
        SortField::UserReviews,
        SortField::Rating,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            SortField::Rank => "CD Rank",
            SortField::Name => "Colleges",
            SortField::Location => "Location",
            SortField::Course => "Course",
            SortField::Fees => "Course Fees",
            SortField::Placement => "Placements",
            SortField::UserReviews => "User Reviews",
            SortField::Rating => "CD Reviews",
        }
    }

    /// Maps a column name of a tabular source onto a field.
    pub fn from_column_name(name: &str) -> Option<SortField> {
        let name = name.trim().to_lowercase();
        let name = name.strip_prefix("college_").unwrap_or(&name);
        match name {
            "rank" => Some(SortField::Rank),
            "name" => Some(SortField::Name),
            "location" => Some(SortField::Location),
            "course" => Some(SortField::Course),
            "fees" => Some(SortField::Fees),
            "placement" => Some(SortField::Placement),
            "review_rating" => Some(SortField::UserReviews),
            "rating" => Some(SortField::Rating),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_reference_document_keys() {
        let json = r#"{
            "college_rank": 3,
            "college_name": "Indian Institute of Technology",
            "college_location": "Delhi",
            "college_course": "B.Tech CSE",
            "college_fees": "₹1,20,000",
            "college_placement": 2100000,
            "college_review_rating": 8.7,
            "college_rating": null
        }"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.rank, Some(3));
        assert_eq!(record.name, "Indian Institute of Technology");
        assert_eq!(record.fees, Some(FieldValue::Text("₹1,20,000".into())));
        assert_eq!(record.placement, Some(FieldValue::Number(2100000.0)));
        assert_eq!(record.rating, None);
    }

    #[test]
    fn missing_keys_are_missing_values() {
        let record: Record = serde_json::from_str(r#"{"name": "Solo"}"#).unwrap();
        assert_eq!(record.value(SortField::Fees), None);
        assert_eq!(record.value(SortField::Location), None);
        assert_eq!(record.cell(SortField::Fees), "∅");
    }

    #[test]
    fn null_text_fields_are_missing() {
        let json = r#"{"college_name": null, "college_location": null, "college_course": null, "college_fees": 5}"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.name, "");
        assert_eq!(record.value(SortField::Name), None);
        assert_eq!(record.value(SortField::Course), None);
        assert_eq!(record.fees, Some(FieldValue::Number(5.0)));
    }

    #[test]
    fn rank_accepts_text_and_float_forms() {
        let ranks: Vec<Record> = serde_json::from_str(
            r##"[{"college_rank": "1"}, {"college_rank": "#2"}, {"college_rank": 3.0},
                {"college_rank": null}, {"college_rank": "n/a"}, {"college_rank": -4}]"##,
        )
        .unwrap();
        let ranks: Vec<Option<u32>> = ranks.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, vec![Some(1), Some(2), Some(3), None, None, None]);
    }

    #[test]
    fn column_names_map_with_and_without_prefix() {
        assert_eq!(SortField::from_column_name("college_fees"), Some(SortField::Fees));
        assert_eq!(SortField::from_column_name(" Rank "), Some(SortField::Rank));
        assert_eq!(SortField::from_column_name("unknown"), None);
    }
}
