//! A lead record is a flat CSV row keyed by header name.
//!
//! The column layout is not fixed: different exports carry different subsets
//! of the well-known columns, and annotation columns are appended as
//! validation progresses. Field order is preserved for output.

use serde::{Deserialize, Serialize};

/// Sentinel used by upstream exports for "this field was not collected".
pub const NOT_FOUND: &str = "Not found";

/// Columns checked, in order, when resolving a lead's business name.
pub const NAME_COLUMNS: [&str; 2] = ["Business Name", "Company"];

/// Maximum number of decision-maker slots in a lead export.
pub const DECISION_MAKER_SLOTS: u8 = 3;

/// A single lead row: ordered `(column, value)` pairs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LeadRecord {
    fields: Vec<(String, String)>,
}

/// A decision-maker entry extracted from one of the numbered column triples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionMaker {
    pub name: String,
    pub title: String,
    pub source: Option<String>,
}

impl LeadRecord {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Build a record from parallel header/value iterators.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Raw value of a column, if the column exists.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Value of a column, treating empty strings and the `Not found`
    /// sentinel as absent.
    pub fn value(&self, column: &str) -> Option<&str> {
        self.get(column)
            .map(str::trim)
            .filter(|v| !v.is_empty() && *v != NOT_FOUND)
    }

    /// Set a column, replacing an existing value or appending a new column.
    pub fn set(&mut self, column: &str, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| name == column) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((column.to_string(), value)),
        }
    }

    /// Ordered view of all `(column, value)` pairs.
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// The lead's business name: `Business Name`, falling back to `Company`.
    pub fn business_name(&self) -> Option<&str> {
        NAME_COLUMNS.iter().find_map(|col| self.value(col))
    }

    /// Decision maker in slot `n` (1-based), only when both name and title
    /// are present.
    pub fn decision_maker(&self, n: u8) -> Option<DecisionMaker> {
        let name = self.value(&format!("Decision Maker {n} Name"))?;
        let title = self.value(&format!("Decision Maker {n} Title"))?;
        let source = self
            .value(&format!("Decision Maker {n} Source"))
            .map(str::to_string);
        Some(DecisionMaker {
            name: name.to_string(),
            title: title.to_string(),
            source,
        })
    }

    /// Whether this lead carries any validatable datapoint.
    pub fn has_datapoints(&self) -> bool {
        self.value("estimated_revenue").is_some()
            || self.value("Company Size").is_some()
            || (1..=DECISION_MAKER_SLOTS).any(|n| self.decision_maker(n).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LeadRecord {
        LeadRecord::from_pairs([
            ("Business Name", "Acme Corp"),
            ("Industry", "Manufacturing"),
            ("Company Size", "Not found"),
            ("estimated_revenue", "$4.5M"),
            ("Decision Maker 1 Name", "Jo Reyes"),
            ("Decision Maker 1 Title", "CEO"),
            ("Decision Maker 2 Name", "Sam Lim"),
            ("Decision Maker 2 Title", "Not found"),
        ])
    }

    #[test]
    fn test_value_filters_sentinel() {
        let rec = sample();
        assert_eq!(rec.value("estimated_revenue"), Some("$4.5M"));
        assert_eq!(rec.value("Company Size"), None);
        assert_eq!(rec.value("missing"), None);
    }

    #[test]
    fn test_business_name_fallback() {
        let rec = LeadRecord::from_pairs([("Company", "Beta LLC")]);
        assert_eq!(rec.business_name(), Some("Beta LLC"));

        let rec = sample();
        assert_eq!(rec.business_name(), Some("Acme Corp"));
    }

    #[test]
    fn test_decision_maker_requires_name_and_title() {
        let rec = sample();
        let dm = rec.decision_maker(1).unwrap();
        assert_eq!(dm.name, "Jo Reyes");
        assert_eq!(dm.title, "CEO");
        assert_eq!(dm.source, None);

        // Slot 2 has a sentinel title.
        assert!(rec.decision_maker(2).is_none());
        assert!(rec.decision_maker(3).is_none());
    }

    #[test]
    fn test_set_replaces_or_appends() {
        let mut rec = sample();
        rec.set("Industry", "Logistics");
        rec.set("revenue_confidence", "0.8");
        assert_eq!(rec.get("Industry"), Some("Logistics"));
        assert_eq!(rec.get("revenue_confidence"), Some("0.8"));
        // Order preserved: the new column lands at the end.
        assert_eq!(rec.fields().last().unwrap().0, "revenue_confidence");
    }

    #[test]
    fn test_has_datapoints() {
        assert!(sample().has_datapoints());
        let empty = LeadRecord::from_pairs([("Business Name", "Hollow Inc")]);
        assert!(!empty.has_datapoints());
    }
}
