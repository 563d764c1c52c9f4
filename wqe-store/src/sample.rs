use crate::schema::MetricId;
use chrono::{NaiveDate, NaiveDateTime};

/// One dated water-quality sample taken at a location.
///
/// Metric values are sparse: a metric that was not measured is `None`,
/// never zero. Anomaly flags default to `false` when the flag column is
/// absent from the source table.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub location_id: String,
    pub timestamp: NaiveDateTime,
    pub year: i32,
    pub month: u32,
    /// Raw comma-joined test-type field, trimmed.
    pub test_type: Option<String>,
    pub(crate) values: Vec<Option<f64>>,
    pub(crate) flags: Vec<bool>,
}

impl Sample {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    pub fn value(&self, metric: MetricId) -> Option<f64> {
        self.values.get(metric.index()).copied().flatten()
    }

    pub fn is_flagged(&self, metric: MetricId) -> bool {
        self.flags.get(metric.index()).copied().unwrap_or(false)
    }
}

/// Interpret a flag cell. Anything other than an explicit true is unflagged.
pub(crate) fn parse_flag(cell: &str) -> bool {
    matches!(cell.trim(), "true" | "True" | "TRUE" | "1" | "1.0")
}

/// Interpret a metric cell. Blank, non-numeric and non-finite cells are absent.
pub(crate) fn parse_value(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("True"));
        assert!(parse_flag(" true "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("False"));
        assert!(!parse_flag(""));
        assert!(!parse_flag("nan"));
    }

    #[test]
    fn test_parse_value_keeps_absent_distinct_from_zero() {
        assert_eq!(parse_value("0"), Some(0.0));
        assert_eq!(parse_value(" 7.25 "), Some(7.25));
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("NaN"), None);
        assert_eq!(parse_value("<0.1"), None);
    }
}
