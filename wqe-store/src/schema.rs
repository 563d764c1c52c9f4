//! Column contract of the upstream sample table.
//!
//! Column names are resolved once, when the CSV header is read, into a
//! [`MetricSchema`]. Every tracked metric maps to its value column plus the
//! optional companion columns (anomaly flag, precomputed shape labels).
//! Companions that are absent resolve to `None`; consumers treat that as
//! "no flag" / "no cluster" rather than failing.

use crate::error::StoreError;
use csv::StringRecord;
use serde::Serialize;
use std::collections::HashMap;

pub const LOCATION_ID: &str = "Location_ID";
pub const LOCATION_NAME: &str = "Location_Name";
pub const LATITUDE: &str = "Latitude";
pub const LONGITUDE: &str = "Longitude";
pub const SAMPLE_COUNT: &str = "Sample_Count";
pub const TEST_TYPE: &str = "Test_Type";
pub const DATE: &str = "Date";
pub const YEAR: &str = "Year";
pub const MONTH: &str = "Month";

pub const FLAG_SUFFIX: &str = "_flagged";
pub const SHAPE_YEARLY_SUFFIX: &str = "_shape_yearly";
pub const SHAPE_OVER_TIME_SUFFIX: &str = "_shape_over-time";

/// Metrics tracked by the deployed explorer.
pub const DEFAULT_METRICS: [&str; 14] = [
    "Orthophosphate, reactive as P (mg/l)",
    "Temperature of Water (°C)",
    "Ammoniacal Nitrogen as N (mg/l)",
    "Phosphorus, Total as P (mg/l)",
    "Nitrogen, Total Oxidised as N (mg/l)",
    "Nitrate as N (mg/l)",
    "Nitrite as N (mg/l)",
    "Nitrogen, Total as N (mg/l)",
    "Alkalinity to pH 4.5 as CaCO3 (mg/l)",
    "pH (phunits)",
    "Oxygen, Dissolved, % Saturation (%)",
    "Oxygen, Dissolved as O2 (mg/l)",
    "BOD : 5 Day ATU (mg/l)",
    "Solids, Suspended at 105 C (mg/l)",
];

const BASE_COLUMNS: [&str; 9] = [
    LOCATION_ID,
    LOCATION_NAME,
    LATITUDE,
    LONGITUDE,
    SAMPLE_COUNT,
    TEST_TYPE,
    DATE,
    YEAR,
    MONTH,
];

/// Index of a resolved metric within the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MetricId(pub(crate) usize);

impl MetricId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// The two precomputed shape classifications carried per metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ShapeKind {
    Yearly,
    OverTime,
}

impl ShapeKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            ShapeKind::Yearly => SHAPE_YEARLY_SUFFIX,
            ShapeKind::OverTime => SHAPE_OVER_TIME_SUFFIX,
        }
    }
}

/// A metric and the header positions of its value and companion columns.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricColumns {
    pub id: MetricId,
    pub name: String,
    pub(crate) value_col: usize,
    pub(crate) flag_col: Option<usize>,
    pub(crate) shape_yearly_col: Option<usize>,
    pub(crate) shape_over_time_col: Option<usize>,
}

impl MetricColumns {
    pub fn has_flag(&self) -> bool {
        self.flag_col.is_some()
    }

    pub fn has_shape(&self, kind: ShapeKind) -> bool {
        self.shape_col(kind).is_some()
    }

    pub(crate) fn shape_col(&self, kind: ShapeKind) -> Option<usize> {
        match kind {
            ShapeKind::Yearly => self.shape_yearly_col,
            ShapeKind::OverTime => self.shape_over_time_col,
        }
    }
}

/// Header positions of the per-row location and time columns.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BaseColumns {
    pub location_id: usize,
    pub date: usize,
    pub location_name: Option<usize>,
    pub latitude: Option<usize>,
    pub longitude: Option<usize>,
    pub sample_count: Option<usize>,
    pub test_type: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricSchema {
    pub(crate) base: BaseColumns,
    metrics: Vec<MetricColumns>,
}

impl MetricSchema {
    /// Resolve the header row against the tracked metric names.
    ///
    /// `Location_ID` and `Date` are mandatory. Tracked metrics missing from
    /// the header are logged and left out. An empty `tracked` list treats
    /// every non-base, non-companion column as a metric.
    pub fn resolve<S: AsRef<str>>(
        headers: &StringRecord,
        tracked: &[S],
    ) -> Result<Self, StoreError> {
        let positions: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim(), i))
            .collect();
        let find = |name: &str| positions.get(name).copied();

        let base = BaseColumns {
            location_id: find(LOCATION_ID)
                .ok_or_else(|| StoreError::MissingColumn(LOCATION_ID.to_string()))?,
            date: find(DATE).ok_or_else(|| StoreError::MissingColumn(DATE.to_string()))?,
            location_name: find(LOCATION_NAME),
            latitude: find(LATITUDE),
            longitude: find(LONGITUDE),
            sample_count: find(SAMPLE_COUNT),
            test_type: find(TEST_TYPE),
        };

        let names: Vec<String> = if tracked.is_empty() {
            headers
                .iter()
                .map(str::trim)
                .filter(|h| !h.is_empty() && !is_base_or_companion(h))
                .map(str::to_string)
                .collect()
        } else {
            tracked.iter().map(|m| m.as_ref().to_string()).collect()
        };

        let mut metrics = Vec::with_capacity(names.len());
        for name in names {
            let Some(value_col) = find(&name) else {
                log::warn!("[WQE] schema: metric column '{}' not found, skipping", name);
                continue;
            };
            let id = MetricId(metrics.len());
            metrics.push(MetricColumns {
                id,
                value_col,
                flag_col: find(&format!("{}{}", name, FLAG_SUFFIX)),
                shape_yearly_col: find(&format!("{}{}", name, SHAPE_YEARLY_SUFFIX)),
                shape_over_time_col: find(&format!("{}{}", name, SHAPE_OVER_TIME_SUFFIX)),
                name,
            });
        }
        log::info!("[WQE] schema: resolved {} metric columns", metrics.len());
        Ok(Self { base, metrics })
    }

    pub fn metrics(&self) -> &[MetricColumns] {
        &self.metrics
    }

    /// Look up a metric by its column name.
    pub fn metric(&self, name: &str) -> Option<&MetricColumns> {
        self.metrics.iter().find(|m| m.name == name)
    }

    pub fn get(&self, id: MetricId) -> Option<&MetricColumns> {
        self.metrics.get(id.0)
    }
}

fn is_base_or_companion(header: &str) -> bool {
    BASE_COLUMNS.contains(&header)
        || header.ends_with(FLAG_SUFFIX)
        || header.ends_with(SHAPE_YEARLY_SUFFIX)
        || header.ends_with(SHAPE_OVER_TIME_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cols: &[&str]) -> StringRecord {
        StringRecord::from(cols.to_vec())
    }

    #[test]
    fn resolves_metric_with_companions() {
        let h = headers(&[
            "Location_ID",
            "Date",
            "pH (phunits)",
            "pH (phunits)_flagged",
            "pH (phunits)_shape_yearly",
        ]);
        let schema = MetricSchema::resolve(&h, &["pH (phunits)"]).unwrap();
        let ph = schema.metric("pH (phunits)").unwrap();
        assert_eq!(ph.value_col, 2);
        assert!(ph.has_flag());
        assert!(ph.has_shape(ShapeKind::Yearly));
        assert!(!ph.has_shape(ShapeKind::OverTime));
    }

    #[test]
    fn missing_tracked_metric_is_skipped() {
        let h = headers(&["Location_ID", "Date", "Nitrate as N (mg/l)"]);
        let schema =
            MetricSchema::resolve(&h, &["pH (phunits)", "Nitrate as N (mg/l)"]).unwrap();
        assert_eq!(schema.metrics().len(), 1);
        assert!(schema.metric("pH (phunits)").is_none());
        let nitrate = schema.metric("Nitrate as N (mg/l)").unwrap();
        assert_eq!(nitrate.id.index(), 0);
        assert!(!nitrate.has_flag());
    }

    #[test]
    fn empty_tracked_list_detects_metrics() {
        let h = headers(&[
            "Location_ID",
            "Location_Name",
            "Date",
            "Year",
            "Month",
            "Turbidity",
            "Turbidity_flagged",
            "Turbidity_shape_over-time",
        ]);
        let schema = MetricSchema::resolve::<&str>(&h, &[]).unwrap();
        let names: Vec<&str> = schema.metrics().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Turbidity"]);
        assert!(schema.metrics()[0].has_shape(ShapeKind::OverTime));
    }

    #[test]
    fn mandatory_columns_are_required() {
        let h = headers(&["Location_ID", "pH (phunits)"]);
        let err = MetricSchema::resolve(&h, &["pH (phunits)"]).unwrap_err();
        assert!(matches!(err, StoreError::MissingColumn(ref c) if c == "Date"));
    }
}
