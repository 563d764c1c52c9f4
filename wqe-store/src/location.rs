use crate::schema::{MetricId, ShapeKind};
use serde::Serialize;

/// Latitude/longitude in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Precomputed cluster label describing the shape of a metric's trend.
///
/// Labels arrive as numbers (`"0"`, `"3.0"`) or the sentinel `"Unidentified"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ShapeLabel {
    Cluster(i64),
    Unidentified,
}

impl ShapeLabel {
    /// Parse a label cell. Blank cells carry no label.
    pub fn parse(cell: &str) -> Option<Self> {
        let cell = cell.trim();
        if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
            return None;
        }
        match cell.parse::<f64>() {
            Ok(v) if v.is_finite() => Some(ShapeLabel::Cluster(v.trunc() as i64)),
            _ => Some(ShapeLabel::Unidentified),
        }
    }
}

/// First non-blank shape labels seen for one metric at one location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ShapeLabels {
    pub yearly: Option<ShapeLabel>,
    pub over_time: Option<ShapeLabel>,
}

impl ShapeLabels {
    pub fn get(&self, kind: ShapeKind) -> Option<ShapeLabel> {
        match kind {
            ShapeKind::Yearly => self.yearly,
            ShapeKind::OverTime => self.over_time,
        }
    }

    pub(crate) fn fill(&mut self, kind: ShapeKind, label: ShapeLabel) {
        let slot = match kind {
            ShapeKind::Yearly => &mut self.yearly,
            ShapeKind::OverTime => &mut self.over_time,
        };
        slot.get_or_insert(label);
    }
}

/// A sampling location, aggregated once when the table is loaded.
///
/// `sample_count` is the upstream `Sample_Count` and never changes with
/// the active filters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub position: Option<GeoPoint>,
    pub sample_count: u32,
    /// Distinct raw test-type fields seen at this location, sorted, joined by `", "`.
    pub test_types: String,
    #[serde(skip)]
    pub(crate) shapes: Vec<ShapeLabels>,
}

impl Location {
    pub fn shape_label(&self, metric: MetricId, kind: ShapeKind) -> Option<ShapeLabel> {
        self.shapes.get(metric.index()).and_then(|s| s.get(kind))
    }
}
