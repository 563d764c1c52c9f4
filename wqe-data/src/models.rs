//! Render-ready records returned by the query operations.

use serde::Serialize;

use crate::aggregate::SeriesPoint;

/// A location ranked by distance from a focal location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighbor {
    pub location_id: String,
    pub name: String,
    pub distance_km: f64,
    pub test_types: String,
    pub sample_count: u32,
    /// Shareable `?id=` reference to the location's detail view.
    pub link: String,
}

/// One location's mean value in the current map frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub location_id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub value: f64,
    pub sample_count: u32,
    pub test_types: String,
    pub link: String,
}

/// A labelled position on the color bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorTick {
    pub value: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorDomain {
    pub low: f64,
    pub high: f64,
}

/// Markers for one playback frame plus the frame-independent color scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapFrame {
    pub time_label: String,
    pub markers: Vec<MapMarker>,
    pub domain: ColorDomain,
    pub ticks: Vec<ColorTick>,
}

/// A location's mean for one metric at the cursor's time value.
/// `mean` is `None` when nothing was measured then.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationSnapshot {
    pub location_id: String,
    pub name: String,
    pub time_label: String,
    pub mean: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummaryRow {
    pub metric: String,
    pub valid_count: usize,
    pub flagged_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricCount {
    pub metric: String,
    pub count: usize,
}

/// Headline facts for a location's detail page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationDetail {
    pub location_id: String,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub test_types: String,
    /// Rows actually loaded for the location.
    pub samples: usize,
    /// Most measured metrics, highest count first.
    pub top_metrics: Vec<MetricCount>,
    /// Date of the newest sample, `YYYY-MM-DD`.
    pub last_sample: String,
    /// Whole days between consecutive samples. `None` with a single sample.
    pub min_gap_days: Option<i64>,
    pub max_gap_days: Option<i64>,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterRow {
    pub test_type: String,
    /// Location counts, aligned with [`ClusterTable::clusters`].
    pub counts: Vec<usize>,
    /// Column with the highest count; the first one on ties.
    pub max_cluster: String,
}

/// Test type × cluster label pivot of location counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterTable {
    pub clusters: Vec<String>,
    pub rows: Vec<ClusterRow>,
}

/// Precomputed layers for one location of a comparison chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationSeries {
    pub location_id: String,
    pub name: String,
    pub focal: bool,
    pub raw_points: Vec<SeriesPoint>,
    pub anomaly_points: Vec<SeriesPoint>,
    /// Empty when fewer than two points were available.
    pub smoothed: Vec<SeriesPoint>,
}
