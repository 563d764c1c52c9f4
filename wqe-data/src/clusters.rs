//! Lookups over the precomputed trend-shape labels.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use wqe_store::{test_type, MetricId, SampleStore, ShapeKind, ShapeLabel};

use crate::models::{ClusterRow, ClusterTable};
use crate::view::{guard_view, View, ViewError};

/// How a location's trend shape reads for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "category", rename_all = "snake_case")]
pub enum ShapeStatus {
    /// 1-based category number.
    Category(i64),
    Unidentified,
    NotEnoughData,
}

impl ShapeStatus {
    pub fn describe(&self) -> String {
        match self {
            ShapeStatus::Category(n) => format!("Category {}", n),
            ShapeStatus::Unidentified => {
                "Unidentified (pattern could not be categorised)".to_string()
            }
            ShapeStatus::NotEnoughData => "Not enough data".to_string(),
        }
    }
}

pub fn shape_status(
    store: &SampleStore,
    location_id: &str,
    metric: MetricId,
    kind: ShapeKind,
) -> View<ShapeStatus> {
    let Some(location) = store.location(location_id) else {
        return View::NotFound(location_id.to_string());
    };
    let has_column = store.schema().get(metric).is_some_and(|m| m.has_shape(kind));
    let status = match (has_column, location.shape_label(metric, kind)) {
        (true, Some(ShapeLabel::Cluster(n))) => ShapeStatus::Category(n + 1),
        (true, Some(ShapeLabel::Unidentified)) => ShapeStatus::Unidentified,
        _ => ShapeStatus::NotEnoughData,
    };
    View::Data(status)
}

/// Count locations per (test type, cluster) among locations sharing the
/// focal location's test types.
///
/// A location is represented by its first sample, in table order, whose
/// whole cleaned test-type string belongs to the focal location's token set.
pub fn cluster_distribution(
    store: &SampleStore,
    location_id: &str,
    metric: MetricId,
    kind: ShapeKind,
) -> View<ClusterTable> {
    guard_view("cluster distribution", || {
        if store.location(location_id).is_none() {
            return Ok(ViewError::InvalidLocationReference(location_id.to_string()).into());
        }
        let column_present = store.schema().get(metric).is_some_and(|m| m.has_shape(kind));
        if !column_present {
            let column = format!("{:?} shape for metric {}", kind, metric.index());
            return Ok(ViewError::MissingColumn(column).into());
        }

        let focal_types: HashSet<String> = store
            .samples_at(location_id)
            .filter_map(|s| s.test_type.as_deref())
            .flat_map(test_type::tokens)
            .collect();

        let mut seen: HashSet<&str> = HashSet::new();
        let mut counts: BTreeMap<&str, BTreeMap<i64, usize>> = BTreeMap::new();
        for sample in store.samples() {
            let Some(raw) = sample.test_type.as_deref() else {
                continue;
            };
            if seen.contains(sample.location_id.as_str())
                || !focal_types.contains(&test_type::normalize(raw))
            {
                continue;
            }
            seen.insert(&sample.location_id);

            let location = store.location(&sample.location_id).ok_or_else(|| {
                ViewError::Computation(format!(
                    "sample references unknown location {}",
                    sample.location_id
                ))
            })?;
            match location.shape_label(metric, kind) {
                Some(ShapeLabel::Cluster(n)) => {
                    *counts.entry(raw).or_default().entry(n).or_default() += 1
                }
                Some(ShapeLabel::Unidentified) => {
                    counts.entry(raw).or_default();
                }
                None => {}
            }
        }

        let clusters: BTreeSet<i64> = counts.values().flat_map(|m| m.keys().copied()).collect();
        if clusters.is_empty() {
            return Ok(View::NoData);
        }
        let names: Vec<String> = (1..=clusters.len()).map(|i| format!("Cluster {}", i)).collect();

        let mut rows = Vec::with_capacity(counts.len());
        for (test_type, by_cluster) in &counts {
            let row: Vec<usize> = clusters
                .iter()
                .map(|c| by_cluster.get(c).copied().unwrap_or(0))
                .collect();
            let mut best = 0;
            for (i, &n) in row.iter().enumerate() {
                if n > row[best] {
                    best = i;
                }
            }
            rows.push(ClusterRow {
                test_type: test_type.to_string(),
                counts: row,
                max_cluster: names[best].clone(),
            });
        }
        log::debug!("[WQE] clusters: {} test types x {} clusters", rows.len(), names.len());
        Ok(View::Data(ClusterTable { clusters: names, rows }))
    })
}
