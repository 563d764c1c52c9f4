//! Per-frame map markers and single-location snapshots.

use std::collections::HashMap;
use wqe_store::{MetricId, Sample, SampleStore};
use wqe_utils::links;

use crate::color_scale;
use crate::filter::{AnomalyPolicy, LocationFilter};
use crate::models::{LocationSnapshot, MapFrame, MapMarker};
use crate::playback::TimeValue;
use crate::view::View;

fn in_bucket(sample: &Sample, value: TimeValue) -> bool {
    match value {
        TimeValue::Year(y) => sample.year == y,
        TimeValue::Month(m) => sample.month == m,
    }
}

/// Markers for the cursor's current year or month.
///
/// Each qualifying location gets the mean of its non-flagged values in the
/// bucket. Locations with nothing to show are left off the map. The color
/// domain covers the whole table, not just this frame.
pub fn map_frame(
    store: &SampleStore,
    metric: MetricId,
    filter: &LocationFilter,
    value: Option<TimeValue>,
    tick_count: usize,
) -> View<MapFrame> {
    let Some(value) = value else {
        return View::NoData;
    };

    let mut sums: HashMap<&str, (f64, u32)> = HashMap::new();
    for sample in store.samples() {
        if !filter.test_types.matches(sample.test_type.as_deref())
            || !in_bucket(sample, value)
            || sample.is_flagged(metric)
        {
            continue;
        }
        if let Some(v) = sample.value(metric) {
            let entry = sums.entry(sample.location_id.as_str()).or_insert((0.0, 0));
            entry.0 += v;
            entry.1 += 1;
        }
    }

    let markers: Vec<MapMarker> = store
        .locations()
        .iter()
        .filter(|l| filter.admits_count(l))
        .filter_map(|l| {
            let (sum, n) = sums.get(l.id.as_str())?;
            let position = l.position?;
            Some(MapMarker {
                location_id: l.id.clone(),
                name: l.name.clone(),
                latitude: position.latitude,
                longitude: position.longitude,
                value: sum / *n as f64,
                sample_count: l.sample_count,
                test_types: l.test_types.clone(),
                link: links::location_link(&l.id),
            })
        })
        .collect();
    log::debug!("[WQE] map: {} markers for {}", markers.len(), value.label());
    if markers.is_empty() {
        return View::NoData;
    }

    let domain = color_scale::domain(store, metric, AnomalyPolicy::Exclude, &filter.test_types);
    domain.map(|domain| MapFrame {
        time_label: value.label(),
        ticks: domain.ticks(tick_count),
        markers,
        domain,
    })
}

/// Mean of `metric` at one location for the given time value, flagged rows
/// included.
pub fn location_snapshot(
    store: &SampleStore,
    location_id: &str,
    metric: MetricId,
    value: TimeValue,
) -> View<LocationSnapshot> {
    let Some(location) = store.location(location_id) else {
        return View::NotFound(location_id.to_string());
    };
    let values: Vec<f64> = store
        .samples_at(location_id)
        .filter(|s| in_bucket(s, value))
        .filter_map(|s| s.value(metric))
        .collect();
    let mean = if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    };
    View::Data(LocationSnapshot {
        location_id: location.id.clone(),
        name: location.name.clone(),
        time_label: value.label(),
        mean,
    })
}
