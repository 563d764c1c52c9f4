use chrono::NaiveDateTime;
use wqe_store::SampleStore;
use wqe_utils::{dates, links};

use crate::models::{LocationDetail, MetricCount, MetricSummaryRow};
use crate::view::View;

/// Metrics listed on a location's detail card.
pub const TOP_METRICS: usize = 3;

/// Present-value and flagged-row counts for every tracked metric at one
/// location. Metrics without a flag column report zero flags.
pub fn metric_summary(store: &SampleStore, location_id: &str) -> View<Vec<MetricSummaryRow>> {
    if store.location(location_id).is_none() {
        return View::NotFound(location_id.to_string());
    }
    let rows = store
        .schema()
        .metrics()
        .iter()
        .map(|m| {
            let (mut valid_count, mut flagged_count) = (0, 0);
            for sample in store.samples_at(location_id) {
                if sample.value(m.id).is_some() {
                    valid_count += 1;
                }
                if sample.is_flagged(m.id) {
                    flagged_count += 1;
                }
            }
            MetricSummaryRow {
                metric: m.name.clone(),
                valid_count,
                flagged_count,
            }
        })
        .collect();
    View::from_items(rows)
}

/// Sample count, most measured metrics, newest sample and sampling gaps for
/// one location.
///
/// Metrics with no values are not listed. Equal counts keep schema order.
pub fn location_detail(store: &SampleStore, location_id: &str) -> View<LocationDetail> {
    let Some(location) = store.location(location_id) else {
        return View::NotFound(location_id.to_string());
    };
    let mut timestamps: Vec<NaiveDateTime> =
        store.samples_at(location_id).map(|s| s.timestamp).collect();
    timestamps.sort();
    let Some(last) = timestamps.last() else {
        return View::NoData;
    };

    let mut top_metrics: Vec<MetricCount> = store
        .schema()
        .metrics()
        .iter()
        .map(|m| MetricCount {
            metric: m.name.clone(),
            count: store
                .samples_at(location_id)
                .filter(|s| s.value(m.id).is_some())
                .count(),
        })
        .filter(|m| m.count > 0)
        .collect();
    top_metrics.sort_by(|a, b| b.count.cmp(&a.count));
    top_metrics.truncate(TOP_METRICS);

    let gaps: Vec<i64> = timestamps.windows(2).map(|w| (w[1] - w[0]).num_days()).collect();
    log::debug!("[WQE] summary: detail for {} over {} samples", location_id, timestamps.len());

    View::Data(LocationDetail {
        location_id: location.id.clone(),
        name: location.name.clone(),
        latitude: location.position.map(|p| p.latitude),
        longitude: location.position.map(|p| p.longitude),
        test_types: location.test_types.clone(),
        samples: timestamps.len(),
        last_sample: dates::format_date(&last.date()),
        min_gap_days: gaps.iter().copied().min(),
        max_gap_days: gaps.iter().copied().max(),
        top_metrics,
        link: links::location_link(&location.id),
    })
}
