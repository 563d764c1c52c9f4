//! Multi-location comparison series.
//!
//! Results are memoized per (locations, metric, granularity, anomaly policy,
//! date range).
//! Showing or hiding the raw and smoothed layers only selects from a cached
//! result and never recomputes.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use wqe_store::{MetricId, Sample, SampleStore};

use crate::aggregate::{aggregate, Bucket, Granularity, SeriesPoint};
use crate::filter::{AnomalyPolicy, DateRange};
use crate::models::LocationSeries;
use crate::smooth::{smooth_points, SMOOTHING_FRAC};
use crate::view::View;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComparisonKey {
    /// Focal location first, then the others in request order.
    pub location_ids: Vec<String>,
    pub metric: MetricId,
    pub granularity: Granularity,
    pub anomaly_policy: AnomalyPolicy,
    /// Samples outside the range are left out of every layer.
    pub date_range: DateRange,
}

impl ComparisonKey {
    pub fn new(
        focal: &str,
        others: &[String],
        metric: MetricId,
        granularity: Granularity,
        anomaly_policy: AnomalyPolicy,
    ) -> Self {
        let mut location_ids = vec![focal.to_string()];
        for id in others {
            if !location_ids.contains(id) {
                location_ids.push(id.clone());
            }
        }
        Self {
            location_ids,
            metric,
            granularity,
            anomaly_policy,
            date_range: DateRange::default(),
        }
    }

    pub fn with_date_range(mut self, date_range: DateRange) -> Self {
        self.date_range = date_range;
        self
    }
}

/// Which precomputed layers to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Layers {
    pub raw: bool,
    pub smoothed: bool,
}

impl Default for Layers {
    fn default() -> Self {
        Self { raw: true, smoothed: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub granularity: Granularity,
    pub series: Vec<LocationSeries>,
}

impl Comparison {
    /// Copy of the result with hidden layers emptied. Anomaly points follow
    /// the raw layer.
    pub fn visible(&self, layers: Layers) -> Comparison {
        let series = self
            .series
            .iter()
            .map(|s| LocationSeries {
                raw_points: if layers.raw { s.raw_points.clone() } else { Vec::new() },
                anomaly_points: if layers.raw { s.anomaly_points.clone() } else { Vec::new() },
                smoothed: if layers.smoothed { s.smoothed.clone() } else { Vec::new() },
                ..s.clone()
            })
            .collect();
        Comparison {
            granularity: self.granularity,
            series,
        }
    }
}

#[derive(Debug)]
pub struct ComparisonEngine {
    frac: f64,
    cache: HashMap<ComparisonKey, Arc<Comparison>>,
    computations: usize,
}

impl Default for ComparisonEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ComparisonEngine {
    pub fn new() -> Self {
        Self::with_frac(SMOOTHING_FRAC)
    }

    pub fn with_frac(frac: f64) -> Self {
        Self {
            frac,
            cache: HashMap::new(),
            computations: 0,
        }
    }

    /// Number of comparisons actually computed (cache misses).
    pub fn computations(&self) -> usize {
        self.computations
    }

    pub fn build_series(
        &mut self,
        store: &SampleStore,
        key: &ComparisonKey,
    ) -> View<Arc<Comparison>> {
        let Some(focal) = key.location_ids.first() else {
            return View::NoData;
        };
        if store.location(focal).is_none() {
            return View::NotFound(focal.clone());
        }
        if let Some(hit) = self.cache.get(key) {
            log::debug!("[WQE] comparison: cache hit for {:?}", key.location_ids);
            return View::Data(Arc::clone(hit));
        }

        self.computations += 1;
        let series: Vec<LocationSeries> = key
            .location_ids
            .iter()
            .enumerate()
            .filter_map(|(i, id)| self.location_series(store, id, i == 0, key))
            .collect();
        log::debug!(
            "[WQE] comparison: built {} series for {} locations",
            series.len(),
            key.location_ids.len()
        );
        if series.is_empty() {
            return View::NoData;
        }

        let result = Arc::new(Comparison {
            granularity: key.granularity,
            series,
        });
        self.cache.insert(key.clone(), Arc::clone(&result));
        View::Data(result)
    }

    fn location_series(
        &self,
        store: &SampleStore,
        id: &str,
        focal: bool,
        key: &ComparisonKey,
    ) -> Option<LocationSeries> {
        let location = store.location(id)?;
        let mut samples: Vec<&Sample> = store
            .samples_at(id)
            .filter(|s| s.value(key.metric).is_some() && key.date_range.contains(s.date()))
            .collect();
        samples.sort_by_key(|s| s.timestamp);

        let (normal, flagged): (Vec<&Sample>, Vec<&Sample>) =
            samples.into_iter().partition(|s| !s.is_flagged(key.metric));
        let plotted: Vec<&Sample> = match key.anomaly_policy {
            AnomalyPolicy::Include => {
                let mut all: Vec<&Sample> = normal.iter().chain(&flagged).copied().collect();
                all.sort_by_key(|s| s.timestamp);
                all
            }
            AnomalyPolicy::Exclude => normal.clone(),
        };

        let (raw_points, anomaly_points, smoothed) = match key.granularity {
            Granularity::Raw => {
                let points = |rows: &[&Sample]| -> Vec<SeriesPoint> {
                    rows.iter()
                        .filter_map(|s| {
                            s.value(key.metric).map(|value| SeriesPoint {
                                bucket: Bucket::Timestamp(s.timestamp),
                                value,
                            })
                        })
                        .collect()
                };
                let anomalies = match key.anomaly_policy {
                    AnomalyPolicy::Include => points(flagged.as_slice()),
                    AnomalyPolicy::Exclude => Vec::new(),
                };
                let smoothed = smooth_points(&points(plotted.as_slice()), self.frac);
                (points(normal.as_slice()), anomalies, smoothed)
            }
            granularity => {
                let series = aggregate(plotted.iter().copied(), key.metric, granularity);
                let smoothed = smooth_points(series.points(), self.frac);
                (series.into_points(), Vec::new(), smoothed)
            }
        };

        if raw_points.is_empty() && anomaly_points.is_empty() {
            return None;
        }
        Some(LocationSeries {
            location_id: location.id.clone(),
            name: location.name.clone(),
            focal,
            raw_points,
            anomaly_points,
            smoothed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const CSV: &str = "\
Location_ID,Location_Name,Date,pH (phunits),pH (phunits)_flagged
L1,Mill Brook,2021-03-01,7.0,False
L1,Mill Brook,2021-01-01,6.0,False
L1,Mill Brook,2021-05-01,30.0,True
L1,Mill Brook,2022-03-01,8.0,False
L1,Mill Brook,2022-06-01,,False
L2,Old Pond,2021-02-01,9.0,False
L2,Old Pond,2022-02-01,9.5,False
L3,Dry Ditch,2021-02-01,,False
";

    fn setup() -> (SampleStore, MetricId) {
        let store = SampleStore::load_csv(CSV, &["pH (phunits)"]).unwrap();
        let ph = store.metric_id("pH (phunits)").unwrap();
        (store, ph)
    }

    fn key(ph: MetricId, granularity: Granularity, policy: AnomalyPolicy) -> ComparisonKey {
        ComparisonKey::new("L1", &["L2".to_string(), "L3".to_string()], ph, granularity, policy)
    }

    #[test]
    fn raw_splits_normal_and_anomalous_points() {
        let (store, ph) = setup();
        let mut engine = ComparisonEngine::new();
        let cmp = engine
            .build_series(&store, &key(ph, Granularity::Raw, AnomalyPolicy::Include))
            .data()
            .unwrap();
        assert_eq!(cmp.series.len(), 2, "L3 has no values");

        let l1 = &cmp.series[0];
        assert!(l1.focal);
        let values: Vec<f64> = l1.raw_points.iter().map(|p| p.value).collect();
        assert_eq!(values, [6.0, 7.0, 8.0], "time ordered, flagged excluded");
        assert_eq!(l1.anomaly_points.len(), 1);
        assert_eq!(l1.smoothed.len(), 4, "smoothing runs over the union");
        assert!(!cmp.series[1].focal);
    }

    #[test]
    fn exclude_policy_drops_anomalies_from_smoothing() {
        let (store, ph) = setup();
        let mut engine = ComparisonEngine::new();
        let cmp = engine
            .build_series(&store, &key(ph, Granularity::Raw, AnomalyPolicy::Exclude))
            .data()
            .unwrap();
        let l1 = &cmp.series[0];
        assert!(l1.anomaly_points.is_empty());
        assert_eq!(l1.smoothed.len(), 3);
    }

    #[test]
    fn year_granularity_aggregates_then_smooths() {
        let (store, ph) = setup();
        let mut engine = ComparisonEngine::new();
        let cmp = engine
            .build_series(&store, &key(ph, Granularity::Year, AnomalyPolicy::Exclude))
            .data()
            .unwrap();
        let l1 = &cmp.series[0];
        let buckets: Vec<Bucket> = l1.raw_points.iter().map(|p| p.bucket).collect();
        assert_eq!(buckets, [Bucket::Year(2021), Bucket::Year(2022)]);
        assert_relative_eq!(l1.raw_points[0].value, 6.5);
        assert_eq!(l1.smoothed.len(), 2);
        assert_eq!(l1.smoothed[0].bucket, Bucket::Year(2021));
    }

    #[test]
    fn single_point_series_has_no_trend() {
        let (store, ph) = setup();
        let mut engine = ComparisonEngine::new();
        let k = ComparisonKey::new("L2", &[], ph, Granularity::Month, AnomalyPolicy::Include);
        let cmp = engine.build_series(&store, &k).data().unwrap();
        assert_eq!(cmp.series[0].raw_points.len(), 1);
        assert!(cmp.series[0].smoothed.is_empty());
    }

    #[test]
    fn layer_toggles_reuse_the_cached_result() {
        let (store, ph) = setup();
        let mut engine = ComparisonEngine::new();
        let k = key(ph, Granularity::Raw, AnomalyPolicy::Include);

        let first = engine.build_series(&store, &k).data().unwrap();
        let hidden = first.visible(Layers { raw: false, smoothed: true });
        assert!(hidden.series[0].raw_points.is_empty());
        assert!(hidden.series[0].anomaly_points.is_empty());
        assert!(!hidden.series[0].smoothed.is_empty());

        let again = engine.build_series(&store, &k).data().unwrap();
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(engine.computations(), 1);

        engine.build_series(&store, &key(ph, Granularity::Year, AnomalyPolicy::Include));
        assert_eq!(engine.computations(), 2);
    }

    #[test]
    fn date_range_restricts_a_single_location() {
        use chrono::NaiveDate;
        let (store, ph) = setup();
        let mut engine = ComparisonEngine::new();
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2021, 2, 1),
            NaiveDate::from_ymd_opt(2021, 12, 31),
        );
        let k = ComparisonKey::new("L1", &[], ph, Granularity::Raw, AnomalyPolicy::Include)
            .with_date_range(range);
        let cmp = engine.build_series(&store, &k).data().unwrap();
        let l1 = &cmp.series[0];
        let values: Vec<f64> = l1.raw_points.iter().map(|p| p.value).collect();
        assert_eq!(values, [7.0], "Jan 2021 and 2022 fall outside");
        assert_eq!(l1.anomaly_points.len(), 1);
        assert_eq!(l1.smoothed.len(), 2);

        let unbounded = ComparisonKey::new("L1", &[], ph, Granularity::Raw, AnomalyPolicy::Include);
        engine.build_series(&store, &unbounded);
        assert_eq!(engine.computations(), 2, "the range is part of the cache key");
    }

    #[test]
    fn unknown_focal_is_not_found() {
        let (store, ph) = setup();
        let mut engine = ComparisonEngine::new();
        let k = ComparisonKey::new("L9", &[], ph, Granularity::Raw, AnomalyPolicy::Include);
        assert_eq!(engine.build_series(&store, &k), View::NotFound("L9".to_string()));
        assert_eq!(engine.computations(), 0);
    }
}
