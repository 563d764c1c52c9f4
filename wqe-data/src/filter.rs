//! Composable sample predicates.
//!
//! Filters never copy or mutate the shared table: a [`Selection`] borrows
//! the matching samples and tags each one with its anomaly state.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use wqe_store::{Location, MetricId, Sample, SampleStore, TestTypeFilter};

use crate::view::View;

/// What to do with samples whose metric flag is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyPolicy {
    /// Keep flagged samples, tagged so they can be drawn differently.
    #[default]
    Include,
    /// Drop flagged samples.
    Exclude,
}

/// Inclusive date bounds. Open ends match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

/// The location-level part of a filter: test type and sample count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationFilter {
    pub test_types: TestTypeFilter,
    pub min_sample_count: u32,
}

impl LocationFilter {
    /// `sample_count` is the load-time constant, not a recount under filters.
    pub fn admits_count(&self, location: &Location) -> bool {
        location.sample_count >= self.min_sample_count
    }

    /// Sample count passes and, when test types are selected, at least one
    /// sample at the location matches them.
    pub fn admits(&self, store: &SampleStore, location: &Location) -> bool {
        self.admits_count(location)
            && (self.test_types.is_empty()
                || store
                    .samples_at(&location.id)
                    .any(|s| self.test_types.matches(s.test_type.as_deref())))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub test_types: TestTypeFilter,
    pub min_sample_count: u32,
    pub date_range: DateRange,
    /// Metric whose flag column drives the anomaly policy. Without one every
    /// row counts as non-anomalous.
    pub metric: Option<MetricId>,
    pub anomaly_policy: AnomalyPolicy,
}

impl FilterSpec {
    pub fn location_filter(&self) -> LocationFilter {
        LocationFilter {
            test_types: self.test_types.clone(),
            min_sample_count: self.min_sample_count,
        }
    }
}

/// A sample that survived filtering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilteredRow<'a> {
    pub sample: &'a Sample,
    pub anomalous: bool,
}

/// Borrowed view over the rows a [`FilterSpec`] admits, in table order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection<'a> {
    rows: Vec<FilteredRow<'a>>,
}

impl<'a> Selection<'a> {
    pub fn rows(&self) -> &[FilteredRow<'a>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = &'a Sample> + '_ {
        self.rows.iter().map(|r| r.sample)
    }

    pub fn anomalies(&self) -> impl Iterator<Item = &'a Sample> + '_ {
        self.rows.iter().filter(|r| r.anomalous).map(|r| r.sample)
    }
}

/// Filter an arbitrary run of samples from `store`.
pub fn filter_rows<'a, I>(
    store: &'a SampleStore,
    rows: I,
    spec: &FilterSpec,
) -> Vec<FilteredRow<'a>>
where
    I: IntoIterator<Item = &'a Sample>,
{
    rows.into_iter()
        .filter(|s| spec.test_types.matches(s.test_type.as_deref()))
        .filter(|s| {
            spec.min_sample_count == 0
                || store
                    .location(&s.location_id)
                    .is_some_and(|l| l.sample_count >= spec.min_sample_count)
        })
        .filter(|s| spec.date_range.contains(s.date()))
        .filter_map(|sample| {
            let anomalous = spec.metric.is_some_and(|m| sample.is_flagged(m));
            match (anomalous, spec.anomaly_policy) {
                (true, AnomalyPolicy::Exclude) => None,
                _ => Some(FilteredRow { sample, anomalous }),
            }
        })
        .collect()
}

/// Apply `spec` to the whole table. An empty result is `NoData`.
pub fn apply<'a>(store: &'a SampleStore, spec: &FilterSpec) -> View<Selection<'a>> {
    let rows = filter_rows(store, store.samples(), spec);
    log::debug!("[WQE] filter: {} of {} rows selected", rows.len(), store.samples().len());
    if rows.is_empty() {
        View::NoData
    } else {
        View::Data(Selection { rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
Location_ID,Location_Name,Sample_Count,Test_Type,Date,pH (phunits),pH (phunits)_flagged
L1,Mill Brook,40,River,2021-01-05,7.1,False
L1,Mill Brook,40,\"River, Groundwater\",2021-02-05,7.3,True
L2,Old Pond,5,Lake,2021-03-05,8.0,False
L3,Deep Well,60,Groundwater,2022-06-01,6.9,True
L3,Deep Well,60,Groundwater,2022-07-01,,False
";

    fn store() -> SampleStore {
        SampleStore::load_csv(CSV, &["pH (phunits)"]).unwrap()
    }

    fn selected(view: View<Selection<'_>>) -> Vec<(String, bool)> {
        view.data()
            .map(|s| {
                s.rows()
                    .iter()
                    .map(|r| (r.sample.location_id.clone(), r.anomalous))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn empty_spec_returns_whole_table() {
        let store = store();
        let view = apply(&store, &FilterSpec::default());
        assert_eq!(view.data().map(|s| s.len()), Some(store.samples().len()));
    }

    #[test]
    fn test_type_uses_word_boundaries() {
        let store = store();
        let spec = FilterSpec {
            test_types: TestTypeFilter::new(["groundwater"]),
            ..Default::default()
        };
        let rows = selected(apply(&store, &spec));
        let ids: Vec<&str> = rows.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["L1", "L3", "L3"]);
    }

    #[test]
    fn min_sample_count_uses_location_constant() {
        let store = store();
        let spec = FilterSpec {
            min_sample_count: 10,
            ..Default::default()
        };
        let rows = selected(apply(&store, &spec));
        assert!(rows.iter().all(|(id, _)| id != "L2"));
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn exclude_policy_drops_exactly_the_flagged_rows() {
        let store = store();
        let ph = store.metric_id("pH (phunits)").unwrap();
        let include = FilterSpec {
            metric: Some(ph),
            ..Default::default()
        };
        let exclude = FilterSpec {
            anomaly_policy: AnomalyPolicy::Exclude,
            ..include.clone()
        };

        let all = selected(apply(&store, &include));
        let flagged = all.iter().filter(|(_, a)| *a).count();
        assert_eq!(flagged, 2);
        let kept = selected(apply(&store, &exclude));
        assert_eq!(kept.len(), all.len() - flagged);
        assert!(kept.iter().all(|(_, a)| !a));
    }

    #[test]
    fn date_range_is_inclusive() {
        let store = store();
        let spec = FilterSpec {
            date_range: DateRange::new(
                NaiveDate::from_ymd_opt(2021, 2, 5),
                NaiveDate::from_ymd_opt(2021, 3, 5),
            ),
            ..Default::default()
        };
        let rows = selected(apply(&store, &spec));
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn location_filter_needs_a_matching_sample() {
        let store = store();
        let filter = LocationFilter {
            test_types: TestTypeFilter::new(["groundwater"]),
            min_sample_count: 0,
        };
        let admitted: Vec<&str> = store
            .locations()
            .iter()
            .filter(|l| filter.admits(&store, l))
            .map(|l| l.id.as_str())
            .collect();
        assert_eq!(admitted, ["L1", "L3"]);

        let by_count = LocationFilter {
            min_sample_count: 50,
            ..filter
        };
        let l1 = store.location("L1").unwrap();
        assert!(!by_count.admits(&store, l1));
    }

    #[test]
    fn empty_result_is_no_data() {
        let store = store();
        let spec = FilterSpec {
            test_types: TestTypeFilter::new(["estuary"]),
            ..Default::default()
        };
        assert_eq!(apply(&store, &spec), View::NoData);
    }
}
