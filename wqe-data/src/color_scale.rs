//! Quantile-based color domain for map markers.
//!
//! The domain is computed over the whole table (not the current playback
//! frame) so marker colors stay comparable while the animation runs.

use wqe_store::{MetricId, SampleStore, TestTypeFilter};

use crate::filter::AnomalyPolicy;
use crate::models::{ColorDomain, ColorTick};
use crate::view::View;

pub const LOW_QUANTILE: f64 = 0.05;
pub const HIGH_QUANTILE: f64 = 0.95;
pub const DEFAULT_TICKS: usize = 10;

/// Padding applied on each side of a zero-width domain.
const DEGENERATE_PAD: f64 = 0.1;

/// Linearly interpolated quantile of an ascending slice.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

impl ColorDomain {
    /// Widen a zero-width domain so the scale never collapses.
    pub fn new(low: f64, high: f64) -> Self {
        if low == high {
            Self {
                low: low - DEGENERATE_PAD,
                high: high + DEGENERATE_PAD,
            }
        } else {
            Self { low, high }
        }
    }

    /// `count` evenly spaced color-bar ticks from `low` to `high`.
    pub fn ticks(&self, count: usize) -> Vec<ColorTick> {
        let mut ticks: Vec<ColorTick> = match count {
            0 => Vec::new(),
            1 => vec![self.tick(self.low)],
            _ => {
                let step = (self.high - self.low) / (count - 1) as f64;
                (0..count).map(|i| self.tick(self.low + step * i as f64)).collect()
            }
        };
        if let Some(first) = ticks.first_mut() {
            first.label.push_str(" (and below)");
        }
        if count > 1 {
            if let Some(last) = ticks.last_mut() {
                last.label.push_str(" (and above)");
            }
        }
        ticks
    }

    fn tick(&self, value: f64) -> ColorTick {
        ColorTick {
            value,
            label: format!("{:.1}", value),
        }
    }
}

/// 5th/95th percentile domain of `metric` over every row matching the
/// test-type filter. `Exclude` leaves flagged rows out.
pub fn domain(
    store: &SampleStore,
    metric: MetricId,
    policy: AnomalyPolicy,
    test_types: &TestTypeFilter,
) -> View<ColorDomain> {
    domain_with_quantiles(store, metric, policy, test_types, LOW_QUANTILE, HIGH_QUANTILE)
}

pub fn domain_with_quantiles(
    store: &SampleStore,
    metric: MetricId,
    policy: AnomalyPolicy,
    test_types: &TestTypeFilter,
    low_q: f64,
    high_q: f64,
) -> View<ColorDomain> {
    let mut values: Vec<f64> = store
        .samples()
        .iter()
        .filter(|s| test_types.matches(s.test_type.as_deref()))
        .filter(|s| policy == AnomalyPolicy::Include || !s.is_flagged(metric))
        .filter_map(|s| s.value(metric))
        .collect();
    values.sort_by(f64::total_cmp);

    match (quantile(&values, low_q), quantile(&values, high_q)) {
        (Some(low), Some(high)) => View::Data(ColorDomain::new(low, high)),
        _ => View::NoData,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn constant_values_are_widened() {
        let csv = "\
Location_ID,Date,pH (phunits)
L1,2021-01-01,5.0
L1,2021-02-01,5.0
L2,2021-03-01,5.0
";
        let store = SampleStore::load_csv(csv, &["pH (phunits)"]).unwrap();
        let ph = store.metric_id("pH (phunits)").unwrap();
        let d = domain(&store, ph, AnomalyPolicy::Exclude, &TestTypeFilter::any()).data().unwrap();
        assert_relative_eq!(d.low, 4.9);
        assert_relative_eq!(d.high, 5.1);
    }

    #[test]
    fn quantiles_interpolate_linearly() {
        let values: Vec<f64> = (1..=21).map(|v| v as f64).collect();
        assert_relative_eq!(quantile(&values, 0.05).unwrap(), 2.0);
        assert_relative_eq!(quantile(&values, 0.95).unwrap(), 20.0);
        assert_relative_eq!(quantile(&[1.0, 2.0], 0.5).unwrap(), 1.5);
        assert_eq!(quantile(&[], 0.5), None);
    }

    #[test]
    fn flagged_rows_only_count_under_include() {
        let csv = "\
Location_ID,Test_Type,Date,pH (phunits),pH (phunits)_flagged
L1,River,2021-01-01,1.0,False
L1,River,2021-02-01,2.0,False
L1,River,2021-03-01,50.0,True
L2,Lake,2021-03-01,90.0,False
";
        let store = SampleStore::load_csv(csv, &["pH (phunits)"]).unwrap();
        let ph = store.metric_id("pH (phunits)").unwrap();
        let river = TestTypeFilter::new(["river"]);

        let excluded = domain(&store, ph, AnomalyPolicy::Exclude, &river).data().unwrap();
        assert_relative_eq!(excluded.high, 1.95);
        let included = domain(&store, ph, AnomalyPolicy::Include, &river).data().unwrap();
        assert!(included.high > 40.0);

        let estuary = TestTypeFilter::new(["estuary"]);
        assert_eq!(domain(&store, ph, AnomalyPolicy::Exclude, &estuary), View::NoData);
    }

    #[test]
    fn ticks_span_the_domain_with_edge_labels() {
        let ticks = ColorDomain::new(0.0, 9.0).ticks(DEFAULT_TICKS);
        assert_eq!(ticks.len(), 10);
        assert_eq!(ticks[0].label, "0.0 (and below)");
        assert_eq!(ticks[4].label, "4.0");
        assert_eq!(ticks[9].label, "9.0 (and above)");
    }
}
