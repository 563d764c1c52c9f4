//! Temporal bucketing of samples into per-metric mean series.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wqe_store::{MetricId, Sample};
use wqe_utils::dates;

/// How samples are grouped in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// No bucketing: one bucket per distinct timestamp.
    #[default]
    Raw,
    /// Calendar month of year, folded across years.
    Month,
    Year,
}

/// Aggregation key derived from a sample's timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Bucket {
    Timestamp(NaiveDateTime),
    Month(u32),
    Year(i32),
}

impl Bucket {
    pub fn of(sample: &Sample, granularity: Granularity) -> Bucket {
        match granularity {
            Granularity::Raw => Bucket::Timestamp(sample.timestamp),
            Granularity::Month => Bucket::Month(sample.month),
            Granularity::Year => Bucket::Year(sample.year),
        }
    }

    /// Numeric x-coordinate used for smoothing. Timestamps become day ordinals.
    pub fn ordinal(&self) -> f64 {
        match self {
            Bucket::Timestamp(ts) => dates::to_ordinal(&ts.date()) as f64,
            Bucket::Month(m) => *m as f64,
            Bucket::Year(y) => *y as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub bucket: Bucket,
    pub value: f64,
}

/// Bucketed means, keys strictly ascending and unique.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Series {
    points: Vec<SeriesPoint>,
}

impl Series {
    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<SeriesPoint> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Group `rows` by `granularity` and average `metric` within each bucket.
///
/// Rows without a value for `metric` join neither the mean nor the bucket
/// set, so a bucket whose rows are all missing does not appear.
pub fn aggregate<'a, I>(rows: I, metric: MetricId, granularity: Granularity) -> Series
where
    I: IntoIterator<Item = &'a Sample>,
{
    let mut sums: BTreeMap<Bucket, (f64, u32)> = BTreeMap::new();
    for sample in rows {
        if let Some(value) = sample.value(metric) {
            let entry = sums.entry(Bucket::of(sample, granularity)).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }
    let points = sums
        .into_iter()
        .map(|(bucket, (sum, n))| SeriesPoint {
            bucket,
            value: sum / n as f64,
        })
        .collect();
    Series { points }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use wqe_store::SampleStore;

    const CSV: &str = "\
Location_ID,Date,pH (phunits)
L1,2021-03-01,1.0
L1,2021-03-02,
L1,2021-03-03,3.0
L1,2022-03-15,5.0
L1,2022-01-15,2.0
";

    fn store() -> SampleStore {
        SampleStore::load_csv(CSV, &["pH (phunits)"]).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> Bucket {
        let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        Bucket::Timestamp(date.and_hms_opt(0, 0, 0).unwrap())
    }

    #[test]
    fn raw_skips_missing_values() {
        let store = store();
        let ph = store.metric_id("pH (phunits)").unwrap();
        let series = aggregate(store.samples().iter().take(3), ph, Granularity::Raw);
        assert_eq!(
            series.points(),
            [
                SeriesPoint { bucket: day(2021, 3, 1), value: 1.0 },
                SeriesPoint { bucket: day(2021, 3, 3), value: 3.0 },
            ]
        );
    }

    #[test]
    fn month_folds_across_years() {
        let store = store();
        let ph = store.metric_id("pH (phunits)").unwrap();
        let series = aggregate(store.samples(), ph, Granularity::Month);
        let buckets: Vec<Bucket> = series.points().iter().map(|p| p.bucket).collect();
        assert_eq!(buckets, [Bucket::Month(1), Bucket::Month(3)]);
        assert_relative_eq!(series.points()[1].value, 3.0);
    }

    #[test]
    fn year_keys_ascend() {
        let store = store();
        let ph = store.metric_id("pH (phunits)").unwrap();
        let series = aggregate(store.samples(), ph, Granularity::Year);
        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[0].bucket, Bucket::Year(2021));
        assert_relative_eq!(series.points()[0].value, 2.0);
        assert_relative_eq!(series.points()[1].value, 3.5);
        assert!(series.points().windows(2).all(|w| w[0].bucket < w[1].bucket));
    }

    #[test]
    fn empty_input_gives_empty_series() {
        let store = store();
        let ph = store.metric_id("pH (phunits)").unwrap();
        assert!(aggregate(std::iter::empty(), ph, Granularity::Year).is_empty());
    }

    #[test]
    fn bucket_ordinals() {
        assert_eq!(day(2021, 3, 3).ordinal() + 1.0, day(2021, 3, 4).ordinal());
        assert_eq!(Bucket::Year(2021).ordinal(), 2021.0);
        assert_eq!(Bucket::Month(7).ordinal(), 7.0);
    }
}
