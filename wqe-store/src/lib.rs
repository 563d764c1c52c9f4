//! Immutable in-memory sample table for water-quality exploration.
//!
//! The table is loaded once at startup from the upstream CSV export and is
//! never mutated afterwards. Consumers read it through a shared
//! `Arc<SampleStore>`; anything derived per request (filtered subsets,
//! aggregates, smoothed curves) lives in private values owned by the caller.
//!
//! # Usage
//!
//! ```rust
//! use wqe_store::SampleStore;
//!
//! let csv = "Location_ID,Location_Name,Latitude,Longitude,Sample_Count,Test_Type,Date,pH (phunits)\n\
//!            L1,Mill Brook,51.5,-0.12,2,River,2021-03-04,7.2\n";
//! let store = SampleStore::load_csv(csv, &["pH (phunits)"]).unwrap();
//! assert_eq!(store.locations().len(), 1);
//! let ph = store.metric_id("pH (phunits)").unwrap();
//! assert_eq!(store.samples()[0].value(ph), Some(7.2));
//! ```

pub mod error;
mod loader;
pub mod location;
pub mod sample;
pub mod schema;
pub mod test_type;

pub use error::StoreError;
pub use location::{GeoPoint, Location, ShapeLabel, ShapeLabels};
pub use sample::Sample;
pub use schema::{MetricColumns, MetricId, MetricSchema, ShapeKind};
pub use test_type::TestTypeFilter;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

static GLOBAL_STORE: OnceLock<Arc<SampleStore>> = OnceLock::new();

/// Install the process-wide sample table and return the shared handle.
/// Succeeds once per process.
pub fn install(store: SampleStore) -> anyhow::Result<Arc<SampleStore>> {
    let store = Arc::new(store);
    GLOBAL_STORE
        .set(Arc::clone(&store))
        .map_err(|_| StoreError::AlreadyInstalled)?;
    Ok(store)
}

/// Samples plus the per-location aggregate table computed at load time.
#[derive(Debug)]
pub struct SampleStore {
    samples: Vec<Sample>,
    locations: Vec<Location>,
    location_index: HashMap<String, usize>,
    location_rows: Vec<Vec<usize>>,
    schema: MetricSchema,
    test_type_vocabulary: Vec<String>,
    years: Vec<i32>,
    months: Vec<u32>,
}

impl SampleStore {
    /// All samples in source-table order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// All locations, ordered by id.
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn location(&self, id: &str) -> Option<&Location> {
        self.location_index.get(id).map(|&i| &self.locations[i])
    }

    /// Samples taken at one location, in table order. Unknown ids yield nothing.
    pub fn samples_at<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a Sample> + 'a {
        let rows: &'a [usize] = self
            .location_index
            .get(id)
            .map(|&i| self.location_rows[i].as_slice())
            .unwrap_or(&[]);
        rows.iter().map(move |&r| &self.samples[r])
    }

    pub fn schema(&self) -> &MetricSchema {
        &self.schema
    }

    pub fn metric_id(&self, name: &str) -> Option<MetricId> {
        self.schema.metric(name).map(|m| m.id)
    }

    /// Normalized test-type tokens, most frequent first.
    pub fn test_type_vocabulary(&self) -> &[String] {
        &self.test_type_vocabulary
    }

    /// Distinct calendar years in the full table, ascending.
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    /// Distinct calendar months (1-12) in the full table, ascending.
    pub fn months(&self) -> &[u32] {
        &self.months
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
Location_ID,Location_Name,Date,pH (phunits)
L1,Mill Brook,2021-03-04,7.2
L2,Old Pond,2021-03-05,8.0
L1,Mill Brook,2021-04-04,7.4
";

    #[test]
    fn samples_at_returns_rows_for_location() {
        let store = SampleStore::load_csv(CSV, &["pH (phunits)"]).unwrap();
        let ph = store.metric_id("pH (phunits)").unwrap();
        let values: Vec<f64> = store.samples_at("L1").filter_map(|s| s.value(ph)).collect();
        assert_eq!(values, vec![7.2, 7.4]);
        assert_eq!(store.samples_at("NOPE").count(), 0);
    }

    #[test]
    fn location_lookup() {
        let store = SampleStore::load_csv(CSV, &["pH (phunits)"]).unwrap();
        assert_eq!(store.location("L2").map(|l| l.name.as_str()), Some("Old Pond"));
        assert!(store.location("L3").is_none());
        assert!(store.metric_id("Nitrate as N (mg/l)").is_none());
    }

    #[test]
    fn global_store_installs_once() {
        let store = SampleStore::load_csv(CSV, &["pH (phunits)"]).unwrap();
        let installed = install(store).unwrap();
        assert_eq!(installed.samples().len(), 3);

        let again = SampleStore::load_csv(CSV, &["pH (phunits)"]).unwrap();
        assert!(install(again).is_err());
    }
}
