//! CSV loading for the sample table.
//!
//! The table is read once; location aggregates, the test-type vocabulary
//! and the playback axes are all derived in the same pass and frozen with
//! the samples. Locations are ordered by id.
//!
//! # CSV Format
//!
//! Headers are required. `Location_ID` and `Date` are mandatory; see
//! [`crate::schema`] for the optional columns.
//!
//! ```text
//! Location_ID,Location_Name,Latitude,Longitude,Sample_Count,Test_Type,Date,pH (phunits),pH (phunits)_flagged
//! L1,Mill Brook,51.50,-0.12,120,River,2021-03-04,7.2,False
//! ```

use crate::location::{GeoPoint, Location, ShapeLabel, ShapeLabels};
use crate::sample::{parse_flag, parse_value, Sample};
use crate::schema::{MetricSchema, ShapeKind};
use crate::test_type;
use crate::SampleStore;
use chrono::Datelike;
use csv::StringRecord;
use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;

/// Per-location accumulator used while rows stream in.
struct LocationBuilder {
    id: String,
    name: Option<String>,
    position: Option<GeoPoint>,
    sample_count: Option<u32>,
    rows: Vec<usize>,
    test_types: BTreeSet<String>,
    shapes: Vec<ShapeLabels>,
}

impl LocationBuilder {
    fn new(id: &str, metric_count: usize) -> Self {
        Self {
            id: id.to_string(),
            name: None,
            position: None,
            sample_count: None,
            rows: Vec::new(),
            test_types: BTreeSet::new(),
            shapes: vec![ShapeLabels::default(); metric_count],
        }
    }

    fn build(self) -> (Location, Vec<usize>) {
        let sample_count = self
            .sample_count
            .unwrap_or(self.rows.len() as u32);
        let location = Location {
            name: self.name.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            position: self.position,
            sample_count,
            test_types: self.test_types.into_iter().collect::<Vec<_>>().join(", "),
            shapes: self.shapes,
        };
        (location, self.rows)
    }
}

/// Token frequencies, remembering first appearance for stable tie-breaks.
#[derive(Default)]
struct Vocabulary {
    counts: Vec<(String, usize)>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    fn add(&mut self, token: String) {
        match self.index.get(&token) {
            Some(&i) => self.counts[i].1 += 1,
            None => {
                self.index.insert(token.clone(), self.counts.len());
                self.counts.push((token, 1));
            }
        }
    }

    fn most_common(mut self) -> Vec<String> {
        // stable: equal counts keep first-seen order
        self.counts.sort_by(|a, b| b.1.cmp(&a.1));
        self.counts.into_iter().map(|(t, _)| t).collect()
    }
}

fn cell<'r>(record: &'r StringRecord, col: Option<usize>) -> Option<&'r str> {
    col.and_then(|c| record.get(c))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_count(cell: &str) -> Option<u32> {
    cell.parse::<u32>().ok().or_else(|| {
        cell.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v as u32)
    })
}

impl SampleStore {
    /// Load the sample table from a CSV string.
    ///
    /// `metrics` lists the tracked metric columns; pass an empty slice to
    /// treat every non-base column as a metric. Rows with a blank
    /// `Location_ID` or an unparseable `Date` are skipped.
    pub fn load_csv<S: AsRef<str>>(csv_data: &str, metrics: &[S]) -> anyhow::Result<Self> {
        Self::load_reader(csv_data.as_bytes(), metrics)
    }

    /// Load the sample table from a CSV file on disk.
    pub fn load_path<S: AsRef<str>>(path: impl AsRef<Path>, metrics: &[S]) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        log::info!("[WQE] loader: reading {}", path.as_ref().display());
        Self::load_reader(file, metrics)
    }

    pub fn load_reader<R: Read, S: AsRef<str>>(reader: R, metrics: &[S]) -> anyhow::Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let schema = MetricSchema::resolve(rdr.headers()?, metrics)?;
        let metric_count = schema.metrics().len();
        let base = schema.base.clone();

        let mut samples: Vec<Sample> = Vec::new();
        let mut builders: Vec<LocationBuilder> = Vec::new();
        let mut builder_index: HashMap<String, usize> = HashMap::new();
        let mut vocabulary = Vocabulary::default();
        let mut years = BTreeSet::new();
        let mut months = BTreeSet::new();
        let mut skipped = 0u32;

        for result in rdr.records() {
            let r = result?;
            let Some(location_id) = cell(&r, Some(base.location_id)) else {
                skipped += 1;
                continue;
            };
            let timestamp = match cell(&r, Some(base.date)).map(wqe_utils::dates::parse_timestamp) {
                Some(Ok(ts)) => ts,
                _ => {
                    skipped += 1;
                    continue;
                }
            };

            let test_type = cell(&r, base.test_type).map(str::to_string);
            let values = schema
                .metrics()
                .iter()
                .map(|m| r.get(m.value_col).and_then(parse_value))
                .collect();
            let flags = schema
                .metrics()
                .iter()
                .map(|m| m.flag_col.and_then(|c| r.get(c)).is_some_and(parse_flag))
                .collect();

            let slot = match builder_index.get(location_id) {
                Some(&i) => i,
                None => {
                    builder_index.insert(location_id.to_string(), builders.len());
                    builders.push(LocationBuilder::new(location_id, metric_count));
                    builders.len() - 1
                }
            };
            let builder = &mut builders[slot];
            builder.rows.push(samples.len());
            if builder.name.is_none() {
                builder.name = cell(&r, base.location_name).map(str::to_string);
            }
            if builder.position.is_none() {
                let lat = cell(&r, base.latitude).and_then(parse_value);
                let lon = cell(&r, base.longitude).and_then(parse_value);
                if let (Some(latitude), Some(longitude)) = (lat, lon) {
                    builder.position = Some(GeoPoint { latitude, longitude });
                }
            }
            if builder.sample_count.is_none() {
                builder.sample_count = cell(&r, base.sample_count).and_then(parse_count);
            }
            if let Some(raw) = &test_type {
                builder.test_types.insert(raw.clone());
                for token in test_type::tokens(raw) {
                    vocabulary.add(token);
                }
            }
            for m in schema.metrics() {
                for kind in [ShapeKind::Yearly, ShapeKind::OverTime] {
                    if let Some(label) = cell(&r, m.shape_col(kind)).and_then(ShapeLabel::parse) {
                        builder.shapes[m.id.index()].fill(kind, label);
                    }
                }
            }

            years.insert(timestamp.year());
            months.insert(timestamp.month());
            samples.push(Sample {
                location_id: location_id.to_string(),
                year: timestamp.year(),
                month: timestamp.month(),
                timestamp,
                test_type,
                values,
                flags,
            });
        }

        builders.sort_by(|a, b| a.id.cmp(&b.id));
        let location_index: HashMap<String, usize> =
            builders.iter().enumerate().map(|(i, b)| (b.id.clone(), i)).collect();
        let (locations, location_rows): (Vec<Location>, Vec<Vec<usize>>) =
            builders.into_iter().map(LocationBuilder::build).unzip();

        log::info!(
            "[WQE] loader: Loaded {} samples at {} locations, skipped {} invalid rows",
            samples.len(),
            locations.len(),
            skipped
        );

        Ok(SampleStore {
            samples,
            locations,
            location_index,
            location_rows,
            schema,
            test_type_vocabulary: vocabulary.most_common(),
            years: years.into_iter().collect(),
            months: months.into_iter().collect(),
        })
    }
}
