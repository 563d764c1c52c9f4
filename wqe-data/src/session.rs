//! Per-user exploration state.
//!
//! Every session owns its own filters, playback cursor and comparison cache.
//! The only thing sessions share is the immutable sample table.

use std::sync::Arc;
use wqe_store::{Location, MetricId, SampleStore, ShapeKind};
use wqe_utils::links;

use crate::aggregate::Granularity;
use crate::clusters::{self, ShapeStatus};
use crate::color_scale::{self, DEFAULT_TICKS};
use crate::comparison::{Comparison, ComparisonEngine, ComparisonKey};
use crate::filter::{self, FilterSpec, Selection};
use crate::geo::{self, DEFAULT_NEAREST};
use crate::map_frame;
use crate::models::{
    ClusterTable, ColorDomain, LocationDetail, LocationSnapshot, MapFrame, MetricSummaryRow,
    Neighbor,
};
use crate::playback::{PlaybackController, PlaybackMode};
use crate::summary;
use crate::view::{View, ViewError};

pub struct Session {
    store: Arc<SampleStore>,
    pub filter: FilterSpec,
    pub playback: PlaybackController,
    pub nearest_k: usize,
    pub color_ticks: usize,
    comparisons: ComparisonEngine,
}

impl Session {
    pub fn new(store: Arc<SampleStore>) -> Self {
        let playback = PlaybackController::for_store(&store, PlaybackMode::Year);
        Self {
            store,
            filter: FilterSpec::default(),
            playback,
            nearest_k: DEFAULT_NEAREST,
            color_ticks: DEFAULT_TICKS,
            comparisons: ComparisonEngine::new(),
        }
    }

    pub fn with_smoothing_frac(mut self, frac: f64) -> Self {
        self.comparisons = ComparisonEngine::with_frac(frac);
        self
    }

    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    pub fn comparison_engine(&self) -> &ComparisonEngine {
        &self.comparisons
    }

    /// Resolve a metric column name against the loaded schema.
    pub fn resolve_metric(&self, name: &str) -> Result<MetricId, ViewError> {
        self.store
            .metric_id(name)
            .ok_or_else(|| ViewError::MissingColumn(name.to_string()))
    }

    /// Select `name` as the active metric for anomaly handling.
    pub fn select_metric(&mut self, name: &str) -> Result<MetricId, ViewError> {
        let id = self.resolve_metric(name)?;
        self.filter.metric = Some(id);
        Ok(id)
    }

    /// Resolve a `?id=` reference to its location.
    pub fn open_link(&self, search: &str) -> View<&Location> {
        match links::parse_location_id(search) {
            Some(id) => match self.store.location(&id) {
                Some(location) => View::Data(location),
                None => View::NotFound(id),
            },
            None => View::NotFound(search.to_string()),
        }
    }

    pub fn selection(&self) -> View<Selection<'_>> {
        filter::apply(&self.store, &self.filter)
    }

    pub fn map_frame(&self, metric: &str) -> View<MapFrame> {
        match self.resolve_metric(metric) {
            Ok(id) => map_frame::map_frame(
                &self.store,
                id,
                &self.filter.location_filter(),
                self.playback.current(),
                self.color_ticks,
            ),
            Err(e) => e.into(),
        }
    }

    pub fn color_domain(&self, metric: &str) -> View<ColorDomain> {
        match self.resolve_metric(metric) {
            Ok(id) => color_scale::domain(
                &self.store,
                id,
                self.filter.anomaly_policy,
                &self.filter.test_types,
            ),
            Err(e) => e.into(),
        }
    }

    pub fn location_snapshot(&self, location_id: &str, metric: &str) -> View<LocationSnapshot> {
        let id = match self.resolve_metric(metric) {
            Ok(id) => id,
            Err(e) => return e.into(),
        };
        match self.playback.current() {
            Some(value) => map_frame::location_snapshot(&self.store, location_id, id, value),
            None => View::NoData,
        }
    }

    pub fn nearest(&self, location_id: &str) -> View<Vec<Neighbor>> {
        geo::nearest(&self.store, location_id, self.nearest_k, &self.filter.location_filter())
    }

    pub fn comparison(
        &mut self,
        focal: &str,
        others: &[String],
        metric: &str,
        granularity: Granularity,
    ) -> View<Arc<Comparison>> {
        let id = match self.resolve_metric(metric) {
            Ok(id) => id,
            Err(e) => return e.into(),
        };
        let key = ComparisonKey::new(focal, others, id, granularity, self.filter.anomaly_policy)
            .with_date_range(self.filter.date_range);
        self.comparisons.build_series(&self.store, &key)
    }

    pub fn metric_summary(&self, location_id: &str) -> View<Vec<MetricSummaryRow>> {
        summary::metric_summary(&self.store, location_id)
    }

    pub fn location_detail(&self, location_id: &str) -> View<LocationDetail> {
        summary::location_detail(&self.store, location_id)
    }

    pub fn shape_status(
        &self,
        location_id: &str,
        metric: &str,
        kind: ShapeKind,
    ) -> View<ShapeStatus> {
        match self.resolve_metric(metric) {
            Ok(id) => clusters::shape_status(&self.store, location_id, id, kind),
            Err(e) => e.into(),
        }
    }

    pub fn cluster_distribution(
        &self,
        location_id: &str,
        metric: &str,
        kind: ShapeKind,
    ) -> View<ClusterTable> {
        match self.resolve_metric(metric) {
            Ok(id) => clusters::cluster_distribution(&self.store, location_id, id, kind),
            Err(e) => e.into(),
        }
    }
}
