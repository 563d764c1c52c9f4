//! Query engine over the water-quality sample table.
//!
//! Filtering, temporal aggregation, LOWESS trend smoothing, the playback
//! cursor, proximity ranking, multi-location comparisons and the map color
//! scale. Every operation reads the shared [`wqe_store::SampleStore`] and
//! returns a private, render-ready [`View`].

pub mod aggregate;
pub mod clusters;
pub mod color_scale;
pub mod comparison;
pub mod filter;
pub mod geo;
pub mod map_frame;
pub mod models;
pub mod playback;
pub mod session;
pub mod smooth;
pub mod summary;
#[cfg(feature = "ticker")]
pub mod ticker;
pub mod view;

pub use aggregate::{aggregate, Bucket, Granularity, Series, SeriesPoint};
pub use clusters::ShapeStatus;
pub use comparison::{Comparison, ComparisonEngine, ComparisonKey, Layers};
pub use filter::{AnomalyPolicy, DateRange, FilterSpec, FilteredRow, LocationFilter, Selection};
pub use models::*;
pub use playback::{
    CursorState, PlaybackController, PlaybackEvent, PlaybackMode, TimeAxis, TimeValue,
};
pub use session::Session;
pub use view::{guard_view, View, ViewError};
