//! Result envelope shared by every query.
//!
//! A query either produces data, finds nothing to show, or is asked about a
//! location that does not exist. None of these are errors; presentation code
//! renders `NoData` as a placeholder and `NotFound` as a "not found" page.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum View<T> {
    Data(T),
    NoData,
    NotFound(String),
}

impl<T> View<T> {
    pub fn data(self) -> Option<T> {
        match self {
            View::Data(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> View<&T> {
        match self {
            View::Data(t) => View::Data(t),
            View::NoData => View::NoData,
            View::NotFound(id) => View::NotFound(id.clone()),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> View<U> {
        match self {
            View::Data(t) => View::Data(f(t)),
            View::NoData => View::NoData,
            View::NotFound(id) => View::NotFound(id),
        }
    }
}

impl<T> View<Vec<T>> {
    /// Wrap a collection, turning an empty one into `NoData`.
    pub fn from_items(items: Vec<T>) -> Self {
        if items.is_empty() {
            View::NoData
        } else {
            View::Data(items)
        }
    }
}

/// Failures a view computation can hit. All are recoverable.
#[derive(Error, Debug)]
pub enum ViewError {
    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Location not found: {0}")]
    InvalidLocationReference(String),

    #[error("{0}")]
    Computation(String),
}

impl<T> From<ViewError> for View<T> {
    fn from(err: ViewError) -> Self {
        match err {
            ViewError::InvalidLocationReference(id) => View::NotFound(id),
            ViewError::MissingColumn(column) => {
                log::debug!("[WQE] view: column '{}' absent, degrading to no data", column);
                View::NoData
            }
            ViewError::Computation(msg) => {
                log::warn!("[WQE] view: {}", msg);
                View::NoData
            }
        }
    }
}

/// Run one view computation, replacing any failure with `NoData`.
///
/// The failure is logged with the view's name so unrelated views keep
/// rendering.
pub fn guard_view<T>(name: &str, compute: impl FnOnce() -> anyhow::Result<View<T>>) -> View<T> {
    match compute() {
        Ok(view) => view,
        Err(err) => {
            log::warn!("[WQE] view '{}' failed, showing no data: {:#}", name, err);
            View::NoData
        }
    }
}
