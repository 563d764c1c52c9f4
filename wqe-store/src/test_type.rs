//! Test-type normalization and matching.
//!
//! `Test_Type` is free text such as `"River, Groundwater"`. Matching is done on
//! whole words, case-insensitively, so that selecting `river` matches
//! `"River, Groundwater"` but not `"Riverbank"`.

use regex::Regex;
use std::collections::BTreeSet;

/// Lower-case and trim a raw test-type field.
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Split a raw comma-joined test-type field into normalized tokens.
pub fn tokens(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(',')
        .map(normalize)
        .filter(|token| !token.is_empty())
}

/// A set of selected test types, compiled into a word-boundary pattern.
///
/// An empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct TestTypeFilter {
    selected: BTreeSet<String>,
    pattern: Option<Regex>,
}

impl TestTypeFilter {
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let selected: BTreeSet<String> = types
            .into_iter()
            .map(|t| normalize(t.as_ref()))
            .filter(|t| !t.is_empty())
            .collect();
        let pattern = if selected.is_empty() {
            None
        } else {
            let alternatives = selected
                .iter()
                .map(|t| regex::escape(t))
                .collect::<Vec<_>>()
                .join("|");
            match Regex::new(&format!(r"(?i)\b(?:{})\b", alternatives)) {
                Ok(re) => Some(re),
                Err(e) => {
                    log::warn!("[WQE] test_type: pattern build failed ({}), using token match", e);
                    None
                }
            }
        };
        Self { selected, pattern }
    }

    /// Filter that accepts every row.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    /// Whether a raw test-type field matches any selected type.
    ///
    /// A missing field never matches a non-empty filter.
    pub fn matches(&self, field: Option<&str>) -> bool {
        if self.selected.is_empty() {
            return true;
        }
        let Some(field) = field else {
            return false;
        };
        match &self.pattern {
            Some(re) => re.is_match(field),
            None => tokens(field).any(|t| self.selected.contains(&t)),
        }
    }
}

impl PartialEq for TestTypeFilter {
    fn eq(&self, other: &Self) -> bool {
        self.selected == other.selected
    }
}

impl Eq for TestTypeFilter {}
