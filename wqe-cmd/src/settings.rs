//! Deployment settings.
//!
//! Every field has a default, so a settings file only needs the keys it
//! changes:
//!
//! ```json
//! { "nearest_k": 8, "metrics": ["pH (phunits)", "Nitrate as N (mg/l)"] }
//! ```

use serde::Deserialize;
use std::path::Path;
use wqe_data::{color_scale, geo, playback, smooth};
use wqe_store::schema::DEFAULT_METRICS;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub smoothing_frac: f64,
    pub nearest_k: usize,
    pub tick_interval_ms: u64,
    pub color_low_quantile: f64,
    pub color_high_quantile: f64,
    pub color_ticks: usize,
    /// Metric columns to load; empty loads every non-base column.
    pub metrics: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            smoothing_frac: smooth::SMOOTHING_FRAC,
            nearest_k: geo::DEFAULT_NEAREST,
            tick_interval_ms: playback::DEFAULT_TICK_INTERVAL_MS,
            color_low_quantile: color_scale::LOW_QUANTILE,
            color_high_quantile: color_scale::HIGH_QUANTILE,
            color_ticks: color_scale::DEFAULT_TICKS,
            metrics: DEFAULT_METRICS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let json = std::fs::read_to_string(p).map_err(|e| {
                    anyhow::anyhow!("Failed to read settings {}: {}", p.display(), e)
                })?;
                log::info!("[WQE] settings: loaded {}", p.display());
                Self::from_json(&json)
            }
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !(self.smoothing_frac > 0.0 && self.smoothing_frac <= 1.0) {
            anyhow::bail!("smoothing_frac must be in (0, 1], got {}", self.smoothing_frac);
        }
        if !(0.0..=1.0).contains(&self.color_low_quantile)
            || !(0.0..=1.0).contains(&self.color_high_quantile)
            || self.color_low_quantile > self.color_high_quantile
        {
            anyhow::bail!(
                "color quantiles must satisfy 0 <= low <= high <= 1, got {} and {}",
                self.color_low_quantile,
                self.color_high_quantile
            );
        }
        if self.tick_interval_ms == 0 {
            anyhow::bail!("tick_interval_ms must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_engine_constants() {
        let s = Settings::default();
        assert_eq!(s.smoothing_frac, 0.5);
        assert_eq!(s.nearest_k, 5);
        assert_eq!(s.tick_interval_ms, 3000);
        assert_eq!(s.color_ticks, 10);
        assert_eq!(s.metrics.len(), 14);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let s = Settings::from_json(r#"{"nearest_k": 8, "metrics": ["pH (phunits)"]}"#).unwrap();
        assert_eq!(s.nearest_k, 8);
        assert_eq!(s.metrics, ["pH (phunits)"]);
        assert_eq!(s.tick_interval_ms, 3000);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(Settings::from_json(r#"{"smoothing_frac": 0.0}"#).is_err());
        let inverted = r#"{"color_low_quantile": 0.9, "color_high_quantile": 0.1}"#;
        assert!(Settings::from_json(inverted).is_err());
        assert!(Settings::from_json(r#"{"tick_interval_ms": 0}"#).is_err());
        assert!(Settings::from_json("not json").is_err());
    }
}
