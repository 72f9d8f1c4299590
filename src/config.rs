//! Configuration for module construction and pipeline runs.
//!
//! Scaling constants and maintenance defaults are plain values passed to
//! [`crate::models::Flowshop::new`]; run settings load from TOML.
//!
//! # Examples
//!
//! ```
//! use u_flowline::config::RunConfig;
//! use std::time::Duration;
//!
//! let config = RunConfig::from_toml_str(r#"
//!     time_limit_secs = 30
//!     export = true
//!
//!     [shop]
//!     scale = 10.0
//! "#).unwrap();
//!
//! assert_eq!(config.solver_config().time_limit, Duration::from_secs(30));
//! assert_eq!(config.shop.scale, 10.0);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cp::SolverConfig;
use crate::error::{Error, Result};

/// Size thresholds of one maintenance type, as declared (`s`, `e`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceThreshold {
    pub start: f64,
    pub end: f64,
}

impl MaintenanceThreshold {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }
}

/// Per-module construction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopConfig {
    /// Divisor applied to scaled quantities (maintenance values and
    /// independent due dates).
    pub scale: f64,
    /// Processing time of each maintenance type, unscaled.
    pub maintenance_durations: Vec<f64>,
    /// Size thresholds of each maintenance type, unscaled.
    pub maintenance_thresholds: Vec<MaintenanceThreshold>,
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            maintenance_durations: vec![100_000.0, 200_000.0, 300_000.0],
            maintenance_thresholds: vec![
                MaintenanceThreshold::new(1_000_000.0, 500_000.0),
                MaintenanceThreshold::new(19_000_000.0, 10_000_000.0),
                MaintenanceThreshold::new(40_000_000.0, 20_000_000.0),
            ],
        }
    }
}

impl ShopConfig {
    /// Sets the scale factor.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Divides `value` by the scale factor, truncating toward zero.
    pub fn scale_delay(&self, value: i64) -> i64 {
        (value as f64 / self.scale) as i64
    }
}

/// Settings of one load-encode-solve-report run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Solver time budget in seconds.
    pub time_limit_secs: u64,
    /// Solver workers. Kept at 1 for reproducible results.
    pub workers: usize,
    /// Whether to export the encoded model next to the result.
    pub export: bool,
    /// Module construction settings.
    pub shop: ShopConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            time_limit_secs: 600,
            workers: 1,
            export: false,
            shop: ShopConfig::default(),
        }
    }
}

impl RunConfig {
    /// Loads a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses a configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Sets the time limit.
    pub fn with_time_limit_secs(mut self, secs: u64) -> Self {
        self.time_limit_secs = secs;
        self
    }

    /// Solver settings derived from this run configuration.
    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            time_limit: Duration::from_secs(self.time_limit_secs),
            workers: self.workers,
        }
    }
}
