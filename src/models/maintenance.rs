//! Maintenance policy attached to a module.
//!
//! Per type: a duration and a pair of thresholds on the accumulated
//! `size` of processed operations. The policy only carries the (scaled)
//! data; the encoder does not consume it.

use serde::{Deserialize, Serialize};

use crate::config::{MaintenanceThreshold, ShopConfig};

/// Maintenance types with their durations and size thresholds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaintenancePolicy {
    /// Processing time per maintenance type.
    pub durations: Vec<f64>,
    /// Size thresholds per maintenance type.
    pub thresholds: Vec<MaintenanceThreshold>,
}

impl MaintenancePolicy {
    /// Builds the scaled policy from module settings.
    pub fn from_config(config: &ShopConfig) -> Self {
        Self {
            durations: config
                .maintenance_durations
                .iter()
                .map(|d| d / config.scale)
                .collect(),
            thresholds: config
                .maintenance_thresholds
                .iter()
                .map(|t| MaintenanceThreshold::new(t.start / config.scale, t.end / config.scale))
                .collect(),
        }
    }

    /// Number of maintenance types.
    pub fn type_count(&self) -> usize {
        self.durations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_scales() {
        let policy = MaintenancePolicy::from_config(&ShopConfig::default().with_scale(10.0));
        assert_eq!(policy.type_count(), 3);
        assert_eq!(policy.durations[0], 10_000.0);
        assert_eq!(policy.thresholds[1], MaintenanceThreshold::new(1_900_000.0, 1_000_000.0));
    }
}
