//! Planner configuration surface
//!
//! Every tunable recognized by the construction engine, retrieval engine
//! and persistence layer, as one typed record with explicit defaults.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::PlanningError;

/// Configuration for roadmap construction, retrieval and persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Where the roadmap container file is loaded from / saved to
    pub file_path: PathBuf,

    /// Allow the database to be written back to disk
    pub saving_enabled: bool,

    /// Vertex visibility region, as a fraction of the space's maximum extent
    pub sparse_delta_fraction: f64,

    /// Witness sampling radius for the quality criterion, as a fraction of
    /// the maximum extent. Must be smaller than `sparse_delta_fraction`.
    pub dense_delta_fraction: f64,

    /// Spanner stretch factor; 0 derives it from the discretization
    pub stretch_factor: f64,

    /// Witness count multiplier: witnesses drawn = multiple x dimension
    pub near_sample_points_multiple: f64,

    /// Minimum obstacle clearance required of sampled states
    pub obstacle_clearance: f64,

    /// How far lattice seeds may penetrate the visibility region overlap
    pub discretize_penetration_dist: f64,

    /// Seed the graph with a discretized lattice before random sampling
    pub use_discretized_samples: bool,

    /// Grow the graph with random samples after seeding
    pub use_random_samples: bool,

    /// Consecutive rejections before the quality criterion is enabled
    pub fourth_criteria_after_failures: usize,

    /// Consecutive rejections (quality enabled) before construction stops
    pub terminate_after_failures: usize,

    /// Merge freshly added vertices into near-duplicate neighbors
    pub use_check_remove_close_vertices: bool,

    /// Smooth quality paths with the plain simplifier instead of the
    /// clearance-aware shortcutter
    pub use_original_smoother: bool,

    /// Worker slots reserved for nearest-neighbor queries
    pub num_threads: usize,

    /// Run expensive internal consistency checks; violations are fatal
    pub super_debug: bool,

    /// Per-criterion decision tracing
    pub verbose_criteria: bool,

    /// Quality-path tracing (witnesses, pair points, spanner tests)
    pub verbose_quality: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            file_path: PathBuf::from("waymark_roadmap.db"),
            saving_enabled: true,
            sparse_delta_fraction: 0.25,
            dense_delta_fraction: 0.05,
            stretch_factor: 0.0,
            near_sample_points_multiple: 2.0,
            obstacle_clearance: 0.0,
            discretize_penetration_dist: 0.001,
            use_discretized_samples: true,
            use_random_samples: true,
            fourth_criteria_after_failures: 500,
            terminate_after_failures: 5000,
            use_check_remove_close_vertices: true,
            use_original_smoother: false,
            num_threads: 1,
            super_debug: false,
            verbose_criteria: false,
            verbose_quality: false,
        }
    }
}

impl PlannerConfig {
    /// Rejects parameter combinations the construction engine cannot honor.
    pub fn validate(&self) -> Result<(), PlanningError> {
        if !(self.sparse_delta_fraction > 0.0 && self.sparse_delta_fraction <= 1.0) {
            return Err(PlanningError::InvalidArgument(format!(
                "sparse_delta_fraction must be in (0, 1], got {}",
                self.sparse_delta_fraction
            )));
        }
        if self.dense_delta_fraction <= 0.0 || self.dense_delta_fraction >= self.sparse_delta_fraction {
            return Err(PlanningError::InvalidArgument(format!(
                "dense_delta_fraction must be in (0, sparse_delta_fraction), got {}",
                self.dense_delta_fraction
            )));
        }
        if self.stretch_factor < 0.0 {
            return Err(PlanningError::InvalidArgument(format!(
                "stretch_factor must be non-negative, got {}",
                self.stretch_factor
            )));
        }
        if self.near_sample_points_multiple <= 0.0 {
            return Err(PlanningError::InvalidArgument(
                "near_sample_points_multiple must be positive".into(),
            ));
        }
        if self.num_threads == 0 {
            return Err(PlanningError::InvalidArgument("num_threads must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(PlannerConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_deltas() {
        let config = PlannerConfig {
            sparse_delta_fraction: 0.1,
            dense_delta_fraction: 0.2,
            ..PlannerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_sparse_fraction() {
        let config = PlannerConfig { sparse_delta_fraction: 1.5, ..PlannerConfig::default() };
        assert!(config.validate().is_err());

        let config = PlannerConfig { sparse_delta_fraction: 0.0, ..PlannerConfig::default() };
        assert!(config.validate().is_err());
    }
}
