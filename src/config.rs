//! Tracker configuration: one explicit struct, validated exactly once at the
//! orchestration boundary and then passed by reference into every component.

use crate::error::TrackingError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for the two-stage sparse LAP tracker.
///
/// Distances are in the same physical units as object positions; each
/// `*_max_distance` is squared internally to gate squared-distance costs.
/// Feature penalty maps associate a feature name with a weight; an empty map
/// selects the plain squared-distance cost function.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Maximum distance for frame-to-frame linking.
    pub max_linking_distance: f64,
    /// Feature penalties applied during frame-to-frame linking.
    pub linking_feature_penalties: HashMap<String, f64>,

    /// Enable the gap-closing family of the segment stage.
    pub allow_gap_closing: bool,
    /// Largest frame gap bridged by gap closing (1 = consecutive frames).
    pub max_frame_gap: u32,
    /// Maximum distance for gap closing.
    pub gap_closing_max_distance: f64,
    /// Feature penalties applied to gap-closing costs.
    pub gap_closing_feature_penalties: HashMap<String, f64>,

    /// Enable the merging family (segment end → segment middle).
    pub allow_merging: bool,
    /// Maximum distance for merging.
    pub merging_max_distance: f64,
    /// Feature penalties applied to merging costs.
    pub merging_feature_penalties: HashMap<String, f64>,

    /// Enable the splitting family (segment middle → segment start).
    pub allow_splitting: bool,
    /// Maximum distance for splitting.
    pub splitting_max_distance: f64,
    /// Feature penalties applied to splitting costs.
    pub splitting_feature_penalties: HashMap<String, f64>,

    /// Factor applied to the cost percentile to obtain the alternative
    /// (no-link) cost. Must be > 1.
    pub alternative_cost_factor: f64,
    /// Percentile of accepted costs used for the segment-stage alternative
    /// cost, in [0, 1].
    pub cutoff_percentile: f64,

    /// Worker threads for the parallel stages. 0 = host CPU count.
    pub num_threads: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_linking_distance: 15.0,
            linking_feature_penalties: HashMap::new(),
            allow_gap_closing: true,
            max_frame_gap: 2,
            gap_closing_max_distance: 15.0,
            gap_closing_feature_penalties: HashMap::new(),
            allow_merging: false,
            merging_max_distance: 15.0,
            merging_feature_penalties: HashMap::new(),
            allow_splitting: false,
            splitting_max_distance: 15.0,
            splitting_feature_penalties: HashMap::new(),
            alternative_cost_factor: 1.05,
            cutoff_percentile: 0.9,
            num_threads: 0,
        }
    }
}

impl TrackerConfig {
    /// Validate every recognized option. Returns the first violation; no
    /// computation may start before this passes.
    pub fn validate(&self) -> Result<(), TrackingError> {
        check_distance("max_linking_distance", self.max_linking_distance)?;
        check_penalties("linking_feature_penalties", &self.linking_feature_penalties)?;

        if self.allow_gap_closing {
            if self.max_frame_gap < 1 {
                return Err(TrackingError::Configuration {
                    field: "max_frame_gap",
                    message: "must be at least 1 when gap closing is enabled".to_string(),
                });
            }
            check_distance("gap_closing_max_distance", self.gap_closing_max_distance)?;
        }
        check_penalties(
            "gap_closing_feature_penalties",
            &self.gap_closing_feature_penalties,
        )?;

        if self.allow_merging {
            check_distance("merging_max_distance", self.merging_max_distance)?;
        }
        check_penalties("merging_feature_penalties", &self.merging_feature_penalties)?;

        if self.allow_splitting {
            check_distance("splitting_max_distance", self.splitting_max_distance)?;
        }
        check_penalties(
            "splitting_feature_penalties",
            &self.splitting_feature_penalties,
        )?;

        if !self.alternative_cost_factor.is_finite() || self.alternative_cost_factor <= 1.0 {
            return Err(TrackingError::Configuration {
                field: "alternative_cost_factor",
                message: format!(
                    "must be finite and greater than 1, was {}",
                    self.alternative_cost_factor
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.cutoff_percentile) {
            return Err(TrackingError::Configuration {
                field: "cutoff_percentile",
                message: format!("must be in [0, 1], was {}", self.cutoff_percentile),
            });
        }
        Ok(())
    }

    /// True if any family of the segment stage is enabled.
    pub fn segment_stage_enabled(&self) -> bool {
        self.allow_gap_closing || self.allow_merging || self.allow_splitting
    }
}

fn check_distance(field: &'static str, value: f64) -> Result<(), TrackingError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(TrackingError::Configuration {
            field,
            message: format!("must be finite and positive, was {value}"),
        });
    }
    Ok(())
}

fn check_penalties(
    field: &'static str,
    penalties: &HashMap<String, f64>,
) -> Result<(), TrackingError> {
    for (name, weight) in penalties {
        if !weight.is_finite() {
            return Err(TrackingError::Configuration {
                field,
                message: format!("penalty weight for feature '{name}' must be finite"),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
