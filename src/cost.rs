//! Linking cost functions.
//!
//! A cost is the squared Euclidean distance between two objects, optionally
//! scaled by per-feature penalty factors. The variants form a closed enum so
//! the innermost loop of cost-matrix construction dispatches with a `match`
//! instead of a virtual call.

use crate::types::TrackObject;
use std::collections::HashMap;

/// Cost of linking a source object to a target object.
#[derive(Clone, Debug)]
pub enum CostFunction {
    /// Plain squared Euclidean distance.
    SquareDistance,
    /// Squared distance scaled by feature dissimilarity: for each configured
    /// feature `f` with weight `w`, the factor `1 + w × |va − vb| / (va + vb)`
    /// is accumulated multiplicatively. A negative weight penalizes
    /// similarity instead of difference.
    ///
    /// Penalties are kept sorted by feature name so costs never depend on
    /// hash-map iteration order.
    FeaturePenalty { penalties: Vec<(String, f64)> },
}

impl CostFunction {
    /// Pick the variant for a penalty map: an empty map selects the plain
    /// squared-distance cost.
    pub fn for_penalties(penalties: &HashMap<String, f64>) -> Self {
        if penalties.is_empty() {
            CostFunction::SquareDistance
        } else {
            let mut penalties: Vec<(String, f64)> = penalties
                .iter()
                .map(|(name, &weight)| (name.clone(), weight))
                .collect();
            penalties.sort_by(|a, b| a.0.cmp(&b.0));
            CostFunction::FeaturePenalty { penalties }
        }
    }

    /// Cost of linking `source` to `target`.
    ///
    /// Features missing from either object, or whose ratio is not finite
    /// (both values zero), are skipped. The caller is responsible for
    /// rejecting negative results; with non-negative weights the result is
    /// always ≥ 0.
    pub fn cost(&self, source: &TrackObject, target: &TrackObject) -> f64 {
        let d2 = source.squared_distance_to(target);
        match self {
            CostFunction::SquareDistance => d2,
            CostFunction::FeaturePenalty { penalties } => {
                let mut factor = 1.0;
                for (name, weight) in penalties {
                    let (Some(va), Some(vb)) = (source.feature(name), target.feature(name))
                    else {
                        continue;
                    };
                    let ratio = (va - vb).abs() / (va + vb);
                    if !ratio.is_finite() {
                        continue;
                    }
                    factor *= 1.0 + weight * ratio;
                }
                d2 * factor
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn object_with_feature(x: f64, value: f64) -> TrackObject {
        let mut o = TrackObject::new(0, x, 0.0, 0.0, 1.0);
        o.features.insert("MEAN_INTENSITY".to_string(), value);
        o
    }

    #[test]
    fn square_distance_is_plain_d2() {
        let a = TrackObject::new(0, 0.0, 0.0, 0.0, 1.0);
        let b = TrackObject::new(1, 3.0, 4.0, 0.0, 1.0);
        assert_eq!(CostFunction::SquareDistance.cost(&a, &b), 25.0);
    }

    #[test]
    fn identical_features_add_no_penalty() {
        let a = object_with_feature(0.0, 10.0);
        let b = object_with_feature(2.0, 10.0);
        let mut penalties = HashMap::new();
        penalties.insert("MEAN_INTENSITY".to_string(), 1.0);
        let f = CostFunction::for_penalties(&penalties);
        assert_eq!(f.cost(&a, &b), 4.0, "equal feature values: ratio 0, factor 1");
    }

    #[test]
    fn dissimilar_features_scale_the_cost() {
        let a = object_with_feature(0.0, 30.0);
        let b = object_with_feature(2.0, 10.0);
        let mut penalties = HashMap::new();
        penalties.insert("MEAN_INTENSITY".to_string(), 1.0);
        let f = CostFunction::for_penalties(&penalties);
        // ratio = 20/40 = 0.5, factor = 1.5
        assert!((f.cost(&a, &b) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn missing_feature_is_skipped() {
        let a = object_with_feature(0.0, 30.0);
        let b = TrackObject::new(1, 2.0, 0.0, 0.0, 1.0);
        let mut penalties = HashMap::new();
        penalties.insert("MEAN_INTENSITY".to_string(), 1.0);
        let f = CostFunction::for_penalties(&penalties);
        assert_eq!(f.cost(&a, &b), 4.0);
    }

    #[test]
    fn empty_penalty_map_selects_square_distance() {
        assert!(matches!(
            CostFunction::for_penalties(&HashMap::new()),
            CostFunction::SquareDistance
        ));
    }
}
