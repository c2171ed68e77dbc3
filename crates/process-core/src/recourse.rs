//! Gradual implementation of a pending recourse recommendation.
//!
//! One pass walks the canonical feature order. Every nonzero slot except the
//! derived cost-sharer flag consumes one difficulty draw; a successful act
//! moves the feature one step and shrinks the remaining delta by the same
//! step, never past zero.

use contracts::features::{FeatureId, FeatureVector, FEATURE_COUNT};

use crate::rng::StreamRng;

/// Step applied per acted-on cycle. Days-denominated progress moves a month
/// at a time; age only moves through feature evolution.
pub fn step_size(feature: FeatureId) -> i64 {
    match feature {
        FeatureId::Age => 0,
        FeatureId::UnemploymentDays => 30,
        _ => 1,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoursePass {
    /// Features actually moved this pass.
    pub acted: usize,
    /// Slots still nonzero after the pass; 0 means fully implemented.
    pub remaining: usize,
}

pub fn apply(
    features: &mut FeatureVector,
    deltas: &mut [i64],
    difficulties: &[f64; FEATURE_COUNT],
    rng: &mut StreamRng,
) -> RecoursePass {
    let mut acted = 0_usize;
    for feature in FeatureId::ALL {
        let slot = feature.index();
        let delta = deltas[slot];
        if delta == 0 {
            continue;
        }
        // Derived from the cost-sharer count; never edited directly.
        if feature == FeatureId::HasCostSharer {
            continue;
        }
        // One difficulty draw per remaining feature.
        if rng.chance(difficulties[slot]) {
            continue;
        }
        let magnitude = step_size(feature).min(delta.abs());
        if magnitude == 0 {
            continue;
        }
        let signed = if delta > 0 { magnitude } else { -magnitude };
        deltas[slot] = delta - signed;

        let current = features.value(feature);
        let updated = if signed < 0 {
            (current + signed).max(0)
        } else {
            current + signed
        };
        features.set_value(feature, updated);
        acted += 1;

        if feature == FeatureId::CostSharers {
            let has_sharer = features.cost_sharers > 0;
            features.has_cost_sharer = has_sharer;
            deltas[FeatureId::HasCostSharer.index()] = 0;
        }
    }

    RecoursePass {
        acted,
        remaining: deltas.iter().filter(|delta| **delta != 0).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_difficulty() -> [f64; FEATURE_COUNT] {
        [0.0; FEATURE_COUNT]
    }

    fn blank_deltas() -> Vec<i64> {
        vec![0; FEATURE_COUNT]
    }

    #[test]
    fn converges_in_max_abs_delta_passes_without_overshoot() {
        let mut features = FeatureVector::default();
        features.assets = 9_000;
        let mut deltas = blank_deltas();
        deltas[FeatureId::Assets.index()] = -4;
        deltas[FeatureId::Income.index()] = 2;
        let difficulties = no_difficulty();
        let mut rng = StreamRng::new(1);

        let mut passes = 0;
        loop {
            let pass = apply(&mut features, &mut deltas, &difficulties, &mut rng);
            passes += 1;
            assert!(deltas[FeatureId::Assets.index()] <= 0, "sign must not flip");
            assert!(deltas[FeatureId::Income.index()] >= 0, "sign must not flip");
            if pass.remaining == 0 {
                break;
            }
            assert!(passes < 100, "did not converge");
        }
        assert_eq!(passes, 4);
        assert_eq!(features.assets, 8_996);
        assert_eq!(features.income, 2);
    }

    #[test]
    fn difficulty_one_blocks_all_progress() {
        let mut features = FeatureVector::default();
        let mut deltas = blank_deltas();
        deltas[FeatureId::Assets.index()] = -3;
        let mut rng = StreamRng::new(2);
        let pass = apply(&mut features, &mut deltas, &[1.0; FEATURE_COUNT], &mut rng);
        assert_eq!(pass.acted, 0);
        assert_eq!(pass.remaining, 1);
        assert_eq!(deltas[FeatureId::Assets.index()], -3);
    }

    #[test]
    fn days_feature_steps_a_month_at_a_time() {
        let mut features = FeatureVector::default();
        features.unemployment_days = 180;
        let mut deltas = blank_deltas();
        deltas[FeatureId::UnemploymentDays.index()] = -70;
        let difficulties = no_difficulty();
        let mut rng = StreamRng::new(3);

        apply(&mut features, &mut deltas, &difficulties, &mut rng);
        assert_eq!(features.unemployment_days, 150);
        assert_eq!(deltas[FeatureId::UnemploymentDays.index()], -40);

        apply(&mut features, &mut deltas, &difficulties, &mut rng);
        apply(&mut features, &mut deltas, &difficulties, &mut rng);
        // Final step is the 10-day remainder, not a full month.
        assert_eq!(deltas[FeatureId::UnemploymentDays.index()], 0);
        assert_eq!(features.unemployment_days, 110);
    }

    #[test]
    fn decreasing_features_clamp_at_zero() {
        let mut features = FeatureVector::default();
        features.unemployment_days = 10;
        let mut deltas = blank_deltas();
        deltas[FeatureId::UnemploymentDays.index()] = -60;
        let mut rng = StreamRng::new(4);
        apply(&mut features, &mut deltas, &no_difficulty(), &mut rng);
        assert_eq!(features.unemployment_days, 0);
        assert_eq!(deltas[FeatureId::UnemploymentDays.index()], -30);
    }

    #[test]
    fn cost_sharer_change_syncs_the_derived_flag_and_slot() {
        let mut features = FeatureVector::default();
        features.cost_sharers = 1;
        features.has_cost_sharer = true;
        let mut deltas = blank_deltas();
        deltas[FeatureId::CostSharers.index()] = -1;
        deltas[FeatureId::HasCostSharer.index()] = -1;
        let mut rng = StreamRng::new(5);

        let pass = apply(&mut features, &mut deltas, &no_difficulty(), &mut rng);
        assert_eq!(features.cost_sharers, 0);
        assert!(!features.has_cost_sharer);
        assert_eq!(deltas[FeatureId::HasCostSharer.index()], 0);
        assert_eq!(pass.remaining, 0);
    }

    #[test]
    fn age_slot_is_drawn_but_never_stepped() {
        let mut features = FeatureVector::default();
        let starting_age = features.age;
        let mut deltas = blank_deltas();
        deltas[FeatureId::Age.index()] = 3;
        let mut rng = StreamRng::new(6);
        let mut silent = rng.clone();

        let pass = apply(&mut features, &mut deltas, &no_difficulty(), &mut rng);
        assert_eq!(features.age, starting_age);
        assert_eq!(deltas[FeatureId::Age.index()], 3);
        assert_eq!(pass.acted, 0);
        // The slot still consumed its difficulty draw.
        silent.next_unit();
        assert_eq!(rng, silent);
    }
}
