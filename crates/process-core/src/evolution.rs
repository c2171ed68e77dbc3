//! Fixed-cadence feature drift, independent of stage logic.
//!
//! Runs for every agent at the start of its tick, before the stage behavior,
//! and consumes no draws from the shared stream.

use contracts::features::{FeatureId, FeatureVector};

/// Ticks are months; ages advance on this cadence.
pub const TICKS_PER_YEAR: u64 = 12;
pub const DAYS_PER_TICK: i64 = 30;
/// Macro wage drift applied to earned income at the yearly cadence, percent.
pub const INCOME_DRIFT_PCT: i64 = 2;

pub fn advance(features: &mut FeatureVector, recommendation: Option<&mut Vec<i64>>, tick: u64) {
    if features.income == 0 {
        features.unemployment_days += DAYS_PER_TICK;
    } else {
        features.unemployment_days = 0;
    }

    if tick > 0 && tick % TICKS_PER_YEAR == 0 {
        features.age += 1;
        // Recourse applies a zero step to age; a positive age delta retires
        // here instead, as the agent actually gets older.
        if let Some(deltas) = recommendation {
            let slot = FeatureId::Age.index();
            if deltas[slot] > 0 {
                deltas[slot] -= 1;
            }
        }
        if features.income > 0 {
            features.income += features.income * INCOME_DRIFT_PCT / 100;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::features::FEATURE_COUNT;

    #[test]
    fn unemployment_days_accrue_while_income_is_zero() {
        let mut features = FeatureVector::default();
        features.income = 0;
        features.unemployment_days = 60;
        advance(&mut features, None, 1);
        assert_eq!(features.unemployment_days, 90);

        features.income = 400;
        advance(&mut features, None, 2);
        assert_eq!(features.unemployment_days, 0);
    }

    #[test]
    fn age_and_income_drift_only_on_the_yearly_cadence() {
        let mut features = FeatureVector::default();
        features.age = 40;
        features.income = 1_000;

        advance(&mut features, None, 11);
        assert_eq!(features.age, 40);
        assert_eq!(features.income, 1_000);

        advance(&mut features, None, 12);
        assert_eq!(features.age, 41);
        assert_eq!(features.income, 1_020);
    }

    #[test]
    fn tick_zero_never_fires_the_cadence() {
        let mut features = FeatureVector::default();
        features.age = 30;
        advance(&mut features, None, 0);
        assert_eq!(features.age, 30);
    }

    #[test]
    fn positive_age_delta_retires_as_the_agent_ages() {
        let mut features = FeatureVector::default();
        let mut deltas = vec![0_i64; FEATURE_COUNT];
        deltas[FeatureId::Age.index()] = 2;

        advance(&mut features, Some(&mut deltas), 12);
        assert_eq!(deltas[FeatureId::Age.index()], 1);
        advance(&mut features, Some(&mut deltas), 24);
        assert_eq!(deltas[FeatureId::Age.index()], 0);
        advance(&mut features, Some(&mut deltas), 36);
        assert_eq!(deltas[FeatureId::Age.index()], 0);
    }
}
