//! Investigation nomination policies.
//!
//! Two independent policies compose per qualifying cycle: the model-driven
//! check runs first and consumes no stream draws; the uniform-random check
//! runs only if the model did not nominate and consumes exactly one draw.
//! That ordering is part of the replay contract.

use contracts::features::FeatureVector;

use crate::oracle::{OracleError, RiskOracle};
use crate::rng::StreamRng;

/// Model-driven nomination. `false` when no oracle is configured; oracle
/// failures propagate so the caller can record them and degrade.
pub fn nominate_model(
    features: &FeatureVector,
    oracle: Option<&dyn RiskOracle>,
) -> Result<bool, OracleError> {
    match oracle {
        None => Ok(false),
        Some(oracle) => oracle.predict(features),
    }
}

/// Uniform-random nomination: one draw against `p`.
pub fn nominate_random(p: f64, rng: &mut StreamRng) -> bool {
    rng.chance(p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::LinearRiskOracle;

    #[test]
    fn missing_oracle_never_nominates() {
        let features = FeatureVector::default();
        assert_eq!(nominate_model(&features, None), Ok(false));
    }

    #[test]
    fn configured_oracle_is_forwarded_the_features() {
        let oracle = LinearRiskOracle::reference();
        let mut features = FeatureVector::default();
        features.income = 900;
        features.cost_sharers = 4;
        assert_eq!(nominate_model(&features, Some(&oracle)), Ok(true));
    }

    #[test]
    fn random_nomination_rate_tracks_p() {
        let mut rng = StreamRng::new(404);
        let draws = 20_000;
        let fired = (0..draws)
            .filter(|_| nominate_random(0.175, &mut rng))
            .count();
        let rate = fired as f64 / f64::from(draws);
        assert!((rate - 0.175).abs() < 0.015, "rate was {rate}");
    }

    #[test]
    fn random_nomination_consumes_exactly_one_draw() {
        let mut a = StreamRng::new(9);
        let mut b = StreamRng::new(9);
        nominate_random(0.5, &mut a);
        b.next_unit();
        assert_eq!(a, b);
    }
}
