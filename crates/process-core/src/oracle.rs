//! External oracle seams: the investigation risk classifier and the recourse
//! recommendation generator.
//!
//! The core only sees these interfaces. Training and counterfactual search
//! live elsewhere; the reference implementations here are deterministic
//! stand-ins with the right shape, used by tests and demo runs.

use std::fmt;

use contracts::features::{FeatureId, FeatureVector, FEATURE_COUNT};

use crate::constraints::FeatureCatalog;

/// A failed oracle call. Recovered per-agent: the call's effect is treated
/// as absent for the tick, never fatal to the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    Unavailable(String),
    BadShape { expected: usize, got: usize },
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(reason) => write!(f, "oracle unavailable: {reason}"),
            Self::BadShape { expected, got } => {
                write!(f, "oracle returned {got} entries, expected {expected}")
            }
        }
    }
}

impl std::error::Error for OracleError {}

/// Binary risk classifier consulted during nomination. `true` = high risk.
pub trait RiskOracle: fmt::Debug + Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<bool, OracleError>;
}

/// Recommendation generator consulted at the Recourse stage. Returns signed
/// per-feature deltas in canonical order (positive = increase the feature).
pub trait RecourseOracle: fmt::Debug + Send + Sync {
    fn recommend(
        &self,
        features: &FeatureVector,
        target_label: i64,
    ) -> Result<Vec<i64>, OracleError>;
}

// ---------------------------------------------------------------------------
// Reference implementations
// ---------------------------------------------------------------------------

/// Fixed linear scorer over the canonical feature encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRiskOracle {
    pub weights: [f64; FEATURE_COUNT],
    pub bias: f64,
    pub threshold: f64,
}

impl LinearRiskOracle {
    /// Reference weights: undeclared income streams, liquid assets, and
    /// crowded households push the score up; settled residency pulls it down.
    pub fn reference() -> Self {
        let mut weights = [0.0_f64; FEATURE_COUNT];
        weights[FeatureId::Income.index()] = 0.004;
        weights[FeatureId::Assets.index()] = 0.000_6;
        weights[FeatureId::HomeEquity.index()] = 0.000_04;
        weights[FeatureId::CostSharers.index()] = 0.35;
        weights[FeatureId::OtherAssistance.index()] = 1.2;
        weights[FeatureId::Resident.index()] = -0.3;
        weights[FeatureId::Documented.index()] = -0.3;
        weights[FeatureId::UnemploymentDays.index()] = -0.000_5;
        Self {
            weights,
            bias: 0.0,
            threshold: 1.0,
        }
    }

    fn score(&self, features: &FeatureVector) -> f64 {
        let encoded = features.encode();
        self.weights
            .iter()
            .zip(encoded)
            .map(|(weight, value)| weight * value as f64)
            .sum::<f64>()
            + self.bias
    }
}

impl RiskOracle for LinearRiskOracle {
    fn predict(&self, features: &FeatureVector) -> Result<bool, OracleError> {
        Ok(self.score(features) > self.threshold)
    }
}

/// Emits deltas steering every actionable feature toward a fixed target
/// profile. Only supports the label it was configured for.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetProfileRecourseOracle {
    target: FeatureVector,
    actionable: Vec<FeatureId>,
    label: i64,
}

impl TargetProfileRecourseOracle {
    pub fn new(target: FeatureVector, catalog: &FeatureCatalog, label: i64) -> Self {
        Self {
            target,
            actionable: catalog.actionable(),
            label,
        }
    }

    /// Reference target: a settled, documented single claimant with modest
    /// assets, no side income, and no unemployment backlog.
    pub fn reference(catalog: &FeatureCatalog, label: i64) -> Self {
        let target = FeatureVector {
            assets: 3_000,
            income: 0,
            home_equity: 0,
            cost_sharers: 0,
            unemployment_days: 0,
            ..FeatureVector::default()
        };
        Self::new(target, catalog, label)
    }
}

impl RecourseOracle for TargetProfileRecourseOracle {
    fn recommend(
        &self,
        features: &FeatureVector,
        target_label: i64,
    ) -> Result<Vec<i64>, OracleError> {
        if target_label != self.label {
            return Err(OracleError::Unavailable(format!(
                "no recommendation path toward label {target_label}"
            )));
        }
        let mut deltas = vec![0_i64; FEATURE_COUNT];
        for &feature in &self.actionable {
            deltas[feature.index()] = self.target.value(feature) - features.value(feature);
        }
        Ok(deltas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_oracle_is_deterministic() {
        let oracle = LinearRiskOracle::reference();
        let features = FeatureVector::default();
        assert_eq!(
            oracle.predict(&features).expect("predict"),
            oracle.predict(&features).expect("predict"),
        );
    }

    #[test]
    fn crowded_high_income_household_scores_high_risk() {
        let oracle = LinearRiskOracle::reference();
        let mut features = FeatureVector::default();
        features.income = 900;
        features.cost_sharers = 4;
        features.has_cost_sharer = true;
        assert!(oracle.predict(&features).expect("predict"));
    }

    #[test]
    fn target_profile_deltas_touch_only_actionable_features() {
        let catalog = FeatureCatalog::default_catalog();
        let oracle = TargetProfileRecourseOracle::reference(&catalog, 0);
        let mut features = FeatureVector::default();
        features.assets = 9_000;
        features.age = 44;
        features.dependent_children = 1;

        let deltas = oracle.recommend(&features, 0).expect("recommend");
        assert_eq!(deltas.len(), FEATURE_COUNT);
        assert_eq!(deltas[FeatureId::Assets.index()], -6_000);
        assert_eq!(deltas[FeatureId::Age.index()], 0);
        assert_eq!(deltas[FeatureId::DependentChildren.index()], 0);
        assert_eq!(deltas[FeatureId::HasCostSharer.index()], 0);
    }

    #[test]
    fn unsupported_label_is_an_oracle_failure() {
        let catalog = FeatureCatalog::default_catalog();
        let oracle = TargetProfileRecourseOracle::reference(&catalog, 0);
        assert!(oracle.recommend(&FeatureVector::default(), 1).is_err());
    }
}
