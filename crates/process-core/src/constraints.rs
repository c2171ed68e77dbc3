//! Feature-constraint catalog and its derived lists.

use contracts::features::{
    FeatureConstraint, FeatureGroup, FeatureId, Mutability, FEATURE_COUNT,
};

/// The per-feature constraint configuration for a run.
///
/// Derived lists drop excluded features consistently and preserve the
/// declaration order of the remaining entries.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCatalog {
    entries: Vec<FeatureConstraint>,
}

impl FeatureCatalog {
    /// Difficulty weights outside [0,1] are clamped into range.
    pub fn new(mut entries: Vec<FeatureConstraint>) -> Self {
        for entry in &mut entries {
            entry.difficulty = entry.difficulty.clamp(0.0, 1.0);
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[FeatureConstraint] {
        &self.entries
    }

    pub fn constraint(&self, feature: FeatureId) -> Option<&FeatureConstraint> {
        self.entries.iter().find(|entry| entry.feature == feature)
    }

    /// Non-excluded features in declaration order.
    pub fn active(&self) -> Vec<FeatureId> {
        self.entries
            .iter()
            .filter(|entry| !entry.excluded)
            .map(|entry| entry.feature)
            .collect()
    }

    /// Active features the agent can act on directly, in declaration order.
    pub fn actionable(&self) -> Vec<FeatureId> {
        self.entries
            .iter()
            .filter(|entry| !entry.excluded && entry.mutability == Mutability::Actionable)
            .map(|entry| entry.feature)
            .collect()
    }

    /// Per-slot difficulty over the full canonical vector. Excluded features
    /// get 1.0: the agent never acts on them.
    pub fn difficulty_table(&self) -> [f64; FEATURE_COUNT] {
        let mut table = [1.0_f64; FEATURE_COUNT];
        for entry in &self.entries {
            if !entry.excluded {
                table[entry.feature.index()] = entry.difficulty;
            }
        }
        table
    }

    pub fn default_catalog() -> Self {
        fn entry(
            feature: FeatureId,
            group: FeatureGroup,
            lower: Option<i64>,
            upper: Option<i64>,
            mutability: Mutability,
            excluded: bool,
            difficulty: f64,
        ) -> FeatureConstraint {
            FeatureConstraint {
                feature,
                group,
                lower,
                upper,
                mutability,
                excluded,
                difficulty,
            }
        }

        use FeatureGroup::{Categorical, Continuous};
        use Mutability::{Actionable, Conditional, Immutable};

        Self::new(vec![
            entry(FeatureId::Age, Continuous, Some(0), None, Immutable, false, 1.0),
            entry(FeatureId::Resident, Categorical, Some(0), Some(1), Actionable, false, 0.8),
            entry(FeatureId::Documented, Categorical, Some(0), Some(1), Actionable, false, 0.7),
            entry(FeatureId::OtherAssistance, Categorical, Some(0), Some(1), Actionable, false, 0.5),
            entry(FeatureId::Incarcerated, Categorical, Some(0), Some(1), Immutable, true, 1.0),
            entry(FeatureId::HomeEquity, Continuous, Some(0), None, Actionable, false, 0.85),
            entry(FeatureId::Assets, Continuous, Some(0), None, Actionable, false, 0.45),
            entry(FeatureId::Income, Continuous, Some(0), None, Actionable, false, 0.6),
            entry(FeatureId::HasPartner, Categorical, Some(0), Some(1), Immutable, false, 1.0),
            entry(FeatureId::DependentChildren, Continuous, Some(0), None, Immutable, false, 1.0),
            entry(FeatureId::CostSharers, Continuous, Some(0), None, Actionable, false, 0.55),
            entry(FeatureId::HasCostSharer, Categorical, Some(0), Some(1), Conditional, false, 1.0),
            entry(FeatureId::UnemploymentDays, Continuous, Some(0), None, Actionable, false, 0.3),
        ])
    }
}
