//! Agent feature representation and per-feature constraint records.
//!
//! The feature set is a fixed, named record; oracles exchange it as a flat
//! vector in `FeatureId::ALL` order, so that order is part of the contract.

use serde::{Deserialize, Serialize};

pub const FEATURE_COUNT: usize = 13;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FeatureId {
    Age,
    Resident,
    Documented,
    OtherAssistance,
    Incarcerated,
    HomeEquity,
    Assets,
    Income,
    HasPartner,
    DependentChildren,
    CostSharers,
    HasCostSharer,
    UnemploymentDays,
}

impl FeatureId {
    /// Canonical vector order shared with the oracles.
    pub const ALL: [FeatureId; FEATURE_COUNT] = [
        FeatureId::Age,
        FeatureId::Resident,
        FeatureId::Documented,
        FeatureId::OtherAssistance,
        FeatureId::Incarcerated,
        FeatureId::HomeEquity,
        FeatureId::Assets,
        FeatureId::Income,
        FeatureId::HasPartner,
        FeatureId::DependentChildren,
        FeatureId::CostSharers,
        FeatureId::HasCostSharer,
        FeatureId::UnemploymentDays,
    ];

    /// Position of this feature in the canonical vector order.
    pub fn index(self) -> usize {
        match self {
            FeatureId::Age => 0,
            FeatureId::Resident => 1,
            FeatureId::Documented => 2,
            FeatureId::OtherAssistance => 3,
            FeatureId::Incarcerated => 4,
            FeatureId::HomeEquity => 5,
            FeatureId::Assets => 6,
            FeatureId::Income => 7,
            FeatureId::HasPartner => 8,
            FeatureId::DependentChildren => 9,
            FeatureId::CostSharers => 10,
            FeatureId::HasCostSharer => 11,
            FeatureId::UnemploymentDays => 12,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FeatureId::Age => "age",
            FeatureId::Resident => "resident",
            FeatureId::Documented => "documented",
            FeatureId::OtherAssistance => "other_assistance",
            FeatureId::Incarcerated => "incarcerated",
            FeatureId::HomeEquity => "home_equity",
            FeatureId::Assets => "assets",
            FeatureId::Income => "income",
            FeatureId::HasPartner => "has_partner",
            FeatureId::DependentChildren => "dependent_children",
            FeatureId::CostSharers => "cost_sharers",
            FeatureId::HasCostSharer => "has_cost_sharer",
            FeatureId::UnemploymentDays => "unemployment_days",
        }
    }
}

/// The mutable feature record an agent owns for its whole lifetime.
///
/// Monetary amounts are whole euros per month, ages whole years, durations
/// whole days. Booleans cross the oracle boundary as 0/1.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeatureVector {
    pub age: i64,
    pub resident: bool,
    pub documented: bool,
    pub other_assistance: bool,
    pub incarcerated: bool,
    pub home_equity: i64,
    pub assets: i64,
    pub income: i64,
    pub has_partner: bool,
    pub dependent_children: i64,
    pub cost_sharers: i64,
    pub has_cost_sharer: bool,
    pub unemployment_days: i64,
}

impl FeatureVector {
    pub fn value(&self, feature: FeatureId) -> i64 {
        match feature {
            FeatureId::Age => self.age,
            FeatureId::Resident => i64::from(self.resident),
            FeatureId::Documented => i64::from(self.documented),
            FeatureId::OtherAssistance => i64::from(self.other_assistance),
            FeatureId::Incarcerated => i64::from(self.incarcerated),
            FeatureId::HomeEquity => self.home_equity,
            FeatureId::Assets => self.assets,
            FeatureId::Income => self.income,
            FeatureId::HasPartner => i64::from(self.has_partner),
            FeatureId::DependentChildren => self.dependent_children,
            FeatureId::CostSharers => self.cost_sharers,
            FeatureId::HasCostSharer => i64::from(self.has_cost_sharer),
            FeatureId::UnemploymentDays => self.unemployment_days,
        }
    }

    /// Overwrite a feature from its numeric encoding (booleans: nonzero ⇒ true).
    pub fn set_value(&mut self, feature: FeatureId, value: i64) {
        match feature {
            FeatureId::Age => self.age = value,
            FeatureId::Resident => self.resident = value != 0,
            FeatureId::Documented => self.documented = value != 0,
            FeatureId::OtherAssistance => self.other_assistance = value != 0,
            FeatureId::Incarcerated => self.incarcerated = value != 0,
            FeatureId::HomeEquity => self.home_equity = value,
            FeatureId::Assets => self.assets = value,
            FeatureId::Income => self.income = value,
            FeatureId::HasPartner => self.has_partner = value != 0,
            FeatureId::DependentChildren => self.dependent_children = value,
            FeatureId::CostSharers => self.cost_sharers = value,
            FeatureId::HasCostSharer => self.has_cost_sharer = value != 0,
            FeatureId::UnemploymentDays => self.unemployment_days = value,
        }
    }

    /// Flat encoding in `FeatureId::ALL` order, as handed to the oracles.
    pub fn encode(&self) -> [i64; FEATURE_COUNT] {
        let mut values = [0_i64; FEATURE_COUNT];
        for feature in FeatureId::ALL {
            values[feature.index()] = self.value(feature);
        }
        values
    }
}

impl Default for FeatureVector {
    fn default() -> Self {
        Self {
            age: 34,
            resident: true,
            documented: true,
            other_assistance: false,
            incarcerated: false,
            home_equity: 0,
            assets: 1200,
            income: 0,
            has_partner: false,
            dependent_children: 0,
            cost_sharers: 0,
            has_cost_sharer: false,
            unemployment_days: 180,
        }
    }
}

// ---------------------------------------------------------------------------
// Constraint records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeatureGroup {
    Categorical,
    Continuous,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Mutability {
    /// The agent can act on a recommendation for this feature directly.
    Actionable,
    /// Changes only as a side effect of another feature.
    Conditional,
    /// Never the subject of a recommendation.
    Immutable,
}

/// Per-feature constraint record from the feature-constraint configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureConstraint {
    pub feature: FeatureId,
    pub group: FeatureGroup,
    /// Domain bounds; `None` means unbounded on that side.
    #[serde(default)]
    pub lower: Option<i64>,
    #[serde(default)]
    pub upper: Option<i64>,
    pub mutability: Mutability,
    /// Excluded features are dropped from every derived list.
    pub excluded: bool,
    /// Probability in [0,1] that the agent fails to act on this feature in a
    /// given cycle.
    pub difficulty: f64,
}
