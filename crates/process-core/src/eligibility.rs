//! Pure eligibility rule table: hard constraints, base assistance standard,
//! and the cost-sharing income adjustment.

use contracts::features::FeatureVector;
use contracts::AgentStatus;

pub const MINIMUM_AGE: i64 = 18;
pub const RETIREMENT_AGE: i64 = 67;
pub const HOME_EQUITY_LIMIT: i64 = 63_900;
pub const ASSET_LIMIT_SINGLE: i64 = 7_575;
/// Households with a partner, or a single parent with dependent children.
pub const ASSET_LIMIT_SHARED: i64 = 15_150;

pub const NORM_SINGLE: i64 = 1_092;
pub const NORM_COUPLE: i64 = 1_560;
pub const NORM_SINGLE_RETIRED: i64 = 1_218;
pub const NORM_COUPLE_RETIRED: i64 = 1_652;

/// Income multiplier by household size (the applicant plus other cost
/// sharers), capped at six.
pub const COST_SHARING_MULTIPLIERS: [f64; 6] = [1.00, 0.70, 0.50, 0.43, 0.40, 0.38];

pub fn cost_sharing_multiplier(other_sharers: i64) -> f64 {
    let household = (other_sharers.max(0) + 1).min(6) as usize;
    COST_SHARING_MULTIPLIERS[household - 1]
}

fn asset_limit(features: &FeatureVector) -> i64 {
    if features.has_partner || features.dependent_children > 0 {
        ASSET_LIMIT_SHARED
    } else {
        ASSET_LIMIT_SINGLE
    }
}

fn base_standard(features: &FeatureVector) -> i64 {
    match (features.has_partner, features.age >= RETIREMENT_AGE) {
        (false, false) => NORM_SINGLE,
        (true, false) => NORM_COUPLE,
        (false, true) => NORM_SINGLE_RETIRED,
        (true, true) => NORM_COUPLE_RETIRED,
    }
}

/// Map a feature record to an eligibility decision and monthly amount.
///
/// Pure: identical input always yields the identical decision. A computed
/// amount of zero or less is a rejection; "accepted at zero benefit" is not
/// a representable state.
pub fn evaluate(features: &FeatureVector) -> (AgentStatus, i64) {
    let hard_rejection = !features.resident
        || !features.documented
        || features.age < MINIMUM_AGE
        || features.other_assistance
        || features.incarcerated
        || features.home_equity >= HOME_EQUITY_LIMIT
        || features.assets > asset_limit(features);
    if hard_rejection {
        return (AgentStatus::Rejected, 0);
    }

    let multiplier = cost_sharing_multiplier(features.cost_sharers);
    let amount = (base_standard(features) as f64 - features.income as f64 * multiplier).round();
    if amount <= 0.0 {
        return (AgentStatus::Rejected, 0);
    }
    (AgentStatus::Accepted, amount as i64)
}
