use common::error::Res;
use serde::Serialize;

use crate::{quota::FREE_GENERATION_LIMIT, tier::PlanTier};

/// Feature switches attached to a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureFlags {
    pub unlimited_generation: bool,
    pub custom_macros: bool,
    pub priority_generation: bool,
    pub history: bool,
    pub family_features: bool,
    pub max_family_members: Option<u32>,
}

/// A plan as shown on the pricing page.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub id: PlanTier,
    pub name: &'static str,
    /// Price in cents.
    pub price: i64,
    pub currency: &'static str,
    /// Billing interval, `None` for the free plan.
    pub interval: Option<&'static str>,
    pub features: FeatureFlags,
    pub highlights: &'static [&'static str],
    pub popular: bool,
}

/// Projection of a plan's feature flags used by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanLimits {
    /// Generations per month, `-1` means unlimited.
    pub plans_per_month: i32,
    pub has_custom_macros: bool,
    pub has_priority_generation: bool,
    pub has_history: bool,
    pub has_family_features: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_family_members: Option<u32>,
}

const PAID_FEATURES: FeatureFlags = FeatureFlags {
    unlimited_generation: true,
    custom_macros: true,
    priority_generation: true,
    history: true,
    family_features: false,
    max_family_members: None,
};

static PLANS: [Plan; 4] = [
    Plan {
        id: PlanTier::Free,
        name: "Free",
        price: 0,
        currency: "eur",
        interval: None,
        features: FeatureFlags {
            unlimited_generation: false,
            custom_macros: false,
            priority_generation: false,
            history: false,
            family_features: false,
            max_family_members: None,
        },
        highlights: &[
            "3 meal plans per month",
            "Email delivery",
            "Basic preferences only",
            "Basic macro tracking",
        ],
        popular: false,
    },
    Plan {
        id: PlanTier::ProMonthly,
        name: "Pro Monthly",
        price: 1499,
        currency: "eur",
        interval: Some("month"),
        features: PAID_FEATURES,
        highlights: &[
            "Everything in Free",
            "Unlimited meal plans",
            "Custom macro targets",
            "Priority generation",
            "Save meal history",
            "PDF downloads",
        ],
        popular: true,
    },
    Plan {
        id: PlanTier::ProAnnual,
        name: "Pro Annual",
        price: 11999,
        currency: "eur",
        interval: Some("year"),
        features: PAID_FEATURES,
        highlights: &[
            "Everything in Pro",
            "Seasonal recipe packs",
            "Early access to features",
            "Best value for annual planning",
        ],
        popular: false,
    },
    Plan {
        id: PlanTier::FamilyMonthly,
        name: "Family Pack",
        price: 2499,
        currency: "eur",
        interval: Some("month"),
        features: FeatureFlags {
            family_features: true,
            max_family_members: Some(6),
            ..PAID_FEATURES
        },
        highlights: &[
            "Everything in Pro",
            "Up to 6 family members",
            "Per-member dietary needs",
            "Family shopping lists",
            "Leftover management",
            "Weekly meal calendar",
        ],
        popular: false,
    },
];

/// All plans in pricing-page order.
pub fn plans() -> &'static [Plan] {
    &PLANS
}

/// Total lookup on the closed tier type.
pub fn plan(tier: PlanTier) -> &'static Plan {
    match tier {
        PlanTier::Free => &PLANS[0],
        PlanTier::ProMonthly => &PLANS[1],
        PlanTier::ProAnnual => &PLANS[2],
        PlanTier::FamilyMonthly => &PLANS[3],
    }
}

/// Looks a plan up by its external identifier, e.g. `"PRO_MONTHLY"`.
pub fn get_plan(tier_id: &str) -> Res<&'static Plan> {
    tier_id.parse::<PlanTier>().map(plan)
}

pub fn get_plan_limits(tier: PlanTier) -> PlanLimits {
    let features = plan(tier).features;
    PlanLimits {
        plans_per_month: if features.unlimited_generation {
            -1
        } else {
            FREE_GENERATION_LIMIT as i32
        },
        has_custom_macros: features.custom_macros,
        has_priority_generation: features.priority_generation,
        has_history: features.history,
        has_family_features: features.family_features,
        max_family_members: features.max_family_members,
    }
}

#[cfg(test)]
mod tests {
    use common::error::AppError;

    use super::*;

    #[test]
    fn lookup_table_matches_tier() {
        for tier in PlanTier::ALL {
            assert_eq!(plan(tier).id, tier);
        }
        assert_eq!(plans().len(), PlanTier::ALL.len());
    }

    #[test]
    fn get_plan_by_identifier() {
        let family = get_plan("FAMILY_MONTHLY").unwrap();
        assert_eq!(family.name, "Family Pack");
        assert_eq!(family.price, 2499);
        assert_eq!(family.features.max_family_members, Some(6));
    }

    #[test]
    fn get_plan_rejects_unknown_identifier() {
        assert!(matches!(get_plan("PLATINUM"), Err(AppError::UnknownPlan(_))));
    }

    #[test]
    fn free_limits() {
        let limits = get_plan_limits(PlanTier::Free);
        assert_eq!(limits.plans_per_month, 3);
        assert!(!limits.has_custom_macros);
        assert!(!limits.has_history);
        assert!(!limits.has_family_features);
        assert_eq!(limits.max_family_members, None);
    }

    #[test]
    fn pro_limits_are_unlimited_without_family() {
        for tier in [PlanTier::ProMonthly, PlanTier::ProAnnual] {
            let limits = get_plan_limits(tier);
            assert_eq!(limits.plans_per_month, -1);
            assert!(limits.has_custom_macros);
            assert!(limits.has_priority_generation);
            assert!(!limits.has_family_features);
        }
    }

    #[test]
    fn family_limits_include_members() {
        let limits = get_plan_limits(PlanTier::FamilyMonthly);
        assert_eq!(limits.plans_per_month, -1);
        assert!(limits.has_family_features);
        assert_eq!(limits.max_family_members, Some(6));
    }

    #[test]
    fn only_family_plan_has_family_features() {
        let with_family: Vec<_> = plans()
            .iter()
            .filter(|p| p.features.family_features)
            .map(|p| p.id)
            .collect();
        assert_eq!(with_family, vec![PlanTier::FamilyMonthly]);
    }

    #[test]
    fn limits_omit_member_cap_when_absent() {
        let json = serde_json::to_value(get_plan_limits(PlanTier::ProMonthly)).unwrap();
        assert!(json.get("max_family_members").is_none());
        assert_eq!(json["plans_per_month"], -1);
    }
}
