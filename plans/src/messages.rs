//! Human-readable upgrade prompts shown when a gated action is denied.

use crate::{quota::FREE_GENERATION_LIMIT, tier::PlanTier};

const DEFAULT_FAMILY_UPGRADE: &str = "Upgrade to Family Pack to access family features!";

/// Family-feature upgrade prompt for the user's current tier.
pub fn upgrade_message(tier: PlanTier) -> &'static str {
    match tier {
        PlanTier::Free => "Upgrade to Family Pack to unlock all family features!",
        PlanTier::ProMonthly | PlanTier::ProAnnual => {
            "Upgrade to Family Pack to add your family members and manage meals for everyone!"
        }
        // reached when a family subscription lapsed
        PlanTier::FamilyMonthly => "Renew your Family Pack to get your family features back!",
    }
}

/// Like [`upgrade_message`] for a raw identifier, with a generic fallback.
pub fn upgrade_message_for(tier_id: &str) -> &'static str {
    match tier_id.parse::<PlanTier>() {
        Ok(tier) => upgrade_message(tier),
        Err(_) => DEFAULT_FAMILY_UPGRADE,
    }
}

/// Prompt returned when the monthly generation quota is used up.
pub fn generation_limit_message(tier: PlanTier) -> String {
    match tier {
        PlanTier::Free => format!(
            "You have used all {} meal plans included in the FREE plan this month. \
             Share feedback to earn extra plans or upgrade to Pro for unlimited access.",
            FREE_GENERATION_LIMIT
        ),
        other => format!(
            "You have reached the meal plan limit of your {} plan. Upgrade for unlimited access.",
            other
        ),
    }
}
