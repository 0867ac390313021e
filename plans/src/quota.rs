//! Generation quota policy. Pure functions only.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::{catalog::plan, tier::PlanTier};

/// Meal plans a FREE user may generate per calendar month.
pub const FREE_GENERATION_LIMIT: u32 = 3;

/// Extra generations granted once for submitting feedback.
pub const FEEDBACK_BONUS_GENERATIONS: u32 = 2;

/// Per-window generation cap for a tier, `None` when unlimited.
pub fn generation_limit(tier: PlanTier) -> Option<u32> {
    if plan(tier).features.unlimited_generation {
        None
    } else {
        Some(FREE_GENERATION_LIMIT)
    }
}

pub fn can_perform_generation(tier: PlanTier, used_this_window: u32) -> bool {
    match generation_limit(tier) {
        None => true,
        Some(limit) => used_this_window < limit,
    }
}

/// Same as [`can_perform_generation`] for an untrusted tier identifier.
/// Anything unrecognised gets FREE semantics.
pub fn can_perform_generation_for(tier_id: &str, used_this_window: u32) -> bool {
    can_perform_generation(PlanTier::from_stored(tier_id), used_this_window)
}

/// Bonus generations only extend capped tiers.
pub fn can_perform_generation_with_bonus(tier: PlanTier, used_this_window: u32, bonus: u32) -> bool {
    match generation_limit(tier) {
        None => true,
        Some(limit) => used_this_window < limit.saturating_add(bonus),
    }
}

/// Start of the usage window containing `now`: midnight UTC on the first of the month.
pub fn usage_window_start(now: NaiveDateTime) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAID: [PlanTier; 3] = [
        PlanTier::ProMonthly,
        PlanTier::ProAnnual,
        PlanTier::FamilyMonthly,
    ];

    #[test]
    fn free_allows_below_limit() {
        for used in 0..FREE_GENERATION_LIMIT {
            assert!(can_perform_generation(PlanTier::Free, used), "used={used}");
        }
    }

    #[test]
    fn free_denies_at_and_above_limit() {
        assert!(!can_perform_generation(PlanTier::Free, 3));
        assert!(!can_perform_generation(PlanTier::Free, 4));
        assert!(!can_perform_generation(PlanTier::Free, u32::MAX));
    }

    #[test]
    fn paid_tiers_are_unlimited() {
        for tier in PAID {
            assert_eq!(generation_limit(tier), None);
            for used in [0, 3, 10_000, u32::MAX] {
                assert!(can_perform_generation(tier, used));
            }
        }
    }

    #[test]
    fn unknown_identifier_gets_free_semantics() {
        assert!(can_perform_generation_for("GOLD", 2));
        assert!(!can_perform_generation_for("GOLD", 3));
        assert!(!can_perform_generation_for("", 10_000));
        assert!(can_perform_generation_for("PRO_ANNUAL", 10_000));
    }

    #[test]
    fn bonus_extends_free_quota() {
        assert!(can_perform_generation_with_bonus(PlanTier::Free, 3, 2));
        assert!(can_perform_generation_with_bonus(PlanTier::Free, 4, 2));
        assert!(!can_perform_generation_with_bonus(PlanTier::Free, 5, 2));
        assert!(!can_perform_generation_with_bonus(PlanTier::Free, 3, 0));
        assert!(can_perform_generation_with_bonus(PlanTier::ProMonthly, 500, 0));
    }

    #[test]
    fn window_starts_on_first_of_month() {
        let now = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(17, 45, 12)
            .unwrap();
        let start = usage_window_start(now);
        assert_eq!(
            start,
            NaiveDate::from_ymd_opt(2026, 10, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
        assert_eq!(usage_window_start(start), start);
    }

    #[test]
    fn window_resets_at_month_boundary() {
        let last_instant = NaiveDate::from_ymd_opt(2026, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        let next = last_instant + chrono::Duration::seconds(1);
        assert_ne!(usage_window_start(last_instant), usage_window_start(next));
        assert_eq!(usage_window_start(next), next);
    }
}
