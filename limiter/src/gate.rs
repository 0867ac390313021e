//! Access gate: answers whether a user may use a gated feature right now.
//!
//! The gate loads the subscription record, derives the effective tier and
//! asks the pure quota policy in `plans`. Counter writes go through
//! [`UsageStore`], whose methods are single atomic statements.

use chrono::NaiveDateTime;
use common::error::Res;
use db::{SubscriptionStore, UsageStore};
use plans::{
    PlanTier,
    messages::generation_limit_message,
    quota::{
        FEEDBACK_BONUS_GENERATIONS, can_perform_generation_with_bonus, generation_limit,
        usage_window_start,
    },
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyAccess {
    pub has_access: bool,
    pub plan: PlanTier,
    pub needs_upgrade: bool,
}

impl FamilyAccess {
    fn denied() -> Self {
        FamilyAccess {
            has_access: false,
            plan: PlanTier::Free,
            needs_upgrade: true,
        }
    }
}

/// Family features need an active FAMILY_MONTHLY subscription.
///
/// Storage failures are logged and answered with "no access".
pub async fn check_family_access(subs: &dyn SubscriptionStore, user_id: &str) -> FamilyAccess {
    match subs.load(user_id).await {
        Ok(record) => {
            let has_access = record.plan == PlanTier::FamilyMonthly && record.is_active();
            FamilyAccess {
                has_access,
                plan: record.plan,
                needs_upgrade: !has_access,
            }
        }
        Err(e) => {
            log::error!("Family access check failed for user {}: {}", user_id, e);
            FamilyAccess::denied()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationStatus {
    pub plan: PlanTier,
    pub used: i64,
    /// `None` for unlimited tiers.
    pub limit: Option<u32>,
    pub bonus_remaining: i64,
    pub allowed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationDecision {
    Allowed {
        plan: PlanTier,
        used: i64,
        via_bonus: bool,
    },
    Denied {
        plan: PlanTier,
        used: i64,
        limit: u32,
        message: String,
    },
}

impl GenerationDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GenerationDecision::Allowed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BonusGrant {
    pub bonus_added: i64,
    pub bonus_remaining: i64,
}

fn as_u32(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}

/// Read-only view of the user's generation quota for the window containing `now`.
pub async fn generation_status(
    subs: &dyn SubscriptionStore,
    usage: &dyn UsageStore,
    user_id: &str,
    now: NaiveDateTime,
) -> Res<GenerationStatus> {
    let plan = subs.load(user_id).await?.effective_tier();
    let used = usage
        .generations_in_window(user_id, usage_window_start(now))
        .await?;
    let bonus_remaining = usage.bonus_remaining(user_id).await?;
    let limit = generation_limit(plan);

    // bonus generations are recorded past the limit, so only the base part counts here
    let base_used = limit.map_or(as_u32(used), |limit| as_u32(used).min(limit));
    let allowed = can_perform_generation_with_bonus(plan, base_used, as_u32(bonus_remaining));

    Ok(GenerationStatus {
        plan,
        used,
        limit,
        bonus_remaining,
        allowed,
    })
}

/// Records one generation if the user's quota (or bonus balance) allows it.
pub async fn reserve_generation(
    subs: &dyn SubscriptionStore,
    usage: &dyn UsageStore,
    user_id: &str,
    now: NaiveDateTime,
) -> Res<GenerationDecision> {
    let plan = subs.load(user_id).await?.effective_tier();
    let window = usage_window_start(now);
    let limit = generation_limit(plan);

    if let Some(used) = usage
        .try_record_generation(user_id, window, limit.map(i64::from))
        .await?
    {
        return Ok(GenerationDecision::Allowed {
            plan,
            used,
            via_bonus: false,
        });
    }

    if let Some(used) = usage.consume_bonus_generation(user_id, window).await? {
        log::info!("User {} used a bonus generation ({} this month)", user_id, used);
        return Ok(GenerationDecision::Allowed {
            plan,
            used,
            via_bonus: true,
        });
    }

    let used = usage.generations_in_window(user_id, window).await?;
    log::info!(
        "Generation denied for user {} on plan {} ({} used)",
        user_id,
        plan,
        used
    );
    Ok(GenerationDecision::Denied {
        plan,
        used,
        limit: limit.unwrap_or_default(),
        message: generation_limit_message(plan),
    })
}

/// Grants the one-time feedback bonus. Repeated calls add nothing.
pub async fn grant_feedback_bonus(usage: &dyn UsageStore, user_id: &str) -> Res<BonusGrant> {
    let amount = i64::from(FEEDBACK_BONUS_GENERATIONS);
    match usage.grant_feedback_bonus(user_id, amount).await? {
        Some(remaining) => {
            log::info!("Granted {} feedback generations to user {}", amount, user_id);
            Ok(BonusGrant {
                bonus_added: amount,
                bonus_remaining: remaining,
            })
        }
        None => Ok(BonusGrant {
            bonus_added: 0,
            bonus_remaining: usage.bonus_remaining(user_id).await?,
        }),
    }
}
