use std::fmt;

use chrono::NaiveDateTime;
use plans::PlanTier;
use serde::{Deserialize, Serialize};

/// Billing state of a subscription as this service tracks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Canceled,
    PastDue,
    Unpaid,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Unpaid => "unpaid",
        }
    }

    /// Unknown stored values are read as `Canceled` so they never grant access.
    pub fn from_stored(value: &str) -> SubscriptionStatus {
        match value {
            "active" => SubscriptionStatus::Active,
            "canceled" => SubscriptionStatus::Canceled,
            "past_due" => SubscriptionStatus::PastDue,
            "unpaid" => SubscriptionStatus::Unpaid,
            other => {
                log::warn!("Unrecognised subscription status '{}', treating it as canceled", other);
                SubscriptionStatus::Canceled
            }
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user's subscription. Users without a stored row get [`SubscriptionRecord::free`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionRecord {
    pub user_id: String,
    pub plan: PlanTier,
    pub status: SubscriptionStatus,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub stripe_price_id: Option<String>,
    pub current_period_end: Option<NaiveDateTime>,
    /// Creation time (unix seconds) of the newest billing event applied.
    pub last_event_at: Option<i64>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl SubscriptionRecord {
    /// The implicit record of a user who never subscribed.
    pub fn free(user_id: &str) -> Self {
        SubscriptionRecord {
            user_id: user_id.to_string(),
            plan: PlanTier::Free,
            status: SubscriptionStatus::Active,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            stripe_price_id: None,
            current_period_end: None,
            last_event_at: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }

    /// Tier whose entitlements apply right now. A paid plan that is not
    /// active grants nothing beyond FREE.
    pub fn effective_tier(&self) -> PlanTier {
        if self.is_active() {
            self.plan
        } else {
            PlanTier::Free
        }
    }
}

/// Raw `subscriptions` row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SubscriptionRow {
    pub user_id: String,
    pub plan: String,
    pub status: String,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub stripe_price_id: Option<String>,
    pub current_period_end: Option<NaiveDateTime>,
    pub last_event_at: Option<i64>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<SubscriptionRow> for SubscriptionRecord {
    fn from(row: SubscriptionRow) -> Self {
        SubscriptionRecord {
            plan: PlanTier::from_stored(&row.plan),
            status: SubscriptionStatus::from_stored(&row.status),
            user_id: row.user_id,
            stripe_customer_id: row.stripe_customer_id,
            stripe_subscription_id: row.stripe_subscription_id,
            stripe_price_id: row.stripe_price_id,
            current_period_end: row.current_period_end,
            last_event_at: row.last_event_at,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        }
    }
}
