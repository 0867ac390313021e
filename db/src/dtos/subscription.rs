use chrono::NaiveDateTime;
use plans::PlanTier;

use crate::models::subscription::SubscriptionStatus;

/// Fields to merge into a user's subscription. `None` keeps the stored value
/// (or the FREE/active default when the row is new).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionUpsert {
    pub plan: Option<PlanTier>,
    pub status: Option<SubscriptionStatus>,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub stripe_price_id: Option<String>,
    pub current_period_end: Option<NaiveDateTime>,
    /// Billing event timestamp; writes older than the stored one are refused.
    pub event_at: Option<i64>,
}
