use db::models::subscription::SubscriptionRecord;
use plans::{Plan, PlanLimits, PlanTier};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct PlansResponse {
    pub plans: &'static [Plan],
}

#[derive(Debug, Serialize)]
pub struct CurrentSubscriptionResponse {
    pub subscription: SubscriptionRecord,
    /// Tier whose entitlements currently apply.
    pub effective_plan: PlanTier,
    pub limits: PlanLimits,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub plan: String,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub url: String,
}
