use limiter::gate::FamilyAccess;
use plans::PlanTier;
use serde::Serialize;

/// Where denied users are sent to pick a plan.
pub const UPGRADE_URL: &str = "/pricing";

#[derive(Debug, Serialize)]
pub struct FamilyAccessResponse {
    #[serde(flatten)]
    pub access: FamilyAccess,
    /// Present only when access is denied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct GenerationAllowedResponse {
    pub allowed: bool,
    pub plan: PlanTier,
    pub used: i64,
    pub via_bonus: bool,
}

#[derive(Debug, Serialize)]
pub struct GenerationDeniedDetails {
    pub current_plan: PlanTier,
    pub plans_used: i64,
    pub plans_limit: u32,
}

/// 403 body of a denied gated action.
#[derive(Debug, Serialize)]
pub struct UpgradeRequiredResponse {
    pub error: &'static str,
    pub message: String,
    pub details: GenerationDeniedDetails,
    pub upgrade_url: &'static str,
}
