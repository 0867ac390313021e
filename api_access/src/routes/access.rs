use std::sync::Arc;

use actix_web::{HttpResponse, Responder, get, post, web};
use chrono::Utc;
use common::{error::Res, http::Success, jwt::JwtClaims};
use db::{SubscriptionStore, UsageStore};
use limiter::gate::{self, GenerationDecision};
use plans::messages::upgrade_message;

use crate::dtos::access::{
    FamilyAccessResponse, GenerationAllowedResponse, GenerationDeniedDetails, UPGRADE_URL,
    UpgradeRequiredResponse,
};

/// Tells the dashboard whether family features are unlocked.
///
/// Never fails on storage errors: the user is then reported as not having access.
///
/// # Output
/// - `{ "has_access": false, "plan": "PRO_MONTHLY", "needs_upgrade": true, "message": "Upgrade to Family Pack ..." }`
///
/// # Frontend Example
/// ```javascript
/// const access = await (await fetch('/api/dashboard/access/family', {
///   headers: { 'Authorization': `Bearer ${token}` }
/// })).json();
/// if (access.needs_upgrade) showUpgradeBanner(access.message);
/// ```
#[get("/family")]
pub async fn get_family_access(
    claims: web::ReqData<JwtClaims>,
    subs: web::Data<Arc<dyn SubscriptionStore>>,
) -> Res<impl Responder> {
    let access = gate::check_family_access(subs.get_ref().as_ref(), &claims.user_id).await;
    let message = access.needs_upgrade.then(|| upgrade_message(access.plan));
    Success::ok(FamilyAccessResponse { access, message })
}

/// Current month's generation quota of the authenticated user.
#[get("/generation")]
pub async fn get_generation(
    claims: web::ReqData<JwtClaims>,
    subs: web::Data<Arc<dyn SubscriptionStore>>,
    usage: web::Data<Arc<dyn UsageStore>>,
) -> Res<impl Responder> {
    let status = gate::generation_status(
        subs.get_ref().as_ref(),
        usage.get_ref().as_ref(),
        &claims.user_id,
        Utc::now().naive_utc(),
    )
    .await?;
    Success::ok(status)
}

/// Reserves one meal-plan generation before the generator runs.
///
/// # Output
/// - Success: 200 `{ "allowed": true, "plan": "FREE", "used": 2, "via_bonus": false }`
/// - Denied: 403 with `error`, `message`, `details` and `upgrade_url`
#[post("/generation")]
pub async fn post_generation(
    claims: web::ReqData<JwtClaims>,
    subs: web::Data<Arc<dyn SubscriptionStore>>,
    usage: web::Data<Arc<dyn UsageStore>>,
) -> Res<HttpResponse> {
    let decision = gate::reserve_generation(
        subs.get_ref().as_ref(),
        usage.get_ref().as_ref(),
        &claims.user_id,
        Utc::now().naive_utc(),
    )
    .await?;

    let response = match decision {
        GenerationDecision::Allowed {
            plan,
            used,
            via_bonus,
        } => HttpResponse::Ok().json(GenerationAllowedResponse {
            allowed: true,
            plan,
            used,
            via_bonus,
        }),
        GenerationDecision::Denied {
            plan,
            used,
            limit,
            message,
        } => HttpResponse::Forbidden().json(UpgradeRequiredResponse {
            error: "Monthly plan limit reached",
            message,
            details: GenerationDeniedDetails {
                current_plan: plan,
                plans_used: used,
                plans_limit: limit,
            },
            upgrade_url: UPGRADE_URL,
        }),
    };
    Ok(response)
}

/// Grants the one-time feedback bonus. Returns 201 when generations were added.
#[post("/bonus")]
pub async fn post_bonus(
    claims: web::ReqData<JwtClaims>,
    usage: web::Data<Arc<dyn UsageStore>>,
) -> Res<HttpResponse> {
    let grant = gate::grant_feedback_bonus(usage.get_ref().as_ref(), &claims.user_id).await?;
    let response = if grant.bonus_added > 0 {
        HttpResponse::Created().json(grant)
    } else {
        HttpResponse::Ok().json(grant)
    };
    Ok(response)
}
