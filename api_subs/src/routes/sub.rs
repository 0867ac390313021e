use std::sync::Arc;

use actix_web::{Responder, get, post, web};
use common::{env_config::Config, error::Res, http::Success, jwt::JwtClaims, stripe};
use db::SubscriptionStore;
use plans::{PlanTier, PriceMap, get_plan_limits};

use crate::{
    dtos::sub::{CheckoutRequest, CheckoutResponse, CurrentSubscriptionResponse, PlansResponse},
    services::{self, pay::CheckoutParams},
};

/// Lists every plan in pricing-page order.
///
/// # Output
/// - Success: `{ "plans": [ { "id": "FREE", "name": "Free", "price": 0, ... }, ... ] }`
///
/// # Frontend Example
/// ```javascript
/// const { plans } = await (await fetch('/api/sub/plans')).json();
/// plans.filter(p => p.popular).forEach(p => console.log(p.name, p.price / 100));
/// ```
#[get("/plans")]
pub async fn get_plans() -> Res<impl Responder> {
    Success::ok(PlansResponse {
        plans: plans::plans(),
    })
}

/// Returns the usage limits of one plan tier.
///
/// # Input
/// - `tier`: Path parameter with the tier identifier, e.g. `PRO_MONTHLY`
///
/// # Output
/// - Success: the plan limits; `plans_per_month` is `-1` for unlimited tiers
/// - Error: 400 Bad Request for an unknown tier
#[get("/limits/{tier}")]
pub async fn get_limits(path: web::Path<String>) -> Res<impl Responder> {
    let tier = path.into_inner().parse::<PlanTier>()?;
    Success::ok(get_plan_limits(tier))
}

/// Retrieves the authenticated user's subscription.
///
/// Users who never subscribed get the implicit FREE record.
///
/// # Input
/// - `claims`: JWT claims of the authenticated user
/// - `subs`: Subscription store
///
/// # Output
/// - Success: `{ "subscription": {...}, "effective_plan": "FREE", "limits": {...} }`
/// - Error: 401 Unauthorized without a valid token
///
/// # Frontend Example
/// ```javascript
/// const response = await fetch('/api/dashboard/sub/current', {
///   headers: { 'Authorization': `Bearer ${token}` }
/// });
/// const { effective_plan, limits } = await response.json();
/// ```
#[get("/current")]
pub async fn get_current(
    claims: web::ReqData<JwtClaims>,
    subs: web::Data<Arc<dyn SubscriptionStore>>,
) -> Res<impl Responder> {
    let subscription = subs.load(&claims.user_id).await?;
    let effective_plan = subscription.effective_tier();

    Success::ok(CurrentSubscriptionResponse {
        limits: get_plan_limits(effective_plan),
        effective_plan,
        subscription,
    })
}

/// Starts a Stripe checkout for a paid plan.
///
/// # Input
/// - `claims`: JWT claims of the authenticated user
/// - `req`: JSON body `{ "plan": "FAMILY_MONTHLY" }`
///
/// # Output
/// - Success: `{ "url": "https://checkout.stripe.com/..." }` to redirect the browser to
/// - Error: 400 Bad Request for unknown or non-purchasable plans
#[post("/checkout")]
pub async fn post_checkout(
    claims: web::ReqData<JwtClaims>,
    req: web::Json<CheckoutRequest>,
    config: web::Data<Arc<Config>>,
    prices: web::Data<PriceMap>,
    subs: web::Data<Arc<dyn SubscriptionStore>>,
) -> Res<impl Responder> {
    let tier = req.plan.parse::<PlanTier>()?;
    let price_id = prices.price_for(tier)?;

    // reuse the Stripe customer of an earlier subscription
    let existing = subs.find(&claims.user_id).await?;
    let customer_id = existing.and_then(|record| record.stripe_customer_id);

    let success_url = format!("{}/dashboard?success=true", config.app_url);
    let cancel_url = format!("{}/pricing", config.app_url);

    let client = stripe::create_client(&config.stripe_secret_key);
    let session = services::pay::create_checkout_session(
        &client,
        CheckoutParams {
            user_id: &claims.user_id,
            price_id,
            customer_id: customer_id.as_deref(),
            customer_email: claims.email.as_deref(),
            success_url: &success_url,
            cancel_url: &cancel_url,
        },
    )
    .await?;

    log::info!(
        "Checkout session {} created for user {} on {}",
        session.id,
        claims.user_id,
        tier
    );

    Success::created(CheckoutResponse {
        url: session.url.unwrap_or_default(),
    })
}
