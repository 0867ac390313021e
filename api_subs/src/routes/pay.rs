use std::sync::Arc;

use actix_web::{HttpRequest, Responder, get, post, web};
use common::{
    env_config::Config,
    error::{AppError, Res},
    http::Success,
    stripe,
};
use db::SubscriptionStore;
use plans::PriceMap;
use serde_json::json;

use crate::{misc::event::to_billing_event, services};

/// Handles Stripe webhook events and reconciles them into subscription records.
///
/// # Input
/// - `payload`: Raw request body, verified against the `stripe-signature` header
/// - `config`: Application configuration with the webhook secret
///
/// # Output
/// - Success: 200 `{ "received": true, "outcome": "applied" }`
/// - Error: 400 for a missing or invalid signature or an unknown price,
///   500 when storage fails so that Stripe redelivers the event
///
/// # Note
/// This endpoint is called by Stripe, not by the frontend. Register
/// `https://yourapp.com/api/pay/webhook` in the Stripe Dashboard with these events:
/// - checkout.session.completed
/// - customer.subscription.updated
/// - customer.subscription.deleted
#[post("/webhook")]
pub async fn post_webhook(
    payload: String,
    req: HttpRequest,
    config: web::Data<Arc<Config>>,
    prices: web::Data<PriceMap>,
    subs: web::Data<Arc<dyn SubscriptionStore>>,
) -> Res<impl Responder> {
    let signature = match req.headers().get("stripe-signature") {
        Some(signature) => signature.to_str().unwrap_or(""),
        None => return Err(AppError::BadRequest("Stripe signature missing".to_string())),
    };

    let event = services::pay::construct_event(&payload, signature, &config.stripe_webhook_secret)?;
    log::info!("Processing webhook event {} ({})", event.id, event.type_);

    let client = stripe::create_client(&config.stripe_secret_key);
    let billing_event = to_billing_event(&client, event).await?;
    let outcome =
        services::reconciler::reconcile(subs.get_ref().as_ref(), &prices, billing_event).await?;

    Success::ok(json!({ "received": true, "outcome": outcome }))
}

/// Lets operators check that the webhook endpoint is reachable.
#[get("/webhook")]
pub async fn get_webhook() -> Res<impl Responder> {
    Success::ok(json!({
        "status": "Stripe webhook endpoint",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
