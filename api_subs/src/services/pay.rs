use std::collections::HashMap;

use common::error::{AppError, Res};
use stripe::{
    CheckoutSession, CheckoutSessionMode, Client, CreateCheckoutSession,
    CreateCheckoutSessionLineItems, CreateCheckoutSessionSubscriptionData, CustomerId, Event,
    Subscription, SubscriptionId, Webhook,
};

use crate::misc::event::USER_ID_METADATA_KEY;

/// What a checkout session is created for.
pub struct CheckoutParams<'a> {
    pub user_id: &'a str,
    pub price_id: &'a str,
    pub customer_id: Option<&'a str>,
    pub customer_email: Option<&'a str>,
    pub success_url: &'a str,
    pub cancel_url: &'a str,
}

/// Creates a subscription checkout session for one paid plan.
///
/// `metadata.userId` is set on the session and on the subscription it
/// creates, so later lifecycle events resolve to the same account.
pub async fn create_checkout_session(
    client: &Client,
    params: CheckoutParams<'_>,
) -> Res<CheckoutSession> {
    let metadata = HashMap::from([(USER_ID_METADATA_KEY.to_string(), params.user_id.to_string())]);

    let customer = params
        .customer_id
        .map(|id| {
            id.parse::<CustomerId>().map_err(|e| {
                AppError::Internal(format!("Failed to parse customer id: {}. {}", id, e))
            })
        })
        .transpose()?;
    // Stripe refuses an email next to an existing customer
    let customer_email = if customer.is_some() {
        None
    } else {
        params.customer_email
    };

    let create = CreateCheckoutSession {
        payment_method_types: Some(vec![stripe::CreateCheckoutSessionPaymentMethodTypes::Card]),
        line_items: Some(vec![CreateCheckoutSessionLineItems {
            price: Some(params.price_id.to_string()),
            quantity: Some(1),
            ..Default::default()
        }]),
        mode: Some(CheckoutSessionMode::Subscription),
        success_url: Some(params.success_url),
        cancel_url: Some(params.cancel_url),
        client_reference_id: Some(params.user_id),
        customer,
        customer_email,
        metadata: Some(metadata.clone()),
        subscription_data: Some(CreateCheckoutSessionSubscriptionData {
            metadata: Some(metadata),
            ..Default::default()
        }),
        ..Default::default()
    };
    CheckoutSession::create(client, create)
        .await
        .map_err(AppError::from)
}

pub async fn retrieve_subscription(client: &Client, id: &SubscriptionId) -> Res<Subscription> {
    Subscription::retrieve(client, id, &[])
        .await
        .map_err(AppError::from)
}

/// Verifies the payload signature and parses the event.
/// Requires the webhook signing secret.
pub fn construct_event(payload: &str, signature: &str, webhook_secret: &str) -> Res<Event> {
    Webhook::construct_event(payload, signature, webhook_secret).map_err(|e| {
        log::error!("Error constructing webhook event: {}", e);
        AppError::from(e)
    })
}
