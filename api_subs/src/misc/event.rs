use common::error::Res;
use stripe::{CheckoutSession, Client, Event, EventObject, EventType, Subscription};

use crate::{
    models::event::{BillingEvent, BillingEventKind, CheckoutCompleted, SubscriptionChange},
    services,
};

/// Metadata key the checkout flow stores the account id under.
pub const USER_ID_METADATA_KEY: &str = "userId";

/// Reduces a verified Stripe event to a [`BillingEvent`].
///
/// A completed checkout only references its subscription, so that
/// subscription is retrieved to learn the price, status and period end.
/// Checkouts without an owner are passed on without asking Stripe.
pub async fn to_billing_event(client: &Client, event: Event) -> Res<BillingEvent> {
    let id = event.id.to_string();
    let created = event.created;

    let kind = match (event.type_, event.data.object) {
        (EventType::CheckoutSessionCompleted, EventObject::CheckoutSession(session)) => {
            BillingEventKind::CheckoutCompleted(checkout_event(client, &session).await?)
        }
        (EventType::CustomerSubscriptionUpdated, EventObject::Subscription(subscription)) => {
            BillingEventKind::SubscriptionUpdated(change_from(&subscription))
        }
        (EventType::CustomerSubscriptionDeleted, EventObject::Subscription(subscription)) => {
            BillingEventKind::SubscriptionDeleted(change_from(&subscription))
        }
        (event_type, _) => BillingEventKind::Unrecognized(event_type.to_string()),
    };

    Ok(BillingEvent { id, created, kind })
}

async fn checkout_event(client: &Client, session: &CheckoutSession) -> Res<CheckoutCompleted> {
    let user_id = checkout_user_id(session);
    let subscription = match (&user_id, &session.subscription) {
        (Some(_), Some(subscription)) => {
            Some(services::pay::retrieve_subscription(client, &subscription.id()).await?)
        }
        _ => None,
    };
    Ok(checkout_from(session, user_id, subscription.as_ref()))
}

fn checkout_user_id(session: &CheckoutSession) -> Option<String> {
    session
        .metadata
        .as_ref()
        .and_then(|metadata| metadata.get(USER_ID_METADATA_KEY))
        .cloned()
        .or_else(|| session.client_reference_id.clone())
}

fn checkout_from(
    session: &CheckoutSession,
    user_id: Option<String>,
    subscription: Option<&Subscription>,
) -> CheckoutCompleted {
    CheckoutCompleted {
        user_id,
        customer_id: session
            .customer
            .as_ref()
            .map(|customer| customer.id().to_string()),
        subscription_id: session
            .subscription
            .as_ref()
            .map(|subscription| subscription.id().to_string()),
        price_id: subscription.and_then(first_price_id),
        status: subscription.map(|subscription| subscription.status.as_str().to_string()),
        current_period_end: subscription.map(|subscription| subscription.current_period_end),
    }
}

fn change_from(subscription: &Subscription) -> SubscriptionChange {
    SubscriptionChange {
        user_id: subscription.metadata.get(USER_ID_METADATA_KEY).cloned(),
        customer_id: Some(subscription.customer.id().to_string()),
        subscription_id: Some(subscription.id.to_string()),
        status: subscription.status.as_str().to_string(),
    }
}

fn first_price_id(subscription: &Subscription) -> Option<String> {
    subscription
        .items
        .data
        .first()
        .and_then(|item| item.price.as_ref())
        .map(|price| price.id.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use stripe::{Expandable, SubscriptionStatus};

    use super::*;

    fn session(metadata_user: Option<&str>, reference: Option<&str>) -> CheckoutSession {
        CheckoutSession {
            metadata: metadata_user.map(|user| {
                HashMap::from([(USER_ID_METADATA_KEY.to_string(), user.to_string())])
            }),
            client_reference_id: reference.map(str::to_string),
            subscription: Some(Expandable::Id("sub_1".parse().unwrap())),
            ..Default::default()
        }
    }

    #[test]
    fn checkout_owner_prefers_metadata() {
        assert_eq!(
            checkout_user_id(&session(Some("u1"), Some("u2"))).as_deref(),
            Some("u1")
        );
        assert_eq!(
            checkout_user_id(&session(None, Some("u2"))).as_deref(),
            Some("u2")
        );
        assert_eq!(checkout_user_id(&session(None, None)), None);
    }

    #[tokio::test]
    async fn ownerless_checkout_does_not_reach_stripe() {
        // nothing listens here, so any request would fail
        let client = Client::from_url("http://127.0.0.1:9", "sk_test");
        let checkout = checkout_event(&client, &session(None, None)).await.unwrap();

        assert_eq!(checkout.user_id, None);
        assert_eq!(checkout.subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(checkout.price_id, None);
    }

    #[test]
    fn subscription_changes_carry_their_id() {
        let subscription = Subscription {
            id: "sub_9".parse().unwrap(),
            customer: Expandable::Id("cus_1".parse().unwrap()),
            status: SubscriptionStatus::PastDue,
            metadata: HashMap::from([(USER_ID_METADATA_KEY.to_string(), "u1".to_string())]),
            ..Default::default()
        };

        let change = change_from(&subscription);
        assert_eq!(change.user_id.as_deref(), Some("u1"));
        assert_eq!(change.customer_id.as_deref(), Some("cus_1"));
        assert_eq!(change.subscription_id.as_deref(), Some("sub_9"));
        assert_eq!(change.status, "past_due");
    }
}
