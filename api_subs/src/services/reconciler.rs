//! Applies billing lifecycle notifications to subscription records.
//!
//! Every handler is idempotent. A notification whose target state is already
//! stored is `Unchanged`, and one created before the last applied notification
//! is `Skipped` so redeliveries and out-of-order arrivals never regress state.

use chrono::{DateTime, NaiveDateTime};
use common::error::{AppError, Res};
use db::{
    SubscriptionStore, dtos::subscription::SubscriptionUpsert,
    models::subscription::SubscriptionStatus,
};
use plans::PriceMap;

use crate::models::event::{
    BillingEvent, BillingEventKind, CheckoutCompleted, ReconcileOutcome, SkipReason,
    SubscriptionChange,
};

/// Provider subscription status as stored here.
pub fn map_provider_status(status: &str) -> SubscriptionStatus {
    match status {
        "active" | "trialing" => SubscriptionStatus::Active,
        "past_due" => SubscriptionStatus::PastDue,
        "unpaid" => SubscriptionStatus::Unpaid,
        _ => SubscriptionStatus::Canceled,
    }
}

fn timestamp_to_naive(ts: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(ts, 0).map(|dt| dt.naive_utc())
}

fn already_applied(last_event_at: Option<i64>, created: i64) -> bool {
    last_event_at.is_some_and(|at| at >= created)
}

fn is_stale(last_event_at: Option<i64>, created: i64) -> bool {
    last_event_at.is_some_and(|at| at > created)
}

pub async fn reconcile(
    store: &dyn SubscriptionStore,
    prices: &PriceMap,
    event: BillingEvent,
) -> Res<ReconcileOutcome> {
    let outcome = match &event.kind {
        BillingEventKind::CheckoutCompleted(checkout) => {
            apply_checkout(store, prices, &event, checkout).await?
        }
        BillingEventKind::SubscriptionUpdated(change) => {
            let status = map_provider_status(&change.status);
            apply_status(store, &event, change, status).await?
        }
        BillingEventKind::SubscriptionDeleted(change) => {
            apply_status(store, &event, change, SubscriptionStatus::Canceled).await?
        }
        BillingEventKind::Unrecognized(event_type) => {
            log::info!("Ignoring billing event {} of type {}", event.id, event_type);
            ReconcileOutcome::Skipped(SkipReason::Unhandled)
        }
    };

    match outcome {
        ReconcileOutcome::Skipped(reason) => {
            log::warn!("Billing event {} skipped: {:?}", event.id, reason)
        }
        other => log::info!("Billing event {} reconciled: {:?}", event.id, other),
    }
    Ok(outcome)
}

async fn apply_checkout(
    store: &dyn SubscriptionStore,
    prices: &PriceMap,
    event: &BillingEvent,
    checkout: &CheckoutCompleted,
) -> Res<ReconcileOutcome> {
    let Some(user_id) = checkout.user_id.as_deref() else {
        log::error!("Checkout event {} carries no userId in its metadata", event.id);
        return Ok(ReconcileOutcome::Skipped(SkipReason::MissingUserId));
    };

    let price_id = checkout.price_id.as_deref().ok_or_else(|| {
        AppError::BadRequest(format!("Checkout event {} has no price", event.id))
    })?;
    let plan = prices.tier_for(price_id)?;
    let status = if checkout.status.as_deref() == Some("active") {
        SubscriptionStatus::Active
    } else {
        SubscriptionStatus::Canceled
    };
    let current_period_end = checkout.current_period_end.and_then(timestamp_to_naive);

    let stored = store.find(user_id).await?;
    let unchanged = stored.as_ref().is_some_and(|record| {
        record.plan == plan
            && record.status == status
            && record.stripe_price_id.as_deref() == Some(price_id)
            && record.stripe_customer_id == checkout.customer_id
            && record.stripe_subscription_id == checkout.subscription_id
            && record.current_period_end == current_period_end
    });

    if let Some(record) = &stored {
        if is_stale(record.last_event_at, event.created) {
            return Ok(ReconcileOutcome::Skipped(SkipReason::Stale));
        }
        if unchanged && already_applied(record.last_event_at, event.created) {
            return Ok(ReconcileOutcome::Unchanged);
        }
    }

    let fields = SubscriptionUpsert {
        plan: Some(plan),
        status: Some(status),
        stripe_customer_id: checkout.customer_id.clone(),
        stripe_subscription_id: checkout.subscription_id.clone(),
        stripe_price_id: Some(price_id.to_string()),
        current_period_end,
        event_at: Some(event.created),
    };

    match store.upsert(user_id, fields).await? {
        None => Ok(ReconcileOutcome::Skipped(SkipReason::Stale)),
        Some(_) if unchanged => Ok(ReconcileOutcome::Unchanged),
        Some(record) => {
            log::info!(
                "User {} is now on {} ({})",
                user_id,
                record.plan,
                record.status
            );
            Ok(ReconcileOutcome::Applied)
        }
    }
}

async fn apply_status(
    store: &dyn SubscriptionStore,
    event: &BillingEvent,
    change: &SubscriptionChange,
    status: SubscriptionStatus,
) -> Res<ReconcileOutcome> {
    let user_id = match (&change.user_id, &change.customer_id) {
        (Some(user_id), _) => user_id.clone(),
        (None, Some(customer_id)) => match store.find_user_by_customer(customer_id).await? {
            Some(user_id) => user_id,
            None => {
                log::warn!("No subscription belongs to customer {}", customer_id);
                return Ok(ReconcileOutcome::Skipped(SkipReason::UnknownCustomer));
            }
        },
        (None, None) => return Ok(ReconcileOutcome::Skipped(SkipReason::MissingUserId)),
    };

    let Some(record) = store.find(&user_id).await? else {
        return Ok(ReconcileOutcome::Skipped(SkipReason::NoSubscription));
    };
    if let (Some(stored), Some(incoming)) = (&record.stripe_subscription_id, &change.subscription_id) {
        if stored != incoming {
            log::warn!(
                "User {} is on subscription {}, ignoring change to {}",
                user_id,
                stored,
                incoming
            );
            return Ok(ReconcileOutcome::Skipped(SkipReason::OtherSubscription));
        }
    }
    if is_stale(record.last_event_at, event.created) {
        return Ok(ReconcileOutcome::Skipped(SkipReason::Stale));
    }
    if record.status == status && already_applied(record.last_event_at, event.created) {
        return Ok(ReconcileOutcome::Unchanged);
    }

    match store
        .update_status(&user_id, status, Some(event.created))
        .await?
    {
        None => Ok(ReconcileOutcome::Skipped(SkipReason::Stale)),
        // still written so the newer event time guards later arrivals
        Some(_) if record.status == status => Ok(ReconcileOutcome::Unchanged),
        Some(_) => Ok(ReconcileOutcome::Applied),
    }
}

#[cfg(test)]
mod tests {
    use common::env_config::StripePrices;
    use db::InMemoryStore;
    use limiter::gate::check_family_access;
    use plans::PlanTier;

    use super::*;

    fn prices() -> PriceMap {
        PriceMap::from_config(&StripePrices {
            pro_monthly: "price_pro_m".to_string(),
            pro_annual: "price_pro_y".to_string(),
            family_monthly: "price_family".to_string(),
        })
    }

    fn checkout(id: &str, created: i64, user: Option<&str>, price: &str) -> BillingEvent {
        BillingEvent {
            id: id.to_string(),
            created,
            kind: BillingEventKind::CheckoutCompleted(CheckoutCompleted {
                user_id: user.map(str::to_string),
                customer_id: Some("cus_1".to_string()),
                subscription_id: Some("sub_1".to_string()),
                price_id: Some(price.to_string()),
                status: Some("active".to_string()),
                current_period_end: Some(1_800_000_000),
            }),
        }
    }

    fn updated(id: &str, created: i64, status: &str) -> BillingEvent {
        BillingEvent {
            id: id.to_string(),
            created,
            kind: BillingEventKind::SubscriptionUpdated(SubscriptionChange {
                user_id: None,
                customer_id: Some("cus_1".to_string()),
                subscription_id: Some("sub_1".to_string()),
                status: status.to_string(),
            }),
        }
    }

    fn deleted(id: &str, created: i64) -> BillingEvent {
        deleted_subscription(id, created, "sub_1")
    }

    fn deleted_subscription(id: &str, created: i64, subscription: &str) -> BillingEvent {
        BillingEvent {
            id: id.to_string(),
            created,
            kind: BillingEventKind::SubscriptionDeleted(SubscriptionChange {
                user_id: None,
                customer_id: Some("cus_1".to_string()),
                subscription_id: Some(subscription.to_string()),
                status: "canceled".to_string(),
            }),
        }
    }

    #[test]
    fn provider_statuses_map_fail_closed() {
        assert_eq!(map_provider_status("active"), SubscriptionStatus::Active);
        assert_eq!(map_provider_status("trialing"), SubscriptionStatus::Active);
        assert_eq!(map_provider_status("past_due"), SubscriptionStatus::PastDue);
        assert_eq!(map_provider_status("unpaid"), SubscriptionStatus::Unpaid);
        assert_eq!(map_provider_status("incomplete"), SubscriptionStatus::Canceled);
        assert_eq!(map_provider_status("paused"), SubscriptionStatus::Canceled);
    }

    #[tokio::test]
    async fn family_checkout_grants_family_access() {
        let store = InMemoryStore::new();
        let outcome = reconcile(&store, &prices(), checkout("evt_1", 100, Some("u1"), "price_family"))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Applied);

        let record = store.load("u1").await.unwrap();
        assert_eq!(record.plan, PlanTier::FamilyMonthly);
        assert_eq!(record.stripe_customer_id.as_deref(), Some("cus_1"));
        assert_eq!(record.stripe_price_id.as_deref(), Some("price_family"));
        assert!(record.current_period_end.is_some());

        assert!(check_family_access(&store, "u1").await.has_access);
    }

    #[tokio::test]
    async fn redelivered_checkout_is_unchanged() {
        let store = InMemoryStore::new();
        let event = checkout("evt_1", 100, Some("u1"), "price_pro_m");
        reconcile(&store, &prices(), event.clone()).await.unwrap();
        let again = reconcile(&store, &prices(), event).await.unwrap();
        assert_eq!(again, ReconcileOutcome::Unchanged);
    }

    #[tokio::test]
    async fn checkout_without_user_is_skipped() {
        let store = InMemoryStore::new();
        let outcome = reconcile(&store, &prices(), checkout("evt_1", 100, None, "price_pro_m"))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Skipped(SkipReason::MissingUserId));
        assert!(store.find_user_by_customer("cus_1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_price_is_rejected() {
        let store = InMemoryStore::new();
        let result = reconcile(&store, &prices(), checkout("evt_1", 100, Some("u1"), "price_gold")).await;
        assert!(matches!(result, Err(AppError::UnknownPlan(_))));
        assert!(store.find("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn deleting_twice_cancels_once() {
        let store = InMemoryStore::new();
        reconcile(&store, &prices(), checkout("evt_1", 100, Some("u1"), "price_pro_y"))
            .await
            .unwrap();

        let first = reconcile(&store, &prices(), deleted("evt_2", 200)).await.unwrap();
        assert_eq!(first, ReconcileOutcome::Applied);
        assert_eq!(store.load("u1").await.unwrap().status, SubscriptionStatus::Canceled);

        let second = reconcile(&store, &prices(), deleted("evt_2", 200)).await.unwrap();
        assert_eq!(second, ReconcileOutcome::Unchanged);
        assert_eq!(store.load("u1").await.unwrap().status, SubscriptionStatus::Canceled);
        assert_eq!(
            store.find_user_by_customer("cus_1").await.unwrap().as_deref(),
            Some("u1")
        );
    }

    #[tokio::test]
    async fn older_update_after_delete_is_ignored() {
        let store = InMemoryStore::new();
        reconcile(&store, &prices(), checkout("evt_1", 100, Some("u1"), "price_pro_m"))
            .await
            .unwrap();
        reconcile(&store, &prices(), deleted("evt_3", 300)).await.unwrap();

        let late = reconcile(&store, &prices(), updated("evt_2", 200, "active"))
            .await
            .unwrap();
        assert_eq!(late, ReconcileOutcome::Skipped(SkipReason::Stale));
        assert_eq!(store.load("u1").await.unwrap().status, SubscriptionStatus::Canceled);
    }

    #[tokio::test]
    async fn same_status_still_advances_event_time() {
        let store = InMemoryStore::new();
        reconcile(&store, &prices(), checkout("evt_1", 100, Some("u1"), "price_pro_m"))
            .await
            .unwrap();
        reconcile(&store, &prices(), updated("evt_2", 150, "canceled")).await.unwrap();

        let outcome = reconcile(&store, &prices(), deleted("evt_4", 400)).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Unchanged);

        let late = reconcile(&store, &prices(), updated("evt_3", 300, "active"))
            .await
            .unwrap();
        assert_eq!(late, ReconcileOutcome::Skipped(SkipReason::Stale));
    }

    #[tokio::test]
    async fn deleting_a_replaced_subscription_keeps_the_new_one() {
        let store = InMemoryStore::new();
        reconcile(&store, &prices(), checkout("evt_1", 100, Some("u1"), "price_family"))
            .await
            .unwrap();

        let outcome = reconcile(&store, &prices(), deleted_subscription("evt_2", 200, "sub_old"))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Skipped(SkipReason::OtherSubscription));

        let record = store.load("u1").await.unwrap();
        assert_eq!(record.stripe_subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(record.status, SubscriptionStatus::Active);
        assert!(check_family_access(&store, "u1").await.has_access);
    }

    #[tokio::test]
    async fn update_maps_provider_status() {
        let store = InMemoryStore::new();
        reconcile(&store, &prices(), checkout("evt_1", 100, Some("u1"), "price_family"))
            .await
            .unwrap();

        let outcome = reconcile(&store, &prices(), updated("evt_2", 200, "past_due"))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Applied);
        assert_eq!(store.load("u1").await.unwrap().status, SubscriptionStatus::PastDue);
        assert!(!check_family_access(&store, "u1").await.has_access);
    }

    #[tokio::test]
    async fn unknown_customer_is_a_no_op() {
        let store = InMemoryStore::new();
        let outcome = reconcile(&store, &prices(), deleted("evt_1", 100)).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Skipped(SkipReason::UnknownCustomer));
    }

    #[tokio::test]
    async fn metadata_user_without_record_is_skipped() {
        let store = InMemoryStore::new();
        let event = BillingEvent {
            id: "evt_1".to_string(),
            created: 100,
            kind: BillingEventKind::SubscriptionUpdated(SubscriptionChange {
                user_id: Some("u9".to_string()),
                customer_id: None,
                subscription_id: None,
                status: "active".to_string(),
            }),
        };
        let outcome = reconcile(&store, &prices(), event).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Skipped(SkipReason::NoSubscription));
        assert!(store.find("u9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unrecognized_events_are_ignored() {
        let store = InMemoryStore::new();
        let event = BillingEvent {
            id: "evt_1".to_string(),
            created: 100,
            kind: BillingEventKind::Unrecognized("invoice.paid".to_string()),
        };
        let outcome = reconcile(&store, &prices(), event).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Skipped(SkipReason::Unhandled));
    }

    #[tokio::test]
    async fn storage_failures_surface() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);
        let result = reconcile(&store, &prices(), checkout("evt_1", 100, Some("u1"), "price_pro_m")).await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }
}
