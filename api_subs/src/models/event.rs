use serde::Serialize;

/// Billing lifecycle notification, reduced to the fields the reconciler reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingEvent {
    pub id: String,
    /// Provider-side creation time, unix seconds.
    pub created: i64,
    pub kind: BillingEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingEventKind {
    CheckoutCompleted(CheckoutCompleted),
    SubscriptionUpdated(SubscriptionChange),
    SubscriptionDeleted(SubscriptionChange),
    Unrecognized(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutCompleted {
    /// `metadata.userId` of the checkout session.
    pub user_id: Option<String>,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub price_id: Option<String>,
    /// Provider status of the created subscription, e.g. `active`.
    pub status: Option<String>,
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionChange {
    pub user_id: Option<String>,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingUserId,
    UnknownCustomer,
    NoSubscription,
    /// The event concerns a subscription the record no longer tracks.
    OtherSubscription,
    Stale,
    Unhandled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Applied,
    /// The stored record already reflected the event.
    Unchanged,
    Skipped(SkipReason),
}
