//! Storage seams used by the access gate and the billing reconciler.
//!
//! [`PgStore`](crate::PgStore) is the production implementation and
//! [`InMemoryStore`](crate::InMemoryStore) backs tests. Every mutating method
//! maps to a single statement, so concurrent requests for one user rely on
//! row-level atomicity instead of application locks.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use common::error::Res;

use crate::{
    dtos::subscription::SubscriptionUpsert,
    models::subscription::{SubscriptionRecord, SubscriptionStatus},
};

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// The stored record, if the user has one.
    async fn find(&self, user_id: &str) -> Res<Option<SubscriptionRecord>>;

    /// The stored record or the implicit FREE default. Never fails with not-found.
    async fn load(&self, user_id: &str) -> Res<SubscriptionRecord> {
        Ok(self
            .find(user_id)
            .await?
            .unwrap_or_else(|| SubscriptionRecord::free(user_id)))
    }

    /// Creates or merges the user's record.
    ///
    /// Returns `None` when `fields.event_at` is older than the last billing
    /// event already applied; nothing is written in that case.
    async fn upsert(
        &self,
        user_id: &str,
        fields: SubscriptionUpsert,
    ) -> Res<Option<SubscriptionRecord>>;

    /// Owner of a Stripe customer. Zero matches is `None`, not an error.
    async fn find_user_by_customer(&self, customer_id: &str) -> Res<Option<String>>;

    /// Sets the status of an existing record.
    ///
    /// Returns `None` when the user has no record or a newer event was applied.
    async fn update_status(
        &self,
        user_id: &str,
        status: SubscriptionStatus,
        event_at: Option<i64>,
    ) -> Res<Option<SubscriptionRecord>>;

    /// Removes the record. The auth service calls this when it deletes an
    /// account; no route here exposes it. Returns whether a row existed.
    async fn delete(&self, user_id: &str) -> Res<bool>;
}

#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Generations recorded for the user in the window starting at `window_start`.
    async fn generations_in_window(&self, user_id: &str, window_start: NaiveDateTime)
    -> Res<i64>;

    /// Records one generation unless the window already holds `limit` of them.
    ///
    /// Returns the new count, or `None` when the limit was reached.
    /// `limit = None` never refuses.
    async fn try_record_generation(
        &self,
        user_id: &str,
        window_start: NaiveDateTime,
        limit: Option<i64>,
    ) -> Res<Option<i64>>;

    async fn bonus_remaining(&self, user_id: &str) -> Res<i64>;

    /// Adds `amount` bonus generations the first time the user sends feedback.
    ///
    /// Returns the new balance, or `None` when the bonus was already granted.
    async fn grant_feedback_bonus(&self, user_id: &str, amount: i64) -> Res<Option<i64>>;

    /// Takes one bonus generation and records it past the window's limit,
    /// as one atomic write. Returns the new count, or `None` when the balance
    /// is empty.
    async fn consume_bonus_generation(
        &self,
        user_id: &str,
        window_start: NaiveDateTime,
    ) -> Res<Option<i64>>;
}
