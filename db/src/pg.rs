use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use common::error::Res;
use sqlx::PgPool;

use crate::{
    dtos::subscription::SubscriptionUpsert,
    models::subscription::{SubscriptionRecord, SubscriptionStatus},
    store::{SubscriptionStore, UsageStore},
    subscription, usage,
};

/// Postgres-backed store sharing the server's connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionStore for PgStore {
    async fn find(&self, user_id: &str) -> Res<Option<SubscriptionRecord>> {
        subscription::get_subscription_by_user_id(&*self.pool, user_id).await
    }

    async fn upsert(
        &self,
        user_id: &str,
        fields: SubscriptionUpsert,
    ) -> Res<Option<SubscriptionRecord>> {
        subscription::upsert_subscription(&*self.pool, user_id, fields).await
    }

    async fn find_user_by_customer(&self, customer_id: &str) -> Res<Option<String>> {
        subscription::get_user_id_by_customer_id(&*self.pool, customer_id).await
    }

    async fn update_status(
        &self,
        user_id: &str,
        status: SubscriptionStatus,
        event_at: Option<i64>,
    ) -> Res<Option<SubscriptionRecord>> {
        subscription::update_subscription_status(&*self.pool, user_id, status, event_at).await
    }

    async fn delete(&self, user_id: &str) -> Res<bool> {
        subscription::delete_subscription(&*self.pool, user_id).await
    }
}

#[async_trait]
impl UsageStore for PgStore {
    async fn generations_in_window(
        &self,
        user_id: &str,
        window_start: NaiveDateTime,
    ) -> Res<i64> {
        usage::get_generation_count(&*self.pool, user_id, window_start).await
    }

    async fn try_record_generation(
        &self,
        user_id: &str,
        window_start: NaiveDateTime,
        limit: Option<i64>,
    ) -> Res<Option<i64>> {
        usage::increment_generation_within(&*self.pool, user_id, window_start, limit).await
    }

    async fn bonus_remaining(&self, user_id: &str) -> Res<i64> {
        usage::get_bonus_remaining(&*self.pool, user_id).await
    }

    async fn grant_feedback_bonus(&self, user_id: &str, amount: i64) -> Res<Option<i64>> {
        usage::grant_feedback_bonus(&*self.pool, user_id, amount).await
    }

    async fn consume_bonus_generation(
        &self,
        user_id: &str,
        window_start: NaiveDateTime,
    ) -> Res<Option<i64>> {
        usage::consume_bonus_generation(&*self.pool, user_id, window_start).await
    }
}
