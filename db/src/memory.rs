use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use common::error::{AppError, Res};
use plans::PlanTier;

use crate::{
    dtos::subscription::SubscriptionUpsert,
    models::subscription::{SubscriptionRecord, SubscriptionStatus},
    store::{SubscriptionStore, UsageStore},
};

#[derive(Debug, Default)]
struct Bonus {
    remaining: i64,
    feedback_granted: bool,
}

/// Process-local store with the same write semantics as [`PgStore`](crate::PgStore).
#[derive(Debug, Default)]
pub struct InMemoryStore {
    subscriptions: Mutex<HashMap<String, SubscriptionRecord>>,
    usage: Mutex<HashMap<(String, NaiveDateTime), i64>>,
    bonuses: Mutex<HashMap<String, Bonus>>,
    unavailable: AtomicBool,
}

fn is_stale(stored: Option<i64>, incoming: Option<i64>) -> bool {
    matches!((stored, incoming), (Some(stored), Some(incoming)) if incoming < stored)
}

fn lock<T>(mutex: &Mutex<T>) -> Res<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| AppError::Internal("In-memory store lock poisoned".to_string()))
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail like an unreachable database.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Res<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for InMemoryStore {
    async fn find(&self, user_id: &str) -> Res<Option<SubscriptionRecord>> {
        self.check_available()?;
        Ok(lock(&self.subscriptions)?.get(user_id).cloned())
    }

    async fn upsert(
        &self,
        user_id: &str,
        fields: SubscriptionUpsert,
    ) -> Res<Option<SubscriptionRecord>> {
        self.check_available()?;
        let mut subscriptions = lock(&self.subscriptions)?;
        let now = Utc::now().naive_utc();

        let record = match subscriptions.get_mut(user_id) {
            Some(existing) => {
                if is_stale(existing.last_event_at, fields.event_at) {
                    return Ok(None);
                }
                if let Some(plan) = fields.plan {
                    existing.plan = plan;
                }
                if let Some(status) = fields.status {
                    existing.status = status;
                }
                if fields.stripe_customer_id.is_some() {
                    existing.stripe_customer_id = fields.stripe_customer_id;
                }
                if fields.stripe_subscription_id.is_some() {
                    existing.stripe_subscription_id = fields.stripe_subscription_id;
                }
                if fields.stripe_price_id.is_some() {
                    existing.stripe_price_id = fields.stripe_price_id;
                }
                if fields.current_period_end.is_some() {
                    existing.current_period_end = fields.current_period_end;
                }
                existing.last_event_at = existing.last_event_at.max(fields.event_at);
                existing.updated_at = Some(now);
                existing.clone()
            }
            None => {
                let record = SubscriptionRecord {
                    user_id: user_id.to_string(),
                    plan: fields.plan.unwrap_or(PlanTier::Free),
                    status: fields.status.unwrap_or(SubscriptionStatus::Active),
                    stripe_customer_id: fields.stripe_customer_id,
                    stripe_subscription_id: fields.stripe_subscription_id,
                    stripe_price_id: fields.stripe_price_id,
                    current_period_end: fields.current_period_end,
                    last_event_at: fields.event_at,
                    created_at: Some(now),
                    updated_at: Some(now),
                };
                subscriptions.insert(user_id.to_string(), record.clone());
                record
            }
        };

        Ok(Some(record))
    }

    async fn find_user_by_customer(&self, customer_id: &str) -> Res<Option<String>> {
        self.check_available()?;
        let subscriptions = lock(&self.subscriptions)?;
        // Lowest user id wins so repeated lookups agree with each other.
        Ok(subscriptions
            .values()
            .filter(|record| record.stripe_customer_id.as_deref() == Some(customer_id))
            .map(|record| record.user_id.clone())
            .min())
    }

    async fn update_status(
        &self,
        user_id: &str,
        status: SubscriptionStatus,
        event_at: Option<i64>,
    ) -> Res<Option<SubscriptionRecord>> {
        self.check_available()?;
        let mut subscriptions = lock(&self.subscriptions)?;
        let Some(existing) = subscriptions.get_mut(user_id) else {
            return Ok(None);
        };
        if is_stale(existing.last_event_at, event_at) {
            return Ok(None);
        }
        existing.status = status;
        existing.last_event_at = existing.last_event_at.max(event_at);
        existing.updated_at = Some(Utc::now().naive_utc());
        Ok(Some(existing.clone()))
    }

    async fn delete(&self, user_id: &str) -> Res<bool> {
        self.check_available()?;
        Ok(lock(&self.subscriptions)?.remove(user_id).is_some())
    }
}

#[async_trait]
impl UsageStore for InMemoryStore {
    async fn generations_in_window(
        &self,
        user_id: &str,
        window_start: NaiveDateTime,
    ) -> Res<i64> {
        self.check_available()?;
        let usage = lock(&self.usage)?;
        Ok(usage
            .get(&(user_id.to_string(), window_start))
            .copied()
            .unwrap_or(0))
    }

    async fn try_record_generation(
        &self,
        user_id: &str,
        window_start: NaiveDateTime,
        limit: Option<i64>,
    ) -> Res<Option<i64>> {
        self.check_available()?;
        let mut usage = lock(&self.usage)?;
        let count = usage.entry((user_id.to_string(), window_start)).or_insert(0);
        match limit {
            Some(limit) if *count >= limit => Ok(None),
            _ => {
                *count += 1;
                Ok(Some(*count))
            }
        }
    }

    async fn bonus_remaining(&self, user_id: &str) -> Res<i64> {
        self.check_available()?;
        let bonuses = lock(&self.bonuses)?;
        Ok(bonuses.get(user_id).map(|bonus| bonus.remaining).unwrap_or(0))
    }

    async fn grant_feedback_bonus(&self, user_id: &str, amount: i64) -> Res<Option<i64>> {
        self.check_available()?;
        let mut bonuses = lock(&self.bonuses)?;
        let bonus = bonuses.entry(user_id.to_string()).or_default();
        if bonus.feedback_granted {
            return Ok(None);
        }
        bonus.feedback_granted = true;
        bonus.remaining += amount;
        Ok(Some(bonus.remaining))
    }

    async fn consume_bonus_generation(
        &self,
        user_id: &str,
        window_start: NaiveDateTime,
    ) -> Res<Option<i64>> {
        self.check_available()?;
        // both guards are held before anything changes
        let mut bonuses = lock(&self.bonuses)?;
        let mut usage = lock(&self.usage)?;
        let Some(bonus) = bonuses.get_mut(user_id).filter(|bonus| bonus.remaining > 0) else {
            return Ok(None);
        };
        bonus.remaining -= 1;
        let count = usage.entry((user_id.to_string(), window_start)).or_insert(0);
        *count += 1;
        Ok(Some(*count))
    }
}
