use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};

use crate::{
    dtos::subscription::SubscriptionUpsert,
    models::subscription::{SubscriptionRecord, SubscriptionRow, SubscriptionStatus},
};

const RETURNING: &str = "user_id, plan, status, stripe_customer_id, stripe_subscription_id, \
     stripe_price_id, current_period_end, last_event_at, created_at, updated_at";

pub async fn get_subscription_by_user_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: &str,
) -> Res<Option<SubscriptionRecord>> {
    sqlx::query_as::<_, SubscriptionRow>(&format!(
        "SELECT {} FROM subscriptions WHERE user_id = $1",
        RETURNING
    ))
    .bind(user_id)
    .fetch_optional(executor)
    .await
    .map(|row| row.map(SubscriptionRecord::from))
    .map_err(AppError::from)
}

pub async fn get_user_id_by_customer_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    customer_id: &str,
) -> Res<Option<String>> {
    sqlx::query_scalar::<_, String>(
        "SELECT user_id FROM subscriptions WHERE stripe_customer_id = $1 LIMIT 1",
    )
    .bind(customer_id)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

/// Single-statement upsert keyed by the unique `user_id`.
/// Stale billing events are filtered by the `WHERE` on the conflict branch.
pub async fn upsert_subscription<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: &str,
    data: SubscriptionUpsert,
) -> Res<Option<SubscriptionRecord>> {
    sqlx::query_as::<_, SubscriptionRow>(&format!(
        r#"
        INSERT INTO subscriptions (user_id, plan, status, stripe_customer_id,
            stripe_subscription_id, stripe_price_id, current_period_end, last_event_at)
        VALUES ($1, COALESCE($2, 'FREE'), COALESCE($3, 'active'), $4, $5, $6, $7, $8)
        ON CONFLICT (user_id) DO UPDATE SET
            plan = COALESCE($2, subscriptions.plan),
            status = COALESCE($3, subscriptions.status),
            stripe_customer_id = COALESCE($4, subscriptions.stripe_customer_id),
            stripe_subscription_id = COALESCE($5, subscriptions.stripe_subscription_id),
            stripe_price_id = COALESCE($6, subscriptions.stripe_price_id),
            current_period_end = COALESCE($7, subscriptions.current_period_end),
            last_event_at = GREATEST(subscriptions.last_event_at, $8),
            updated_at = NOW()
        WHERE $8::BIGINT IS NULL
            OR subscriptions.last_event_at IS NULL
            OR subscriptions.last_event_at <= $8
        RETURNING {}
        "#,
        RETURNING
    ))
    .bind(user_id)
    .bind(data.plan.map(|plan| plan.as_str()))
    .bind(data.status.map(|status| status.as_str()))
    .bind(data.stripe_customer_id)
    .bind(data.stripe_subscription_id)
    .bind(data.stripe_price_id)
    .bind(data.current_period_end)
    .bind(data.event_at)
    .fetch_optional(executor)
    .await
    .map(|row| row.map(SubscriptionRecord::from))
    .map_err(AppError::from)
}

pub async fn update_subscription_status<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: &str,
    status: SubscriptionStatus,
    event_at: Option<i64>,
) -> Res<Option<SubscriptionRecord>> {
    sqlx::query_as::<_, SubscriptionRow>(&format!(
        r#"
        UPDATE subscriptions
        SET status = $2,
            last_event_at = GREATEST(last_event_at, $3),
            updated_at = NOW()
        WHERE user_id = $1
            AND ($3::BIGINT IS NULL OR last_event_at IS NULL OR last_event_at <= $3)
        RETURNING {}
        "#,
        RETURNING
    ))
    .bind(user_id)
    .bind(status.as_str())
    .bind(event_at)
    .fetch_optional(executor)
    .await
    .map(|row| row.map(SubscriptionRecord::from))
    .map_err(AppError::from)
}

pub async fn delete_subscription<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: &str,
) -> Res<bool> {
    let result = sqlx::query("DELETE FROM subscriptions WHERE user_id = $1")
        .bind(user_id)
        .execute(executor)
        .await
        .map_err(AppError::from)?;

    Ok(result.rows_affected() > 0)
}
