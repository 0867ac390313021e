use chrono::NaiveDateTime;
use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};

pub async fn get_generation_count<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: &str,
    window_start: NaiveDateTime,
) -> Res<i64> {
    sqlx::query_scalar::<_, i64>(
        "SELECT count FROM generation_usage WHERE user_id = $1 AND window_start = $2",
    )
    .bind(user_id)
    .bind(window_start)
    .fetch_optional(executor)
    .await
    .map(|count| count.unwrap_or(0))
    .map_err(AppError::from)
}

/// Conditional increment: the conflict branch only fires below `limit`,
/// and a fresh row is only inserted when `limit` is positive.
pub async fn increment_generation_within<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: &str,
    window_start: NaiveDateTime,
    limit: Option<i64>,
) -> Res<Option<i64>> {
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO generation_usage (user_id, window_start, count)
        SELECT $1, $2, 1
        WHERE $3::BIGINT IS NULL OR $3::BIGINT > 0
        ON CONFLICT (user_id, window_start) DO UPDATE SET
            count = generation_usage.count + 1,
            updated_at = NOW()
        WHERE $3::BIGINT IS NULL OR generation_usage.count < $3::BIGINT
        RETURNING count
        "#,
    )
    .bind(user_id)
    .bind(window_start)
    .bind(limit)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

pub async fn get_bonus_remaining<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: &str,
) -> Res<i64> {
    sqlx::query_scalar::<_, i64>("SELECT remaining FROM generation_bonuses WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map(|remaining| remaining.unwrap_or(0))
        .map_err(AppError::from)
}

pub async fn grant_feedback_bonus<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: &str,
    amount: i64,
) -> Res<Option<i64>> {
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO generation_bonuses (user_id, remaining, feedback_granted)
        VALUES ($1, $2, TRUE)
        ON CONFLICT (user_id) DO UPDATE SET
            remaining = generation_bonuses.remaining + EXCLUDED.remaining,
            feedback_granted = TRUE,
            updated_at = NOW()
        WHERE generation_bonuses.feedback_granted = FALSE
        RETURNING remaining
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

/// Spends one bonus generation and records it in the same statement.
/// Nothing is written when the balance is empty.
pub async fn consume_bonus_generation<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: &str,
    window_start: NaiveDateTime,
) -> Res<Option<i64>> {
    sqlx::query_scalar::<_, i64>(
        r#"
        WITH spent AS (
            UPDATE generation_bonuses
            SET remaining = remaining - 1, updated_at = NOW()
            WHERE user_id = $1 AND remaining > 0
            RETURNING user_id
        )
        INSERT INTO generation_usage (user_id, window_start, count)
        SELECT user_id, $2, 1 FROM spent
        ON CONFLICT (user_id, window_start) DO UPDATE SET
            count = generation_usage.count + 1,
            updated_at = NOW()
        RETURNING count
        "#,
    )
    .bind(user_id)
    .bind(window_start)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}
