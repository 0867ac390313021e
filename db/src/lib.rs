use common::error::{AppError, Res};
use sqlx::{
    PgPool,
    postgres::{PgConnectOptions, PgSslMode},
};
use std::{str::FromStr, sync::Arc};

pub mod memory;
pub mod pg;
pub mod store;
pub mod subscription;
pub mod usage;

pub mod models {
    pub mod subscription;
}

pub mod dtos {
    pub mod subscription;
}

pub use memory::InMemoryStore;
pub use pg::PgStore;
pub use store::{SubscriptionStore, UsageStore};

/// Maintenance database every Postgres server has; used to create ours.
const ADMIN_DATABASE: &str = "postgres";

/// Connects to Postgres, creating the database first when it does not exist,
/// and applies the subscription and usage migrations.
pub async fn setup(database_url: &str, require_ssl: bool) -> Res<Arc<PgPool>> {
    let mut options = PgConnectOptions::from_str(database_url)?;
    if require_ssl {
        options = options.ssl_mode(PgSslMode::Require);
    }
    let db_name = database_name(&options)?;

    ensure_database(options.clone().database(ADMIN_DATABASE), &db_name).await?;

    let pool = PgPool::connect_with(options).await?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(sqlx::Error::from)?;
    log::info!("Database {} is migrated", db_name);

    Ok(Arc::new(pool))
}

/// Target database of the connection options.
///
/// The name ends up quoted inside `CREATE DATABASE`, so quotes are refused.
fn database_name(options: &PgConnectOptions) -> Res<String> {
    match options.get_database() {
        Some(name) if !name.is_empty() && !name.contains('"') => Ok(name.to_string()),
        Some(name) => Err(AppError::Internal(format!(
            "Invalid database name in DATABASE_URL: {}",
            name
        ))),
        None => Err(AppError::Internal(
            "DATABASE_URL does not name a database".to_string(),
        )),
    }
}

async fn ensure_database(admin_options: PgConnectOptions, db_name: &str) -> Res<()> {
    let admin_pool = PgPool::connect_with(admin_options).await?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(db_name)
            .fetch_one(&admin_pool)
            .await?;

    if !exists {
        log::info!("Creating database {}", db_name);
        sqlx::query(&format!("CREATE DATABASE \"{}\"", db_name))
            .execute(&admin_pool)
            .await?;
    }

    admin_pool.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(url: &str) -> PgConnectOptions {
        PgConnectOptions::from_str(url).unwrap()
    }

    #[test]
    fn database_name_comes_from_the_url_path() {
        let name = database_name(&options("postgres://app:secret@db:5432/mealplans")).unwrap();
        assert_eq!(name, "mealplans");
    }

    #[test]
    fn quoted_database_name_is_rejected() {
        assert!(matches!(
            database_name(&options("postgres://app@db/meal%22plans")),
            Err(AppError::Internal(_))
        ));
    }
}
