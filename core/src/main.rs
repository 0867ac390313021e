mod cors;

use std::sync::Arc;

use actix_web::{
    App, HttpServer,
    web::{self},
};
use common::env_config::Config;
use db::{PgStore, SubscriptionStore, UsageStore};
use plans::PriceMap;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars
    let config = Config::from_env();
    let config_data = config.clone();

    // get info
    let is_production = config.is_production();
    let origin = config.cors_allowed_origin.clone();

    // init logger
    if config.console_logging_enabled {
        logger::setup(&config.log_file).expect("Failed to set up logger");
    }

    // init db connection
    let pool = db::setup(&config.database_url, is_production)
        .await
        .expect("Failed to set up database");
    let store = Arc::new(PgStore::new(pool));
    let subs: Arc<dyn SubscriptionStore> = store.clone();
    let usage: Arc<dyn UsageStore> = store;

    // Stripe prices of the paid plans
    let prices = PriceMap::from_config(&config.stripe_prices);
    for tier in plans::PlanTier::ALL.into_iter().filter(|tier| tier.is_paid()) {
        if prices.price_for(tier).is_err() {
            log::warn!("No Stripe price configured for {}, checkout is disabled for it", tier);
        }
    }

    log::info!(
        "Starting server on {}:{} with {} workers",
        config.server_host,
        config.server_port,
        config.num_workers
    );

    let rate_limit = config.rate_limit_per_second;
    let console_logging = config.console_logging_enabled;
    let jwt_secret = config.auth_jwt_secret.clone();

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(config_data.clone()))
            .app_data(web::Data::new(subs.clone()))
            .app_data(web::Data::new(usage.clone()))
            .app_data(web::Data::new(prices.clone()))
            .wrap(limiter::global_middleware(rate_limit)) // 3rd
            .wrap(logger::middleware(console_logging)) // 2nd
            .wrap(cors::middleware(&origin)) // 1st
            .service(
                web::scope("/api")
                    .service(api_subs::mount_plans())
                    .service(api_subs::mount_webhook())
                    .service(
                        web::scope("/dashboard")
                            .wrap(extractor::middleware(&jwt_secret))
                            .service(api_subs::mount_subs())
                            .service(api_access::mount_access()),
                    ),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}
