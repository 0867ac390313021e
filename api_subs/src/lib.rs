use actix_web::web::{self};

pub mod routes {
    pub mod pay;
    pub mod sub;
}

pub mod services {
    pub mod pay;
    pub mod reconciler;
}

mod dtos {
    pub(crate) mod sub;
}

pub mod models {
    pub mod event;
}

mod misc {
    pub(crate) mod event;
}

/// Public catalog routes.
pub fn mount_plans() -> actix_web::Scope {
    web::scope("/sub")
        .service(routes::sub::get_plans)
        .service(routes::sub::get_limits)
}
/// Routes for the authenticated user's own subscription.
pub fn mount_subs() -> actix_web::Scope {
    web::scope("/sub")
        .service(routes::sub::get_current)
        .service(routes::sub::post_checkout)
}
pub fn mount_webhook() -> actix_web::Scope {
    web::scope("/pay")
        .service(routes::pay::post_webhook)
        .service(routes::pay::get_webhook)
}
