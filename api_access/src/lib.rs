use actix_web::web;

pub mod routes {
    pub mod access;
}

mod dtos {
    pub(crate) mod access;
}

/// Feature gates for the authenticated user.
pub fn mount_access() -> actix_web::Scope {
    web::scope("/access")
        .service(routes::access::get_family_access)
        .service(routes::access::get_generation)
        .service(routes::access::post_generation)
        .service(routes::access::post_bonus)
}
