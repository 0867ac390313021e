use middleware::extractor::ExtractionMiddleware;

pub mod middleware {
    pub mod extractor;
}

/// Bearer-token authentication for the dashboard scope.
pub fn middleware(jwt_secret: &str) -> ExtractionMiddleware {
    ExtractionMiddleware::new(jwt_secret)
}
