use stripe::Client;

/// Builds a Stripe API client. Handlers create one per request from the shared config.
pub fn create_client(secret_key: &str) -> Client {
    Client::new(secret_key)
}
