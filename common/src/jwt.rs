use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::Res;

/// Claims carried by the bearer token the auth library issues.
/// `user_id` is an opaque, stable account identifier.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtClaims {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: usize,
}

/// Extracts claims object from JWT token.
/// Requires JWT secret.
pub fn validate_jwt(token: &str, secret: &str) -> Res<JwtClaims> {
    let token_data = jsonwebtoken::decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Pulls the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{EncodingKey, Header};

    use super::*;

    fn sign(claims: &JwtClaims, secret: &str) -> String {
        jsonwebtoken::encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims() -> JwtClaims {
        JwtClaims {
            user_id: "user_123".to_string(),
            email: Some("cook@example.com".to_string()),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        }
    }

    #[test]
    fn accepts_token_signed_with_shared_secret() {
        let token = sign(&claims(), "secret");
        let decoded = validate_jwt(&token, "secret").unwrap();
        assert_eq!(decoded.user_id, "user_123");
        assert_eq!(decoded.email.as_deref(), Some("cook@example.com"));
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let token = sign(&claims(), "secret");
        assert!(validate_jwt(&token, "other").is_err());
    }

    #[test]
    fn parses_bearer_header() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic abc"), None);
    }
}
