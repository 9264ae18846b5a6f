// src/auth.rs
use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use warp::Filter;

use crate::config::Config;
use crate::error::AuthError;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

/// Issue a token carrying the stable per-user identifier that namespaces
/// all four collections.
pub fn create_token(
    user_id: &str,
    config: &Config,
) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = (Utc::now() + chrono::Duration::days(config.token_ttl_days)).timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_ref()),
    )
}

/// Verify a token and return the user identifier it carries.
pub fn verify_token(token: &str, config: &Config) -> Result<String, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(data.claims.sub)
}

/// Warp filter extracting the authenticated user id from a
/// `Authorization: Bearer <token>` header. Rejects with [`AuthError`].
pub fn with_user(
    config: Arc<Config>,
) -> impl Filter<Extract = (String,), Error = warp::Rejection> + Clone {
    warp::header::<String>("authorization").and_then(move |header: String| {
        let config = config.clone();
        async move {
            let token = header.strip_prefix("Bearer ").unwrap_or(header.as_str());
            verify_token(token, &config).map_err(|e| {
                warp::reject::custom(AuthError {
                    message: format!("Invalid token: {}", e),
                })
            })
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    fn test_config(secret: &str) -> Config {
        Config {
            scylla_node: "127.0.0.1:9042".to_string(),
            bind_addr: "127.0.0.1:3030".parse::<SocketAddr>().unwrap(),
            jwt_secret: secret.to_string(),
            token_ttl_days: 1,
        }
    }

    #[test]
    fn token_round_trip() {
        let config = test_config("unit-test-secret");
        let token = create_token("household-7", &config).unwrap();
        let user = verify_token(&token, &config).unwrap();
        assert_eq!(user, "household-7");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let config = test_config("secret-a");
        let other = test_config("secret-b");
        let token = create_token("household-7", &config).unwrap();
        assert!(verify_token(&token, &other).is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        let config = test_config("unit-test-secret");
        assert!(verify_token("definitely.not.a-token", &config).is_err());
    }
}
