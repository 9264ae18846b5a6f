// src/config.rs
use std::env;
use std::net::SocketAddr;

/// Runtime configuration, built once in `main` and passed by reference to
/// whatever needs store or auth access. There is no ambient singleton.
#[derive(Debug, Clone)]
pub struct Config {
    /// ScyllaDB contact point, `host:port`.
    pub scylla_node: String,
    /// Address the HTTP/websocket server binds to.
    pub bind_addr: SocketAddr,
    /// HMAC secret for signing and verifying identity tokens.
    pub jwt_secret: String,
    /// Issued-token lifetime in days.
    pub token_ttl_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let scylla_node =
            env::var("SCYLLA_NODE").unwrap_or_else(|_| "127.0.0.1:9042".to_string());
        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3030".to_string())
            .parse()?;
        let jwt_secret =
            env::var("JWT_SECRET").unwrap_or_else(|_| "dividend-tracker-dev-secret".to_string());
        let token_ttl_days = env::var("TOKEN_TTL_DAYS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        Ok(Self {
            scylla_node,
            bind_addr,
            jwt_secret,
            token_ttl_days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_env() {
        // Env vars are process-global; only assert on keys the test suite
        // never sets.
        let config = Config::from_env().unwrap();
        assert_eq!(config.bind_addr.port(), 3030);
        assert_eq!(config.token_ttl_days, 30);
    }
}
