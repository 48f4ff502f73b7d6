use std::env;
use std::net::SocketAddr;

use anyhow::{ensure, Context, Result};

/// Upper bound for `TOKEN_TTL_MINUTES`: one year.
const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Clone)]
pub struct Settings {
    pub port: u16,
    pub addr: SocketAddr,
    /// When unset the server runs on the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let port: u16 = parse_or("PORT", 3000)?;
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;

        Ok(Self {
            port,
            addr,
            database_url,
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 5)?,
            jwt_secret,
            token_ttl_minutes: token_ttl(parse_or("TOKEN_TTL_MINUTES", 60)?)
                .context("TOKEN_TTL_MINUTES is out of range")?,
        })
    }
}

fn token_ttl(minutes: i64) -> Result<i64> {
    ensure!(
        (1..=MAX_TOKEN_TTL_MINUTES).contains(&minutes),
        "token lifetime must be between 1 and {MAX_TOKEN_TTL_MINUTES} minutes, got {minutes}"
    );
    Ok(minutes)
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
impl Settings {
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            database_url: None,
            db_max_connections: 1,
            jwt_secret: "test-secret".to_string(),
            token_ttl_minutes: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_lifetime_must_be_positive_and_bounded() {
        assert_eq!(token_ttl(60).unwrap(), 60);
        assert_eq!(token_ttl(MAX_TOKEN_TTL_MINUTES).unwrap(), MAX_TOKEN_TTL_MINUTES);

        assert!(token_ttl(0).is_err());
        assert!(token_ttl(-5).is_err());
        assert!(token_ttl(MAX_TOKEN_TTL_MINUTES + 1).is_err());
        assert!(token_ttl(i64::MAX).is_err());
    }
}
