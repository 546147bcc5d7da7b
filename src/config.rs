use anyhow::Context;
use serde::Deserialize;

const DEFAULT_SESSION_TTL_MINUTES: i64 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Bootstrap admin account, created on start-up when absent.
#[derive(Clone, Deserialize)]
pub struct AdminSeed {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
}

impl std::fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSeed")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub admin: Option<AdminSeed>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "marketplace".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "marketplace-users".into()),
            ttl_minutes: parse_ttl(std::env::var("JWT_TTL_MINUTES").ok().as_deref()),
        };
        let admin = admin_seed_from_env();
        Ok(Self {
            database_url,
            jwt,
            admin,
        })
    }
}

fn parse_ttl(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|m| *m > 0)
        .unwrap_or(DEFAULT_SESSION_TTL_MINUTES)
}

fn admin_seed_from_env() -> Option<AdminSeed> {
    let username = std::env::var("ADMIN_USERNAME").ok()?;
    let email = std::env::var("ADMIN_EMAIL").ok()?;
    let password = std::env::var("ADMIN_PASSWORD").ok()?;
    let full_name = std::env::var("ADMIN_FULL_NAME").unwrap_or_else(|_| username.clone());
    Some(AdminSeed {
        username,
        email,
        password,
        full_name,
    })
}
