use std::time::Duration;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};

use crate::auth::claims::{Claims, TokenKind};
use crate::config::JwtConfig;
use crate::error::AppError;

pub const RESET_TTL_MINUTES: u64 = 15;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Signs and verifies bearer tokens with the process-wide secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    session_ttl: Duration,
    reset_ttl: Duration,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            session_ttl: Duration::from_secs((cfg.ttl_minutes.max(1) as u64) * 60),
            reset_ttl: Duration::from_secs(RESET_TTL_MINUTES * 60),
        }
    }

    pub fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Session => self.session_ttl,
            TokenKind::Reset => self.reset_ttl,
        }
    }

    /// Sign a token for `subject` that expires `ttl` after `issued_at`.
    pub fn issue_at(
        &self,
        subject: &str,
        kind: TokenKind,
        ttl: Duration,
        issued_at: OffsetDateTime,
    ) -> anyhow::Result<String> {
        let exp = issued_at + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: subject.to_string(),
            iat: issued_at.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
        };
        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding)?;
        debug!(subject = %subject, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn issue(&self, subject: &str, kind: TokenKind) -> anyhow::Result<String> {
        self.issue_at(subject, kind, self.ttl(kind), OffsetDateTime::now_utc())
    }

    pub fn sign_session(&self, username: &str) -> anyhow::Result<String> {
        self.issue(username, TokenKind::Session)
    }

    pub fn sign_reset(&self, username: &str) -> anyhow::Result<String> {
        self.issue(username, TokenKind::Reset)
    }

    /// Checks signature, issuer, audience and expiry, with no leeway.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            debug!(error = %e, "jwt rejected");
            AppError::InvalidToken
        })?;
        debug!(subject = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    /// Verify and return the subject, requiring a token of `kind`.
    pub fn verify_kind(&self, token: &str, kind: TokenKind) -> Result<String, AppError> {
        let claims = self.verify(token)?;
        if claims.kind != kind {
            warn!(expected = ?kind, got = ?claims.kind, "token used for the wrong purpose");
            return Err(AppError::InvalidToken);
        }
        Ok(claims.sub)
    }

    pub fn verify_session(&self, token: &str) -> Result<String, AppError> {
        self.verify_kind(token, TokenKind::Session)
    }

    pub fn verify_reset(&self, token: &str) -> Result<String, AppError> {
        self.verify_kind(token, TokenKind::Reset)
    }
}
