use std::time::Duration;

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::config::JwtConfig;

/// JWT payload used for authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,    // user ID
    pub iat: usize,  // issued at (unix timestamp)
    pub nbf: usize,  // not before
    pub exp: usize,  // expires at
    pub jti: Uuid,   // token ID, the blacklist key
    pub iss: String, // issuer
    pub aud: String, // audience
}

/// Signing and verification keys with their config data.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs(cfg.ttl_minutes.max(1) as u64 * 60),
            refresh_ttl: Duration::from_secs(cfg.refresh_ttl_minutes.max(1) as u64 * 60),
        }
    }

    pub fn ttl_minutes(&self) -> i64 {
        (self.ttl.as_secs() / 60) as i64
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn sign(&self, user_id: i64) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            nbf: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            jti: Uuid::new_v4(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id, jti = %claims.jti, "jwt signed");
        Ok(token)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.validate_nbf = true;
        validation
    }

    /// Checks signature, issuer, audience and expiry.
    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation())?;
        debug!(user_id = data.claims.sub, "jwt verified");
        Ok(data.claims)
    }

    /// Like `verify`, but an expired token passes as long as it was issued
    /// within the refresh window.
    pub fn verify_refreshable(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = self.validation();
        validation.validate_exp = false;
        let claims = decode::<Claims>(token, &self.decoding, &validation)?.claims;
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let window_end = claims.iat as i64 + self.refresh_ttl.as_secs() as i64;
        if now > window_end {
            anyhow::bail!("token can no longer be refreshed");
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(issuer: &str, audience: &str) -> JwtConfig {
        JwtConfig {
            secret: "dev-secret".into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        }
    }

    fn expired_token(keys: &JwtKeys, issued_ago: i64) -> String {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: 9,
            iat: (now - issued_ago) as usize,
            nbf: (now - issued_ago) as usize,
            exp: (now - issued_ago + 60) as usize,
            jti: Uuid::new_v4(),
            iss: "iss".into(),
            aud: "aud".into(),
        };
        encode(&Header::default(), &claims, &keys.encoding).unwrap()
    }

    #[test]
    fn sign_and_verify() {
        let keys = JwtKeys::from_config(&config("test-issuer", "test-aud"));
        let token = keys.sign(42).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.exp - claims.iat, 5 * 60);
        assert_eq!(keys.ttl_minutes(), 5);
    }

    #[test]
    fn every_token_gets_its_own_jti() {
        let keys = JwtKeys::from_config(&config("iss", "aud"));
        let a = keys.verify(&keys.sign(1).unwrap()).unwrap();
        let b = keys.verify(&keys.sign(1).unwrap()).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let good_keys = JwtKeys::from_config(&config("good-iss", "good-aud"));
        let bad_keys = JwtKeys::from_config(&config("bad-iss", "bad-aud"));
        let token = good_keys.sign(1).expect("sign");
        assert!(bad_keys.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_garbage() {
        let keys = JwtKeys::from_config(&config("iss", "aud"));
        assert!(keys.verify("not.a.jwt").is_err());
    }

    #[test]
    fn expired_token_is_refreshable_inside_window_only() {
        let keys = JwtKeys::from_config(&config("iss", "aud"));

        // issued 10 minutes ago, expired 9 minutes ago, window is 60 minutes
        let recent = expired_token(&keys, 10 * 60);
        assert!(keys.verify(&recent).is_err());
        assert_eq!(keys.verify_refreshable(&recent).unwrap().sub, 9);

        // issued two hours ago: outside the refresh window
        let stale = expired_token(&keys, 2 * 60 * 60);
        assert!(keys.verify_refreshable(&stale).is_err());
    }
}
