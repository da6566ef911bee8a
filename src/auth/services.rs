use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::FromRef;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::jwt::{Claims, JwtKeys};
use crate::auth::password::verify_password;
use crate::auth::repo::UserRepo;
use crate::config::JwtConfig;
use crate::state::AppState;

/// Invalidated token IDs, each kept until its token could no longer be
/// refreshed.
// TODO: move the blacklist into postgres so logouts survive restarts and are
// shared between instances.
#[derive(Clone, Default)]
pub struct TokenBlacklist {
    revoked: Arc<RwLock<HashMap<Uuid, i64>>>,
}

impl TokenBlacklist {
    pub async fn revoke(&self, jti: Uuid, until: i64) {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let mut revoked = self.revoked.write().await;
        revoked.retain(|_, until| *until > now);
        revoked.insert(jti, until);
    }

    pub async fn is_revoked(&self, jti: &Uuid) -> bool {
        self.revoked.read().await.contains_key(jti)
    }

    pub async fn len(&self) -> usize {
        self.revoked.read().await.len()
    }
}

/// Issues, verifies, rotates and invalidates bearer tokens.
#[derive(Clone)]
pub struct TokenGuard {
    keys: JwtKeys,
    blacklist: TokenBlacklist,
}

impl FromRef<AppState> for TokenGuard {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

impl TokenGuard {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            keys: JwtKeys::from_config(cfg),
            blacklist: TokenBlacklist::default(),
        }
    }

    pub fn ttl_minutes(&self) -> i64 {
        self.keys.ttl_minutes()
    }

    pub fn issue(&self, user_id: i64) -> anyhow::Result<String> {
        self.keys.sign(user_id)
    }

    pub async fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let claims = self.keys.verify(token)?;
        if self.blacklist.is_revoked(&claims.jti).await {
            anyhow::bail!("token has been invalidated");
        }
        Ok(claims)
    }

    /// Checks `email`/`password` and issues a token on a match. `Ok(None)`
    /// means the credentials did not match.
    pub async fn attempt<U>(&self, users: &U, email: &str, password: &str) -> anyhow::Result<Option<String>>
    where
        U: UserRepo + ?Sized,
    {
        let Some(user) = users
            .find_user_by_email(email)
            .await
            .context("find user by email")?
        else {
            warn!(email, "login unknown email");
            return Ok(None);
        };
        if !verify_password(password, &user.password_hash)? {
            warn!(email, user_id = user.id, "login invalid password");
            return Ok(None);
        }
        info!(user_id = user.id, "user logged in");
        self.issue(user.id).map(Some)
    }

    pub async fn invalidate(&self, token: &str) -> anyhow::Result<()> {
        let claims = self.keys.verify_refreshable(token)?;
        self.revoke(&claims).await;
        Ok(())
    }

    /// Swaps `token` for a fresh one; the old token is invalidated.
    pub async fn refresh(&self, token: &str) -> anyhow::Result<String> {
        let claims = self.keys.verify_refreshable(token)?;
        if self.blacklist.is_revoked(&claims.jti).await {
            anyhow::bail!("token has been invalidated");
        }
        self.revoke(&claims).await;
        let fresh = self.issue(claims.sub)?;
        debug!(user_id = claims.sub, "token refreshed");
        Ok(fresh)
    }

    async fn revoke(&self, claims: &Claims) {
        let until = claims.iat as i64 + self.keys.refresh_ttl().as_secs() as i64;
        self.blacklist.revoke(claims.jti, until).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_password;
    use crate::auth::repo_types::NewUser;
    use crate::config::AppConfig;
    use crate::db::MemoryStore;

    fn guard() -> TokenGuard {
        TokenGuard::new(&AppConfig::for_tests().jwt)
    }

    #[tokio::test]
    async fn issued_tokens_verify_until_invalidated() {
        let guard = guard();
        let token = guard.issue(3).unwrap();
        assert_eq!(guard.verify(&token).await.unwrap().sub, 3);

        guard.invalidate(&token).await.unwrap();
        assert!(guard.verify(&token).await.is_err());
        assert_eq!(guard.blacklist.len().await, 1);
    }

    #[tokio::test]
    async fn refresh_rotates_the_token() {
        let guard = guard();
        let old = guard.issue(5).unwrap();
        let new = guard.refresh(&old).await.unwrap();

        assert_ne!(old, new);
        assert_eq!(guard.verify(&new).await.unwrap().sub, 5);
        assert!(guard.verify(&old).await.is_err());
        assert!(guard.refresh(&old).await.is_err());
    }

    #[tokio::test]
    async fn refresh_rejects_garbage() {
        assert!(guard().refresh("garbage").await.is_err());
    }

    #[tokio::test]
    async fn attempt_checks_credentials() {
        let store = MemoryStore::new();
        store
            .create_user(NewUser {
                name: "Ana".into(),
                email: "ana@example.com".into(),
                password_hash: hash_password("secret1").unwrap(),
            })
            .await
            .unwrap();
        let guard = guard();

        let token = guard
            .attempt(&store, "ana@example.com", "secret1")
            .await
            .unwrap()
            .expect("token for good credentials");
        assert_eq!(guard.verify(&token).await.unwrap().sub, 1);

        assert!(guard.attempt(&store, "ana@example.com", "nope").await.unwrap().is_none());
        assert!(guard.attempt(&store, "bob@example.com", "secret1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn blacklist_prunes_expired_entries() {
        let blacklist = TokenBlacklist::default();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let stale = Uuid::new_v4();
        blacklist.revoke(stale, now - 1).await;
        blacklist.revoke(Uuid::new_v4(), now + 60).await;
        assert!(!blacklist.is_revoked(&stale).await);
        assert_eq!(blacklist.len().await, 1);
    }
}
