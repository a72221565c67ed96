//! Login reuse on top of [`SessionCache`].

use crate::cache::{SessionCache, SessionKey};
use crate::error::AuthError;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Performs the actual FortiManager login and logout.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Logs in and returns a fresh session token.
    async fn login(&self) -> Result<String, AuthError>;

    /// Ends the session identified by `token`.
    async fn logout(&self, token: &str) -> Result<(), AuthError>;
}

/// Where a token handed out by [`SessionBroker::acquire`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOrigin {
    Cached,
    Fresh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub origin: SessionOrigin,
}

/// Hands out a session token for one manager login, logging in only when
/// the cache has nothing usable.
pub struct SessionBroker<A> {
    cache: Arc<SessionCache>,
    key: SessionKey,
    auth: A,
}

impl<A: Authenticator> SessionBroker<A> {
    pub fn new(cache: Arc<SessionCache>, key: SessionKey, auth: A) -> Self {
        SessionBroker { cache, key, auth }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// Returns the cached token if still valid, otherwise logs in and
    /// caches the new token. A failed login leaves the cache untouched.
    #[instrument(skip(self), fields(session = %self.key))]
    pub async fn acquire(&self) -> Result<Session, AuthError> {
        if let Some(token) = self.cache.get(&self.key).await {
            debug!("Reusing cached session");
            return Ok(Session {
                token,
                origin: SessionOrigin::Cached,
            });
        }
        self.login().await
    }

    /// Marks the cached token as refused by the manager.
    #[instrument(skip(self), fields(session = %self.key))]
    pub async fn reject(&self) {
        warn!("Session token rejected by manager");
        self.cache.invalidate(&self.key).await;
    }

    /// Logs the session out and forgets it. The entry is invalidated even
    /// when logout fails.
    #[instrument(skip(self, session), fields(session = %self.key))]
    pub async fn release(&self, session: Session) -> Result<(), AuthError> {
        let result = self.auth.logout(&session.token).await;
        self.cache.invalidate(&self.key).await;
        if let Err(e) = &result {
            warn!(error = %e, "Logout failed");
        } else {
            info!("Session logged out");
        }
        result
    }

    /// Runs `op` with a session token. When a cached token is rejected the
    /// entry is dropped and `op` is retried once with a fresh login.
    pub async fn with_session<T, F, Fut>(&self, op: F) -> Result<T, AuthError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, AuthError>>,
    {
        let session = self.acquire().await?;
        match op(session.token).await {
            Err(e) if e.is_rejected() && session.origin == SessionOrigin::Cached => {
                self.reject().await;
                let fresh = self.login().await?;
                op(fresh.token).await
            }
            Err(e) if e.is_rejected() => {
                self.reject().await;
                Err(e)
            }
            other => other,
        }
    }

    async fn login(&self) -> Result<Session, AuthError> {
        let token = self.auth.login().await?;
        self.cache.store(&self.key, &token).await;
        info!("Logged in to manager");
        Ok(Session {
            token,
            origin: SessionOrigin::Fresh,
        })
    }
}
