use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Seconds shaved off the advertised lifetime so a token is never used right
/// at its expiry edge.
const EXPIRY_MARGIN_SECONDS: u64 = 60;

/// Lifetime assumed when a token response omits `expires_in` or reports one
/// too short to survive the margin.
pub const DEFAULT_EXPIRES_IN_SECONDS: u64 = 3600;

#[derive(Debug, Clone, Error)]
pub enum TokenError {
    #[error("client credentials are not configured")]
    NotConfigured,
    #[error("token request failed: {0}")]
    Request(String),
    #[error("token response did not include an access token")]
    MissingToken,
}

#[derive(Debug, Clone)]
pub struct ProviderToken {
    pub access_token: String,
    pub expires_at: Instant,
}

impl ProviderToken {
    pub fn from_expires_in(access_token: String, expires_in_seconds: u64) -> Self {
        let expires_in_seconds = if expires_in_seconds <= EXPIRY_MARGIN_SECONDS {
            DEFAULT_EXPIRES_IN_SECONDS
        } else {
            expires_in_seconds
        };
        let lifetime = expires_in_seconds - EXPIRY_MARGIN_SECONDS;
        ProviderToken {
            access_token,
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        }
    }

    fn is_fresh(&self) -> bool {
        !self.access_token.is_empty() && Instant::now() < self.expires_at
    }
}

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_token(&self) -> Result<ProviderToken, TokenError>;
}

type RefreshFuture = Shared<BoxFuture<'static, Result<ProviderToken, TokenError>>>;

#[derive(Default)]
struct TokenSlot {
    token: Option<ProviderToken>,
    refresh: Option<RefreshFuture>,
}

/// Holds one access token and refreshes it lazily.
///
/// At most one refresh runs at a time. Callers that find the token missing or
/// stale while a refresh is pending await that same refresh and share its
/// outcome, including a failure. The next caller after a failure starts a new
/// attempt.
pub struct TokenCache {
    source: Arc<dyn TokenSource>,
    slot: Arc<Mutex<TokenSlot>>,
}

impl TokenCache {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        TokenCache {
            source,
            slot: Arc::new(Mutex::new(TokenSlot::default())),
        }
    }

    pub async fn access_token(&self) -> Result<String, TokenError> {
        let refresh = {
            let mut slot = self.slot.lock();
            if let Some(token) = slot.token.as_ref().filter(|token| token.is_fresh()) {
                return Ok(token.access_token.clone());
            }
            if let Some(pending) = slot.refresh.clone() {
                pending
            } else {
                let pending = self.start_refresh();
                slot.refresh = Some(pending.clone());
                pending
            }
        };

        refresh.await.map(|token| token.access_token)
    }

    fn start_refresh(&self) -> RefreshFuture {
        debug!("Refreshing provider access token");
        let source = Arc::clone(&self.source);
        let slot = Arc::clone(&self.slot);
        async move {
            let result = source.fetch_token().await;
            let mut slot = slot.lock();
            slot.refresh = None;
            match &result {
                Ok(token) => slot.token = Some(token.clone()),
                Err(err) => {
                    warn!("Access token refresh failed: {err}");
                    slot.token = None;
                }
            }
            result
        }
        .boxed()
        .shared()
    }

    /// Drops the cached token and forgets any pending refresh.
    #[allow(dead_code)]
    pub fn reset(&self) {
        let mut slot = self.slot.lock();
        slot.token = None;
        slot.refresh = None;
    }
}
