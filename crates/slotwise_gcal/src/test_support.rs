//! Shared doubles for the crate's test modules.

use crate::auth::{AuthError, ServiceTokenSource, TokenSet, TokenStore, TokenStoreError};
use chrono::{Duration, Utc};
use slotwise_common::services::BoxFuture;
use std::sync::Mutex;

pub struct MemoryTokenStore {
    pub tokens: Mutex<Option<TokenSet>>,
    pub fail_saves: bool,
}

impl MemoryTokenStore {
    pub fn empty() -> Self {
        MemoryTokenStore {
            tokens: Mutex::new(None),
            fail_saves: false,
        }
    }

    pub fn seeded(tokens: TokenSet) -> Self {
        MemoryTokenStore {
            tokens: Mutex::new(Some(tokens)),
            fail_saves: false,
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<TokenSet>, TokenStoreError> {
        Ok(self.tokens.lock().unwrap().clone())
    }

    fn save(&self, tokens: &TokenSet) -> Result<(), TokenStoreError> {
        if self.fail_saves {
            return Err(TokenStoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only store",
            )));
        }
        *self.tokens.lock().unwrap() = Some(tokens.clone());
        Ok(())
    }
}

/// Always hands out the same service-account bearer token.
pub struct StaticTokenSource {
    pub token: &'static str,
}

impl ServiceTokenSource for StaticTokenSource {
    fn access_token(&self) -> BoxFuture<'_, String, AuthError> {
        Box::pin(async move { Ok(self.token.to_string()) })
    }
}

/// A token set that needs no refresh for the duration of a test.
pub fn fresh_tokens() -> TokenSet {
    TokenSet {
        access_token: "delegated-token".to_string(),
        refresh_token: Some("rt".to_string()),
        expires_at: Some(Utc::now() + Duration::hours(1)),
    }
}
