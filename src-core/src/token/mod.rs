/// Room access token issuing
///
/// Mints the signed bearer tokens a participant presents when joining a
/// room. Tokens are opaque to the session coordinator.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use livekit_api::access_token::{AccessToken, AccessTokenError, VideoGrants};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::LiveKitConfig;

/// Lifetime of every issued token, in seconds
pub const TOKEN_TTL_SECS: u64 = 3600;

/// Token issuing errors
#[derive(Error, Debug)]
pub enum TokenError {
    /// API key or secret not configured
    #[error("Missing API credentials")]
    MissingCredentials,

    /// Identity must not be empty
    #[error("Participant identity is empty")]
    EmptyIdentity,

    /// Room name must not be empty
    #[error("Room name is empty")]
    EmptyRoom,

    /// JWT signing failed
    #[error("Failed to sign token: {0}")]
    Signing(#[from] AccessTokenError),
}

/// Result type for token operations
pub type TokenResult<T> = Result<T, TokenError>;

/// Permissions embedded in a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RoomGrants {
    pub room_join: bool,
    pub can_publish: bool,
    pub can_subscribe: bool,
}

impl Default for RoomGrants {
    fn default() -> Self {
        Self {
            room_join: true,
            can_publish: true,
            can_subscribe: true,
        }
    }
}

/// A freshly minted token and what it was minted for
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub identity: String,
    pub room_name: String,
    /// Expiry as unix seconds
    pub expires_at: u64,
}

/// Signs room access tokens with an API key pair
#[derive(Clone)]
pub struct TokenIssuer {
    api_key: String,
    api_secret: String,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

impl TokenIssuer {
    /// Create an issuer from an API key pair
    ///
    /// # Errors
    ///
    /// Returns `TokenError::MissingCredentials` if either value is empty
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> TokenResult<Self> {
        let api_key = api_key.into();
        let api_secret = api_secret.into();
        if api_key.is_empty() || api_secret.is_empty() {
            return Err(TokenError::MissingCredentials);
        }
        Ok(Self {
            api_key,
            api_secret,
        })
    }

    /// Create an issuer from the LiveKit section of the app config
    pub fn from_config(config: &LiveKitConfig) -> TokenResult<Self> {
        Self::new(config.api_key.as_str(), config.api_secret.as_str())
    }

    /// Issue a token with the default grants (join, publish, subscribe)
    pub fn issue(&self, identity: &str, room_name: &str) -> TokenResult<IssuedToken> {
        self.issue_with_grants(identity, room_name, RoomGrants::default())
    }

    /// Issue a token with explicit grants
    ///
    /// # Errors
    ///
    /// - `TokenError::EmptyIdentity` / `TokenError::EmptyRoom` - invalid input
    /// - `TokenError::Signing` - JWT encoding failed
    pub fn issue_with_grants(
        &self,
        identity: &str,
        room_name: &str,
        grants: RoomGrants,
    ) -> TokenResult<IssuedToken> {
        if identity.is_empty() {
            return Err(TokenError::EmptyIdentity);
        }
        if room_name.is_empty() {
            return Err(TokenError::EmptyRoom);
        }

        debug!(identity, room = room_name, ?grants, "Signing access token");

        let token = AccessToken::with_api_key(&self.api_key, &self.api_secret)
            .with_identity(identity)
            .with_ttl(Duration::from_secs(TOKEN_TTL_SECS))
            .with_grants(VideoGrants {
                room_join: grants.room_join,
                room: room_name.to_string(),
                can_publish: grants.can_publish,
                can_subscribe: grants.can_subscribe,
                ..Default::default()
            })
            .to_jwt()?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        info!(identity, room = room_name, "Access token issued");

        Ok(IssuedToken {
            token,
            identity: identity.to_string(),
            room_name: room_name.to_string(),
            expires_at: now + TOKEN_TTL_SECS,
        })
    }
}
