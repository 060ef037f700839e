//! Identity verification for the sync server.
//!
//! This module provides the [`IdentityVerifier`] seam and two
//! implementations: HMAC-SHA256 signed tokens and a fixed token table.
//!
//! ## Token Format
//!
//! [`HmacTokenVerifier`] tokens are two base64url (unpadded) segments
//! joined by `.`:
//! - claims: JSON `{"sub": ..., "email": ..., "iat_ms": ...}`
//! - signature: HMAC-SHA256 over the encoded claims segment
//!
//! Expiry is enforced from the issue time and the configured lifetime.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// How far in the future an issue time may lie before a token is refused.
const MAX_CLOCK_SKEW: Duration = Duration::from_secs(60);

/// Claims of a successfully verified caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Stable subject identifier.
    pub subject: String,
    /// Email address, if the identity carries one.
    pub email: Option<String>,
}

impl VerifiedIdentity {
    /// Creates an identity.
    pub fn new(subject: impl Into<String>, email: Option<String>) -> Self {
        Self {
            subject: subject.into(),
            email,
        }
    }

    /// Email if present, otherwise the subject.
    pub fn user_email(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.subject)
    }
}

/// Why a token failed verification. For server-side logs only.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The token is not structurally valid.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The signature does not match.
    #[error("invalid signature")]
    BadSignature,

    /// The token is older than the allowed lifetime.
    #[error("token expired (issued at {issued_at_ms} ms)")]
    Expired {
        /// Issue time, Unix milliseconds.
        issued_at_ms: u64,
    },

    /// The token is not known to the verifier.
    #[error("unknown token")]
    Unknown,

    /// The verification service failed.
    #[error("verifier unavailable: {0}")]
    Unavailable(String),
}

/// Verifies bearer tokens.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verifies a token and returns the caller's identity.
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, VerifyError>;
}

/// Authentication configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Secret key for HMAC.
    pub secret: Vec<u8>,
    /// Token expiration duration.
    pub token_expiry: Duration,
}

impl AuthConfig {
    /// Creates a new auth configuration.
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            secret,
            token_expiry: Duration::from_secs(60 * 60), // 1 hour
        }
    }

    /// Sets the token expiration duration.
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.token_expiry = expiry;
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    iat_ms: u64,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Issues and verifies HMAC-SHA256 signed identity tokens.
#[derive(Clone)]
pub struct HmacTokenVerifier {
    config: AuthConfig,
}

impl HmacTokenVerifier {
    /// Creates a new token verifier.
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Creates a token for a subject, issued now.
    pub fn create_token(&self, subject: &str, email: Option<&str>) -> Result<String, VerifyError> {
        self.create_token_at(subject, email, now_millis())
    }

    /// Creates a token with an explicit issue time (Unix millis).
    pub fn create_token_at(
        &self,
        subject: &str,
        email: Option<&str>,
        issued_at_ms: u64,
    ) -> Result<String, VerifyError> {
        let claims = TokenClaims {
            sub: subject.to_string(),
            email: email.map(str::to_string),
            iat_ms: issued_at_ms,
        };
        let json =
            serde_json::to_vec(&claims).map_err(|e| VerifyError::Malformed(e.to_string()))?;
        let payload = URL_SAFE_NO_PAD.encode(json);

        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{payload}.{signature}"))
    }

    /// Validates a token.
    ///
    /// Checks structure, then signature, then expiry.
    pub fn validate_token(&self, token: &str) -> Result<VerifiedIdentity, VerifyError> {
        let (payload, signature) = token
            .split_once('.')
            .ok_or_else(|| VerifyError::Malformed("missing signature segment".into()))?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| VerifyError::Malformed("signature is not base64url".into()))?;

        // Verify signature
        let mut mac = self.mac()?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| VerifyError::BadSignature)?;

        let json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| VerifyError::Malformed("claims are not base64url".into()))?;
        let claims: TokenClaims = serde_json::from_slice(&json)
            .map_err(|e| VerifyError::Malformed(format!("claims: {e}")))?;

        let now = now_millis();
        if claims.iat_ms > now.saturating_add(MAX_CLOCK_SKEW.as_millis() as u64) {
            return Err(VerifyError::Malformed(format!(
                "issued in the future ({} ms)",
                claims.iat_ms
            )));
        }

        // Check expiration
        let expiry_millis = self.config.token_expiry.as_millis() as u64;
        if now > claims.iat_ms.saturating_add(expiry_millis) {
            return Err(VerifyError::Expired {
                issued_at_ms: claims.iat_ms,
            });
        }

        Ok(VerifiedIdentity::new(claims.sub, claims.email))
    }

    fn mac(&self) -> Result<HmacSha256, VerifyError> {
        HmacSha256::new_from_slice(&self.config.secret)
            .map_err(|e| VerifyError::Unavailable(format!("hmac key: {e}")))
    }
}

#[async_trait]
impl IdentityVerifier for HmacTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, VerifyError> {
        self.validate_token(token)
    }
}

/// Verifier backed by a fixed token table.
/// Useful for testing and local development.
#[derive(Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, VerifiedIdentity>,
}

impl StaticTokenVerifier {
    /// Creates an empty verifier that rejects every token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `token` as `identity`.
    pub fn with_token(mut self, token: impl Into<String>, identity: VerifiedIdentity) -> Self {
        self.tokens.insert(token.into(), identity);
        self
    }
}

#[async_trait]
impl IdentityVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, VerifyError> {
        self.tokens.get(token).cloned().ok_or(VerifyError::Unknown)
    }
}
