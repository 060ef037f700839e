//! # BookSync Server
//!
//! HTTP delta-sync endpoint for BookSync.
//!
//! This crate provides:
//! - The `GET /getBooksAfterDate?date=...` endpoint (axum)
//! - An optional authentication gate (bearer header or `__session` cookie)
//! - HMAC-SHA256 identity tokens
//! - Fixed, non-leaking error bodies
//!
//! # Authentication
//!
//! Authentication is optional and chosen at startup:
//!
//! ```rust,ignore
//! use booksync_server::{AuthConfig, HmacTokenVerifier, ServerConfig, SyncServer};
//!
//! let secret = b"my-secure-secret-32-bytes-long!".to_vec();
//! let config = ServerConfig::default().with_auth(secret.clone());
//! let server = SyncServer::new(config, store)?;
//!
//! // Issue tokens for callers
//! let verifier = HmacTokenVerifier::new(AuthConfig::new(secret));
//! let token = verifier.create_token("user-1", Some("reader@example.com"))?;
//! ```
//!
//! # Request flow
//!
//! 1. The gate admits or rejects the request (403)
//! 2. The `date` parameter is validated (400)
//! 3. The delta engine queries the store (500 on failure)
//! 4. The snapshot is returned as JSON, with `userEmail` when authenticated

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod auth;
mod config;
mod error;
mod gate;
mod handler;
mod http;
mod server;

pub use auth::{
    AuthConfig, HmacTokenVerifier, IdentityVerifier, StaticTokenVerifier, VerifiedIdentity,
    VerifyError,
};
pub use config::{ServerConfig, DEFAULT_ROUTE};
pub use error::{AuthFailure, ErrorBody, ServerError, ServerResult};
pub use gate::{extract_credential, AuthGate, Credential, CredentialSource, SESSION_COOKIE};
pub use handler::{BooksAfterDateResponse, DateParam, HandlerContext, RequestHandler};
pub use http::router;
pub use server::SyncServer;
