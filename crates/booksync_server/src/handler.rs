//! Request handler for the delta endpoint.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::gate::AuthGate;
use axum::http::HeaderMap;
use booksync_core::{DeltaEngine, DeltaSnapshot};
use serde::Serialize;
use std::sync::Arc;

/// Context for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// Authentication step run before every request.
    pub gate: AuthGate,
    /// Delta engine over the configured collection.
    pub engine: DeltaEngine,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, gate: AuthGate, engine: DeltaEngine) -> Self {
        Self {
            config,
            gate,
            engine,
        }
    }
}

/// The `date` query parameter as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateParam {
    /// Not supplied.
    Missing,
    /// Supplied with this raw value.
    Value(String),
    /// The query string itself could not be decoded.
    Unreadable,
}

impl DateParam {
    /// Wraps an optional raw value.
    pub fn from_option(value: Option<String>) -> Self {
        value.map_or(DateParam::Missing, DateParam::Value)
    }
}

/// Successful response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BooksAfterDateResponse {
    /// Delta payload.
    #[serde(flatten)]
    pub snapshot: DeltaSnapshot,
    /// Caller's email, present only when authentication is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
}

/// Handler for delta requests.
#[derive(Clone)]
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Returns the shared context.
    pub fn context(&self) -> &HandlerContext {
        &self.context
    }

    /// Handles a books-after-date request.
    ///
    /// Order is fixed: authenticate, validate `date`, query. Each stage
    /// short-circuits the ones after it.
    pub async fn handle_books_after_date(
        &self,
        headers: &HeaderMap,
        date: DateParam,
    ) -> ServerResult<BooksAfterDateResponse> {
        let identity = self.context.gate.admit(headers).await?;

        let raw = match date {
            DateParam::Missing => None,
            DateParam::Value(raw) => Some(raw),
            DateParam::Unreadable => {
                return Err(ServerError::InvalidFormat("unreadable query string".into()))
            }
        };

        let snapshot = self.context.engine.compute(raw.as_deref()).await?;

        Ok(BooksAfterDateResponse {
            snapshot,
            user_email: identity.map(|id| id.user_email().to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{StaticTokenVerifier, VerifiedIdentity};
    use axum::http::HeaderValue;
    use booksync_core::{Document, MemoryStore, Timestamp, CREATED_AT, UPDATED_AT};

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn create_handler(gate: AuthGate) -> RequestHandler {
        let store = Arc::new(MemoryStore::new());
        store.put(
            "books",
            Document::new("x")
                .with_field("title", "X")
                .with_field(CREATED_AT, ts("2024-01-10"))
                .with_field(UPDATED_AT, ts("2024-01-10")),
        );
        let engine = DeltaEngine::new(store);
        let context = Arc::new(HandlerContext::new(ServerConfig::default(), gate, engine));
        RequestHandler::new(context)
    }

    fn authed_gate() -> AuthGate {
        AuthGate::required(Arc::new(StaticTokenVerifier::new().with_token(
            "t1",
            VerifiedIdentity::new("u1", Some("reader@example.com".into())),
        )))
    }

    #[tokio::test]
    async fn open_handler_has_no_user_email() {
        let handler = create_handler(AuthGate::disabled());
        let response = handler
            .handle_books_after_date(&HeaderMap::new(), DateParam::Value("2024-01-05".into()))
            .await
            .unwrap();

        assert_eq!(response.snapshot.count_created_data, 1);
        assert!(response.user_email.is_none());
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("userEmail").is_none());
        assert!(json.get("lastSyncedOn").is_some());
    }

    #[tokio::test]
    async fn authenticated_handler_reports_email() {
        let handler = create_handler(authed_gate());
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer t1"));

        let response = handler
            .handle_books_after_date(&headers, DateParam::Value("2024-01-05".into()))
            .await
            .unwrap();
        assert_eq!(response.user_email.as_deref(), Some("reader@example.com"));
    }

    #[tokio::test]
    async fn auth_is_checked_before_the_date() {
        let handler = create_handler(authed_gate());
        let err = handler
            .handle_books_after_date(&HeaderMap::new(), DateParam::Missing)
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn date_errors() {
        let handler = create_handler(AuthGate::disabled());
        let headers = HeaderMap::new();

        let missing = handler
            .handle_books_after_date(&headers, DateParam::from_option(None))
            .await
            .unwrap_err();
        assert!(matches!(missing, ServerError::MissingParameter));

        let empty = handler
            .handle_books_after_date(&headers, DateParam::Value(String::new()))
            .await
            .unwrap_err();
        assert!(matches!(empty, ServerError::MissingParameter));

        let invalid = handler
            .handle_books_after_date(&headers, DateParam::Value("not-a-date".into()))
            .await
            .unwrap_err();
        assert!(matches!(invalid, ServerError::InvalidFormat(_)));

        let unreadable = handler
            .handle_books_after_date(&headers, DateParam::Unreadable)
            .await
            .unwrap_err();
        assert!(matches!(unreadable, ServerError::InvalidFormat(_)));
    }
}
