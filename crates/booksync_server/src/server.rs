//! Main sync server.

use crate::auth::{AuthConfig, HmacTokenVerifier, IdentityVerifier};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::gate::AuthGate;
use crate::handler::{BooksAfterDateResponse, DateParam, HandlerContext, RequestHandler};
use axum::http::HeaderMap;
use axum::Router;
use booksync_core::{DeltaEngine, RecordStore};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// The sync server.
///
/// Wires a record store and an authentication gate into the delta
/// endpoint and serves it over HTTP.
///
/// # Example
///
/// ```
/// use booksync_core::MemoryStore;
/// use booksync_server::{ServerConfig, SyncServer};
/// use std::sync::Arc;
///
/// let store = Arc::new(MemoryStore::new());
/// let server = SyncServer::new(ServerConfig::default(), store).unwrap();
///
/// // Mount `server.router()` in an existing app, or call `server.serve()`.
/// assert!(!server.requires_auth());
/// ```
pub struct SyncServer {
    handler: RequestHandler,
    context: Arc<HandlerContext>,
}

impl SyncServer {
    /// Creates a new sync server.
    ///
    /// When `config.require_auth` is set, tokens are verified with an
    /// [`HmacTokenVerifier`] keyed by `config.auth_secret`.
    pub fn new(config: ServerConfig, store: Arc<dyn RecordStore>) -> ServerResult<Self> {
        let gate = if config.require_auth {
            let secret = config.auth_secret.clone().ok_or_else(|| {
                ServerError::Internal("authentication enabled without a secret".into())
            })?;
            let auth = AuthConfig::new(secret).with_expiry(config.token_expiry);
            AuthGate::required(Arc::new(HmacTokenVerifier::new(auth)))
        } else {
            AuthGate::disabled()
        };
        Self::with_gate(config, store, gate)
    }

    /// Creates a sync server that authenticates every request with an
    /// external verifier, regardless of `config.require_auth`.
    pub fn with_verifier(
        config: ServerConfig,
        store: Arc<dyn RecordStore>,
        verifier: Arc<dyn IdentityVerifier>,
    ) -> ServerResult<Self> {
        Self::with_gate(config, store, AuthGate::required(verifier))
    }

    /// Creates a sync server with an explicit gate.
    pub fn with_gate(
        config: ServerConfig,
        store: Arc<dyn RecordStore>,
        gate: AuthGate,
    ) -> ServerResult<Self> {
        validate_route(&config.route_path)?;

        let mut engine = DeltaEngine::new(store).with_collection(config.collection.clone());
        if let Some(timeout) = config.request_timeout {
            engine = engine.with_timeout(timeout);
        }

        let context = Arc::new(HandlerContext::new(config, gate, engine));
        let handler = RequestHandler::new(Arc::clone(&context));

        Ok(Self { handler, context })
    }

    /// Returns true if requests must authenticate.
    pub fn requires_auth(&self) -> bool {
        self.context.gate.is_enabled()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }

    /// Handles a books-after-date request without going through HTTP.
    pub async fn handle_books_after_date(
        &self,
        headers: &HeaderMap,
        date: Option<String>,
    ) -> ServerResult<BooksAfterDateResponse> {
        self.handler
            .handle_books_after_date(headers, DateParam::from_option(date))
            .await
    }

    /// Returns the axum router for this server.
    pub fn router(&self) -> Router {
        crate::http::router(self.handler.clone())
    }

    /// Binds the configured address and serves until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let listener = TcpListener::bind(self.context.config.bind_addr).await?;
        self.serve_on(listener, shutdown_signal()).await
    }

    /// Serves on an existing listener until `shutdown` resolves.
    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local: SocketAddr = listener.local_addr()?;
        tracing::info!(
            addr = %local,
            route = %self.context.config.route_path,
            collection = %self.context.config.collection,
            auth = self.requires_auth(),
            "sync server listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("sync server stopped");
        Ok(())
    }
}

/// Accepts only static paths: a leading `/`, no captures or wildcards, and
/// no clash with `/healthz`.
fn validate_route(path: &str) -> ServerResult<()> {
    let invalid = |reason: &str| {
        Err(ServerError::Internal(format!(
            "invalid route path {path:?}: {reason}"
        )))
    };

    if !path.starts_with('/') {
        return invalid("must start with '/'");
    }
    if path == "/healthz" {
        return invalid("reserved for the liveness route");
    }
    if path.contains("//") {
        return invalid("empty segment");
    }
    for segment in path.split('/') {
        if segment.starts_with(':') || segment.starts_with('*') {
            return invalid("parameter segments are not allowed");
        }
        if segment.contains(['{', '}']) {
            return invalid("captures are not allowed");
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use booksync_core::MemoryStore;

    #[test]
    fn server_lifecycle() {
        let server = SyncServer::new(ServerConfig::default(), Arc::new(MemoryStore::new())).unwrap();
        assert!(!server.requires_auth());
        assert_eq!(server.config().route_path, "/getBooksAfterDate");
    }

    #[test]
    fn auth_without_secret_is_rejected() {
        let mut config = ServerConfig::default();
        config.require_auth = true;
        assert!(SyncServer::new(config, Arc::new(MemoryStore::new())).is_err());
    }

    #[test]
    fn auth_from_config() {
        let config = ServerConfig::default().with_auth(b"secret".to_vec());
        let server = SyncServer::new(config, Arc::new(MemoryStore::new())).unwrap();
        assert!(server.requires_auth());
    }

    #[test]
    fn bad_route_path() {
        for path in ["books", "/healthz", "/a/:id", "/files/*rest", "/a/{id}", "/a//b"] {
            let config = ServerConfig::default().with_route_path(path);
            assert!(
                matches!(
                    SyncServer::new(config, Arc::new(MemoryStore::new())),
                    Err(ServerError::Internal(_))
                ),
                "{path}"
            );
        }
    }

    #[test]
    fn static_route_paths() {
        for path in ["/", "/getBooksAfterDate", "/v1/books/delta", "/books-after_date"] {
            assert!(validate_route(path).is_ok(), "{path}");
        }
    }

    #[tokio::test]
    async fn direct_handling() {
        let server = SyncServer::new(ServerConfig::default(), Arc::new(MemoryStore::new())).unwrap();
        let response = server
            .handle_books_after_date(&HeaderMap::new(), Some("2024-01-05".into()))
            .await
            .unwrap();
        assert_eq!(response.snapshot.count_created_data, 0);

        let err = server
            .handle_books_after_date(&HeaderMap::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::MissingParameter));
    }
}
