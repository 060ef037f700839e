//! Server configuration.

use booksync_core::DEFAULT_COLLECTION;
use std::net::SocketAddr;
use std::time::Duration;

/// Default route of the delta endpoint.
pub const DEFAULT_ROUTE: &str = "/getBooksAfterDate";

/// Configuration for the sync server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Path the delta endpoint is mounted at.
    pub route_path: String,
    /// Collection to synchronize.
    pub collection: String,
    /// Deadline for the store phase of a request. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    /// Whether to require authentication.
    pub require_auth: bool,
    /// Secret key for token validation (if auth enabled).
    pub auth_secret: Option<Vec<u8>>,
    /// Lifetime of issued tokens.
    pub token_expiry: Duration,
}

impl ServerConfig {
    /// Creates a new server configuration.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            route_path: DEFAULT_ROUTE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            request_timeout: None,
            require_auth: false,
            auth_secret: None,
            token_expiry: Duration::from_secs(60 * 60),
        }
    }

    /// Sets the endpoint path.
    pub fn with_route_path(mut self, path: impl Into<String>) -> Self {
        self.route_path = path.into();
        self
    }

    /// Sets the collection name.
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the token lifetime.
    pub fn with_token_expiry(mut self, expiry: Duration) -> Self {
        self.token_expiry = expiry;
        self
    }

    /// Enables authentication with the given secret.
    pub fn with_auth(mut self, secret: Vec<u8>) -> Self {
        self.require_auth = true;
        self.auth_secret = Some(secret);
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], 8080)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.route_path, "/getBooksAfterDate");
        assert_eq!(config.collection, "books");
        assert!(config.request_timeout.is_none());
        assert!(!config.require_auth);
    }

    #[test]
    fn config_builder() {
        let config = ServerConfig::new("0.0.0.0:9000".parse().unwrap())
            .with_route_path("/v1/books/delta")
            .with_collection("library")
            .with_request_timeout(Duration::from_secs(5))
            .with_auth(vec![1, 2, 3, 4]);

        assert_eq!(config.route_path, "/v1/books/delta");
        assert_eq!(config.collection, "library");
        assert_eq!(config.request_timeout, Some(Duration::from_secs(5)));
        assert!(config.require_auth);
        assert_eq!(config.auth_secret, Some(vec![1, 2, 3, 4]));
    }
}
