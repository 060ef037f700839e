//! Serve command implementation.

use booksync_core::{Document, MemoryStore, StoreError, ID};
use booksync_server::{ServerConfig, SyncServer};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Secrets shorter than this are accepted but logged as weak.
const MIN_SECRET_LEN: usize = 32;

/// Options for the serve command.
#[derive(Debug)]
pub struct ServeOptions {
    /// Listen address.
    pub bind: SocketAddr,
    /// Endpoint path.
    pub route: String,
    /// Collection name.
    pub collection: String,
    /// Token secret; authentication is on when set.
    pub auth_secret: Option<String>,
    /// Token lifetime in seconds.
    pub token_expiry_secs: u64,
    /// Per-request store timeout in milliseconds.
    pub request_timeout_ms: Option<u64>,
    /// Seed file.
    pub seed: Option<PathBuf>,
}

/// Errors while loading a seed file.
#[derive(Debug, Error)]
pub enum SeedError {
    /// The file could not be read.
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid JSON.
    #[error("seed file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The top-level value is not an array.
    #[error("seed file must contain a JSON array of documents")]
    NotAnArray,

    /// One entry could not be converted.
    #[error("seed entry {index}: {source}")]
    Document {
        /// Position in the array.
        index: usize,
        /// Conversion failure.
        source: StoreError,
    },
}

/// Builds the server configuration from the command options.
pub fn build_config(options: &ServeOptions) -> ServerConfig {
    let mut config = ServerConfig::new(options.bind)
        .with_route_path(options.route.clone())
        .with_collection(options.collection.clone())
        .with_token_expiry(Duration::from_secs(options.token_expiry_secs));

    if let Some(ms) = options.request_timeout_ms {
        config = config.with_request_timeout(Duration::from_millis(ms));
    }
    if let Some(secret) = &options.auth_secret {
        if secret.len() < MIN_SECRET_LEN {
            tracing::warn!(
                len = secret.len(),
                "auth secret is shorter than {MIN_SECRET_LEN} bytes"
            );
        }
        config = config.with_auth(secret.as_bytes().to_vec());
    }
    config
}

/// Reads a seed file: a JSON array of objects with `createdAt` and
/// `updatedAt` timestamp strings. Entries without an `id` get a random one.
pub fn load_seed(path: &Path) -> Result<Vec<Document>, SeedError> {
    let text = std::fs::read_to_string(path)?;
    let serde_json::Value::Array(entries) = serde_json::from_str(&text)? else {
        return Err(SeedError::NotAnArray);
    };

    entries
        .into_iter()
        .enumerate()
        .map(|(index, mut entry)| {
            if let serde_json::Value::Object(object) = &mut entry {
                object
                    .entry(ID)
                    .or_insert_with(|| uuid::Uuid::new_v4().to_string().into());
            }
            Document::from_json(entry).map_err(|source| SeedError::Document { index, source })
        })
        .collect()
}

/// Runs the serve command until Ctrl-C.
pub fn run(options: ServeOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(&options);
    let store = Arc::new(MemoryStore::new());

    if let Some(path) = &options.seed {
        let docs = load_seed(path)?;
        let count = docs.len();
        for doc in docs {
            store.put(&config.collection, doc);
        }
        tracing::info!(path = %path.display(), count, "loaded seed documents");
    }

    let server = SyncServer::new(config, store)?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use booksync_core::{Timestamp, CREATED_AT};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn options() -> ServeOptions {
        ServeOptions {
            bind: "127.0.0.1:9000".parse().unwrap(),
            route: "/books/delta".into(),
            collection: "library".into(),
            auth_secret: None,
            token_expiry_secs: 60,
            request_timeout_ms: Some(250),
            seed: None,
        }
    }

    fn seed_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn config_from_options() {
        let config = build_config(&options());
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.route_path, "/books/delta");
        assert_eq!(config.collection, "library");
        assert_eq!(config.request_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.token_expiry, Duration::from_secs(60));
        assert!(!config.require_auth);

        let mut secured = options();
        secured.auth_secret = Some("s".repeat(40));
        assert!(build_config(&secured).require_auth);
    }

    #[test]
    fn seed_loading() {
        let file = seed_file(
            r#"[
                {"id": "b1", "title": "Dune", "createdAt": "2024-01-10", "updatedAt": "2024-01-12T08:00:00Z"},
                {"title": "Untitled", "createdAt": "2024-02-01", "updatedAt": "2024-02-01"}
            ]"#,
        );

        let docs = load_seed(file.path()).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "b1");
        assert_eq!(
            docs[0].timestamp(CREATED_AT),
            Some(Timestamp::parse("2024-01-10").unwrap())
        );
        assert!(uuid::Uuid::parse_str(&docs[1].id).is_ok());
    }

    #[test]
    fn seed_errors() {
        let not_array = seed_file(r#"{"id": "b1"}"#);
        assert!(matches!(
            load_seed(not_array.path()),
            Err(SeedError::NotAnArray)
        ));

        let bad_json = seed_file("[");
        assert!(matches!(load_seed(bad_json.path()), Err(SeedError::Json(_))));

        let bad_date = seed_file(r#"[{"id": "b1", "createdAt": "soon", "updatedAt": "later"}]"#);
        assert!(matches!(
            load_seed(bad_date.path()),
            Err(SeedError::Document { index: 0, .. })
        ));

        assert!(matches!(
            load_seed(Path::new("/nonexistent/books.json")),
            Err(SeedError::Io(_))
        ));
    }
}
