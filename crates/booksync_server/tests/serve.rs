//! Serving over a real TCP listener.

use booksync_server::{ServerConfig, SyncServer};
use booksync_testkit::prelude::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

async fn raw_get(addr: std::net::SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn serves_until_shutdown() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = SyncServer::new(ServerConfig::new(addr), seeded_store(x_and_y())).unwrap();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(server.serve_on(listener, async {
        let _ = stop_rx.await;
    }));

    let health = raw_get(addr, "/healthz").await;
    assert!(health.starts_with("HTTP/1.1 200"));

    let delta = raw_get(addr, "/getBooksAfterDate?date=2024-01-05").await;
    assert!(delta.starts_with("HTTP/1.1 200"));
    assert!(delta.contains("\"countCreatedData\":1"));

    let missing = raw_get(addr, "/getBooksAfterDate").await;
    assert!(missing.starts_with("HTTP/1.1 400"));

    stop_tx.send(()).unwrap();
    task.await.unwrap().unwrap();
}
