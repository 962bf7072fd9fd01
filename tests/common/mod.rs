//! Shared fixtures for the REST and stream integration tests

#![allow(dead_code)]

use std::future::Future;
use std::time::Duration;

use kraken_mid::{Credentials, KrakenConfig};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, WebSocketStream};
use wiremock::MockServer;

/// Secret from the exchange's published signing example.
pub const TEST_SECRET: &str =
    "kQH5HW/8p1uGOVjbgWA7FunAmGO8lsSUXNsu3eow76sz84Q18fWxnyRzBHCd3pd5nE9qa99HAZtuZuj6F1huXg==";
pub const TEST_KEY: &str = "test-api-key";

pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

pub fn test_credentials() -> Credentials {
    Credentials::new(TEST_KEY, TEST_SECRET)
}

pub fn config_for(api_url: &str, ws_url: &str) -> KrakenConfig {
    KrakenConfig {
        api_url: api_url.to_string(),
        ws_url: ws_url.to_string(),
        timeout: Duration::from_secs(2),
    }
}

/// Accept one websocket connection on a local port and hand it to `script`.
/// Returns the `ws://` URL to connect to.
pub async fn spawn_ws_server<F, Fut>(script: F) -> String
where
    F: FnOnce(WebSocketStream<TcpStream>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let ws = accept_async(socket).await.unwrap();
        script(ws).await;
    });
    format!("ws://{}", addr)
}
