//! WebSocket `/connect` end to end over a real listener.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use axum::http::StatusCode;

use crate::helpers::TestApp;

type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Serve the app on an ephemeral port and return its address.
async fn serve(app: &TestApp) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app.router.clone();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("ws://{addr}")
}

async fn next_text(client: &mut Client) -> String {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("Timed out waiting for a frame")
            .expect("Stream ended")
            .expect("WebSocket error");
        if let Message::Text(text) = msg {
            return text.as_str().to_string();
        }
    }
}

#[tokio::test]
async fn test_scalar_snapshot_and_broadcast() {
    let app = TestApp::scalar().await;
    let base = serve(&app).await;

    let (mut a, _) = connect_async(format!("{base}/connect")).await.unwrap();
    let (mut b, _) = connect_async(format!("{base}/connect")).await.unwrap();
    assert_eq!(next_text(&mut a).await, "0");
    assert_eq!(next_text(&mut b).await, "0");

    a.send(Message::text("+1")).await.unwrap();
    assert_eq!(next_text(&mut a).await, "1");
    assert_eq!(next_text(&mut b).await, "1");
}

#[tokio::test]
async fn test_hierarchical_increment_over_socket() {
    let app = TestApp::hierarchical().await;
    let base = serve(&app).await;

    let (mut client, _) = connect_async(format!("{base}/connect?region=DE&ip=10.1.2.3"))
        .await
        .unwrap();
    assert_eq!(next_text(&mut client).await, "{}");

    client.send(Message::text("hit")).await.unwrap();
    client.send(Message::text("hit")).await.unwrap();
    assert_eq!(next_text(&mut client).await, r#"{"DE":1,"DE.0":1,"DE.0.1":1}"#);
    assert_eq!(next_text(&mut client).await, r#"{"DE":2,"DE.0":2,"DE.0.1":2}"#);
}

#[tokio::test]
async fn test_late_joiner_gets_current_snapshot() {
    let app = TestApp::scalar().await;
    let base = serve(&app).await;
    for _ in 0..3 {
        app.request("POST", "/increment", None, &[]).await;
    }

    let (mut client, _) = connect_async(format!("{base}/connect")).await.unwrap();

    assert_eq!(next_text(&mut client).await, "3");
}

#[tokio::test]
async fn test_disconnect_removes_connection() {
    let app = TestApp::scalar().await;
    let base = serve(&app).await;

    let (mut client, _) = connect_async(format!("{base}/connect")).await.unwrap();
    next_text(&mut client).await;
    assert_eq!(app.engine.main().registry().len(), 1);

    client.close(None).await.unwrap();
    for _ in 0..50 {
        if app.engine.main().registry().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(app.engine.main().registry().is_empty());
}

#[tokio::test]
async fn test_hierarchical_connect_requires_metadata() {
    let app = TestApp::hierarchical().await;

    let response = app
        .request(
            "GET",
            "/connect",
            None,
            &[
                ("connection", "upgrade"),
                ("upgrade", "websocket"),
                ("sec-websocket-version", "13"),
                ("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ=="),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}
