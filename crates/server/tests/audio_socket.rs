//! Drives a call over a real WebSocket against the served router

use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use media_gateway_agent::SessionServices;
use media_gateway_config::Settings;
use media_gateway_server::{create_router, AppState};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn serve() -> (String, AppState) {
    let mut settings = Settings::default();
    settings.session.greeting_delay_ms = 0;
    let services = SessionServices::from_settings(&settings).unwrap();
    let state = AppState::new(settings, services);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = create_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("ws://{}", addr), state)
}

async fn next_json(ws: &mut Client) -> serde_json::Value {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("frame within deadline")
            .expect("stream open")
            .unwrap();
        if let Message::Text(text) = message {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn test_greeting_and_injected_turn() {
    let (base, state) = serve().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("{}/ws/audio?callId=ws-1&did=1001", base))
        .await
        .unwrap();

    let greeting = next_json(&mut ws).await;
    assert_eq!(greeting["type"], "greeting");
    assert_eq!(greeting["voice"], "Joanna");
    assert_eq!(greeting["engine"], "neural");

    let info = state.calls.get("ws-1").unwrap().info();
    assert_eq!(info.tenant_id, "downtown-medical");

    ws.send(Message::Text(r#"{"type":"transcript","text":"I'd like to book an appointment"}"#.into()))
        .await
        .unwrap();
    let reply = next_json(&mut ws).await;
    assert_eq!(reply["type"], "response");
    assert_eq!(reply["voice"], "Joanna");
    assert!(!reply["text"].as_str().unwrap().is_empty());

    ws.close(None).await.unwrap();
    let calls = state.calls.clone();
    wait_until(move || calls.active_count() == 0).await;
}

#[tokio::test]
async fn test_unknown_did_gets_default_tenant() {
    let (base, state) = serve().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("{}/ws/audio?callId=ws-2&did=5550000", base))
        .await
        .unwrap();

    let greeting = next_json(&mut ws).await;
    assert_eq!(greeting["type"], "greeting");
    let fallback = state.calls.services().tenants.fallback().clone();
    assert_eq!(greeting["voice"], fallback.voice_id.as_str());
    assert_eq!(greeting["text"], fallback.greeting.as_str());

    state.calls.shutdown().await;
    assert_eq!(state.calls.active_count(), 0);
}

#[tokio::test]
async fn test_admin_hangup_closes_socket() {
    let (base, state) = serve().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("{}/ws/audio?callId=ws-3&did=1002", base))
        .await
        .unwrap();
    let _greeting = next_json(&mut ws).await;

    state.calls.hangup("ws-3").await.unwrap();

    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(message) = ws.next().await {
            match message {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok());
    let calls = state.calls.clone();
    wait_until(move || calls.get("ws-3").is_none()).await;
}
