//! Caller audio WebSocket
//!
//! `GET /ws/audio?callId=..&did=..` upgrades the connection and hands both
//! halves to the call session manager. The handler returns once the call
//! has been torn down.

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use media_gateway_transport::{FrameSink, FrameSource, InboundFrame, TransportError};

use crate::state::AppState;
use crate::ServerError;

/// Query parameters of the audio endpoint
#[derive(Debug, Default, Deserialize)]
pub struct AudioParams {
    #[serde(rename = "callId")]
    pub call_id: Option<String>,
    pub did: Option<String>,
}

impl AudioParams {
    /// Both parameters present and non-blank
    pub fn validate(self) -> Result<(String, String), ServerError> {
        let call_id = required(self.call_id, "callId")?;
        let did = required(self.did, "did")?;
        Ok((call_id, did))
    }
}

fn required(value: Option<String>, name: &str) -> Result<String, ServerError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServerError::InvalidRequest(format!("missing query parameter `{}`", name)))
}

/// GET /ws/audio
pub async fn audio_ws_handler(
    State(state): State<AppState>,
    Query(params): Query<AudioParams>,
    ws: Option<WebSocketUpgrade>,
) -> Result<Response, ServerError> {
    let (call_id, did) = params.validate()?;
    let ws = ws.ok_or(ServerError::UpgradeRequired)?;

    Ok(ws.on_upgrade(move |socket| handle_call(socket, state, call_id, did)))
}

async fn handle_call(socket: WebSocket, state: AppState, call_id: String, did: String) {
    let (sender, receiver) = socket.split();
    let sink = Box::new(WsFrameSink::new(sender));
    let source = Box::new(WsFrameSource::new(receiver));

    match state.calls.open(&call_id, &did, sink, source).await {
        Ok(session) => {
            session.wait().await;
            tracing::debug!(
                call_id = %call_id,
                reason = ?session.end_reason(),
                "Audio connection handler finished"
            );
        }
        Err(e) => {
            tracing::warn!(call_id = %call_id, error = %e, "Rejected audio connection");
        }
    }
}

/// Outbound half of an axum WebSocket
pub struct WsFrameSink {
    sender: SplitSink<WebSocket, Message>,
    closed: bool,
}

impl WsFrameSink {
    pub fn new(sender: SplitSink<WebSocket, Message>) -> Self {
        Self {
            sender,
            closed: false,
        }
    }

    async fn send(&mut self, message: Message) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.sender
            .send(message)
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

#[async_trait]
impl FrameSink for WsFrameSink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.send(Message::Text(text)).await
    }

    async fn send_binary(&mut self, data: Bytes) -> Result<(), TransportError> {
        self.send(Message::Binary(data.to_vec())).await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        // The peer may already be gone; closing is still complete
        let _ = self.sender.send(Message::Close(None)).await;
        self.sender
            .close()
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

/// Inbound half of an axum WebSocket
pub struct WsFrameSource {
    receiver: SplitStream<WebSocket>,
}

impl WsFrameSource {
    pub fn new(receiver: SplitStream<WebSocket>) -> Self {
        Self { receiver }
    }
}

#[async_trait]
impl FrameSource for WsFrameSource {
    async fn next_frame(&mut self) -> Option<Result<InboundFrame, TransportError>> {
        let message = match self.receiver.next().await? {
            Ok(message) => message,
            Err(e) => return Some(Err(TransportError::Receive(e.to_string()))),
        };

        Some(Ok(match message {
            Message::Binary(data) => InboundFrame::Audio(Bytes::from(data)),
            Message::Text(text) => InboundFrame::Text(text),
            Message::Ping(_) => InboundFrame::Ping,
            Message::Pong(_) => InboundFrame::Pong,
            Message::Close(_) => InboundFrame::Close,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_validation() {
        let ok = AudioParams {
            call_id: Some("c-1".into()),
            did: Some(" 1001 ".into()),
        };
        assert_eq!(ok.validate().unwrap(), ("c-1".to_string(), "1001".to_string()));

        let missing_did = AudioParams {
            call_id: Some("c-1".into()),
            did: None,
        };
        assert!(matches!(missing_did.validate(), Err(ServerError::InvalidRequest(_))));

        let blank_call = AudioParams {
            call_id: Some("   ".into()),
            did: Some("1001".into()),
        };
        assert!(matches!(blank_call.validate(), Err(ServerError::InvalidRequest(_))));
    }
}
