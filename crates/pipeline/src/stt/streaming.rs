//! WebSocket streaming recognizer
//!
//! One socket per call. Binary frames carry caller PCM upstream; text frames
//! downstream carry `{"is_partial": bool, "alternatives": [{"transcript": ..}]}`.
//! An `{"type":"end_of_stream"}` text frame asks the service to flush and close.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use media_gateway_config::RecognitionConfig;
use media_gateway_core::{
    Error, RecognitionMode, RecognitionResult, RecognitionSink, RecognitionStream, Result,
    SpeechRecognizer, SAMPLE_RATE_HZ,
};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const END_OF_STREAM: &str = r#"{"type":"end_of_stream"}"#;

#[derive(Debug, Clone)]
pub struct StreamingRecognizer {
    url: String,
    language: String,
    connect_timeout: Duration,
}

impl StreamingRecognizer {
    pub fn new(url: impl Into<String>, language: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            language: language.into(),
            connect_timeout,
        }
    }

    pub fn from_config(config: &RecognitionConfig) -> Self {
        Self::new(config.url.clone(), config.language.clone(), config.connect_timeout())
    }

    fn stream_url(&self, call_id: &str) -> Result<String> {
        let sample_rate = SAMPLE_RATE_HZ.to_string();
        let url = reqwest::Url::parse_with_params(
            &self.url,
            &[
                ("call_id", call_id),
                ("language", self.language.as_str()),
                ("sample_rate", sample_rate.as_str()),
                ("encoding", "pcm_s16le"),
            ],
        )
        .map_err(|e| Error::Recognition(format!("invalid recognition url {}: {}", self.url, e)))?;
        Ok(url.to_string())
    }
}

struct SocketSink {
    socket: SplitSink<Socket, Message>,
    finished: bool,
}

#[async_trait]
impl RecognitionSink for SocketSink {
    async fn send_audio(&mut self, pcm: Bytes) -> Result<()> {
        self.socket
            .send(Message::Binary(pcm.to_vec()))
            .await
            .map_err(|e| Error::Recognition(e.to_string()))
    }

    async fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.socket
            .send(Message::Text(END_OF_STREAM.to_string()))
            .await
            .map_err(|e| Error::Recognition(e.to_string()))
    }
}

fn result_stream(mut socket: SplitStream<Socket>) -> impl futures::Stream<Item = Result<RecognitionResult>> {
    async_stream::stream! {
        while let Some(message) = socket.next().await {
            match message {
                Ok(Message::Text(text)) => match serde_json::from_str::<RecognitionResult>(&text) {
                    Ok(result) => yield Ok(result),
                    Err(e) => tracing::debug!(error = %e, "Skipping unparseable recognition message"),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    yield Err(Error::Recognition(e.to_string()));
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl SpeechRecognizer for StreamingRecognizer {
    async fn open_stream(&self, call_id: &str) -> Result<RecognitionStream> {
        let url = self.stream_url(call_id)?;

        let (socket, _response) =
            tokio::time::timeout(self.connect_timeout, tokio_tungstenite::connect_async(url.as_str()))
                .await
                .map_err(|_| Error::Timeout(self.connect_timeout))?
                .map_err(|e| Error::Recognition(format!("connect failed: {}", e)))?;

        let (write, read) = socket.split();
        Ok(RecognitionStream {
            sink: Box::new(SocketSink {
                socket: write,
                finished: false,
            }),
            events: Box::pin(result_stream(read)),
        })
    }

    fn mode(&self) -> RecognitionMode {
        RecognitionMode::Streaming
    }

    fn name(&self) -> &str {
        "streaming"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

    /// Echoes one final result per binary frame, then closes on end-of-stream
    async fn fake_service() -> (String, tokio::task::JoinHandle<(usize, Option<String>)>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("ws://{}/v1/stream", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut query = None;
            let callback = |request: &Request, response: Response| -> std::result::Result<Response, ErrorResponse> {
                query = request.uri().query().map(str::to_string);
                Ok(response)
            };
            let mut socket = tokio_tungstenite::accept_hdr_async(stream, callback).await.unwrap();

            let mut frames = 0;
            while let Some(Ok(message)) = socket.next().await {
                match message {
                    Message::Binary(_) => {
                        frames += 1;
                        socket
                            .send(Message::Text(
                                r#"{"is_partial":true,"alternatives":[{"transcript":"hel"}]}"#.to_string(),
                            ))
                            .await
                            .unwrap();
                        socket
                            .send(Message::Text(
                                r#"{"is_partial":false,"alternatives":[{"transcript":"hello"}]}"#.to_string(),
                            ))
                            .await
                            .unwrap();
                    }
                    Message::Text(text) if text == END_OF_STREAM => {
                        let _ = socket.close(None).await;
                        break;
                    }
                    _ => {}
                }
            }
            (frames, query)
        });

        (address, handle)
    }

    #[tokio::test]
    async fn test_stream_round_trip() {
        let (url, service) = fake_service().await;
        let recognizer = StreamingRecognizer::new(url, "en-US", Duration::from_secs(2));

        let mut stream = recognizer.open_stream("call-77").await.unwrap();
        stream.sink.send_audio(Bytes::from(vec![1u8; 320])).await.unwrap();

        let first = stream.events.next().await.unwrap().unwrap();
        assert!(first.is_partial);
        let second = stream.events.next().await.unwrap().unwrap();
        assert_eq!(second.best_transcript(), Some("hello"));

        stream.sink.finish().await.unwrap();
        assert!(stream.events.next().await.is_none());

        let (frames, query) = service.await.unwrap();
        assert_eq!(frames, 1);
        let query = query.unwrap();
        assert!(query.contains("call_id=call-77"));
        assert!(query.contains("sample_rate=8000"));
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/v1/stream", listener.local_addr().unwrap());
        drop(listener);

        let recognizer = StreamingRecognizer::new(url, "en-US", Duration::from_secs(1));
        assert!(recognizer.open_stream("call").await.is_err());
    }

    #[test]
    fn test_invalid_url() {
        let recognizer = StreamingRecognizer::new("not a url", "en-US", Duration::from_secs(1));
        assert!(recognizer.stream_url("call").is_err());
    }
}
