//! Recognizer for clients that transcribe locally
//!
//! Audio is accepted and discarded; transcripts arrive as `transcript`
//! control frames instead.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use media_gateway_core::{
    RecognitionMode, RecognitionResult, RecognitionSink, RecognitionStream, Result,
    SpeechRecognizer,
};
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, Default)]
pub struct InjectedRecognizer;

struct DiscardSink {
    done: Option<oneshot::Sender<()>>,
}

#[async_trait]
impl RecognitionSink for DiscardSink {
    async fn send_audio(&mut self, _pcm: Bytes) -> Result<()> {
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        if let Some(done) = self.done.take() {
            let _ = done.send(());
        }
        Ok(())
    }
}

#[async_trait]
impl SpeechRecognizer for InjectedRecognizer {
    async fn open_stream(&self, _call_id: &str) -> Result<RecognitionStream> {
        let (done_tx, done_rx) = oneshot::channel::<()>();
        let events = futures::stream::once(done_rx)
            .filter_map(|_| futures::future::ready(None::<Result<RecognitionResult>>));

        Ok(RecognitionStream {
            sink: Box::new(DiscardSink { done: Some(done_tx) }),
            events: Box::pin(events),
        })
    }

    fn mode(&self) -> RecognitionMode {
        RecognitionMode::Injected
    }

    fn name(&self) -> &str {
        "injected"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_end_after_finish() {
        let mut stream = InjectedRecognizer.open_stream("call").await.unwrap();
        stream.sink.send_audio(Bytes::from_static(&[1, 2, 3, 4])).await.unwrap();
        stream.sink.finish().await.unwrap();
        assert!(stream.events.next().await.is_none());
    }

    #[test]
    fn test_mode() {
        assert_eq!(InjectedRecognizer.mode(), RecognitionMode::Injected);
    }
}
