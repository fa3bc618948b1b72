//! Simulated recognizer driven in-process
//!
//! Each opened stream records the audio it receives and emits whatever
//! results are pushed through its [`SimulatedStream`] handle.

use async_trait::async_trait;
use bytes::Bytes;
use media_gateway_core::{
    Error, RecognitionMode, RecognitionResult, RecognitionSink, RecognitionStream, Result,
    SpeechRecognizer,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

#[derive(Default)]
struct StreamShared {
    results: Mutex<Option<mpsc::UnboundedSender<Result<RecognitionResult>>>>,
    audio: Mutex<Vec<Bytes>>,
    finished: AtomicBool,
    finished_notify: Notify,
}

/// Test-side handle to one simulated recognition stream
#[derive(Clone)]
pub struct SimulatedStream {
    shared: Arc<StreamShared>,
}

impl SimulatedStream {
    /// Emit a recognition result
    pub fn push(&self, result: RecognitionResult) -> bool {
        match self.shared.results.lock().as_ref() {
            Some(tx) => tx.send(Ok(result)).is_ok(),
            None => false,
        }
    }

    /// Fail the result stream
    pub fn fail(&self, message: &str) -> bool {
        match self.shared.results.lock().take() {
            Some(tx) => tx.send(Err(Error::Recognition(message.to_string()))).is_ok(),
            None => false,
        }
    }

    /// End the result stream
    pub fn end(&self) {
        self.shared.results.lock().take();
    }

    pub fn received_audio(&self) -> Vec<Bytes> {
        self.shared.audio.lock().clone()
    }

    /// Whether the sender has finished the upstream stream
    pub fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::Acquire)
    }

    pub async fn wait_finished(&self) {
        loop {
            let notified = self.shared.finished_notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_finished() {
                return;
            }
            notified.await;
        }
    }
}

struct SimulatedSink {
    shared: Arc<StreamShared>,
}

#[async_trait]
impl RecognitionSink for SimulatedSink {
    async fn send_audio(&mut self, pcm: Bytes) -> Result<()> {
        if self.shared.finished.load(Ordering::Acquire) {
            return Err(Error::Recognition("stream already finished".to_string()));
        }
        self.shared.audio.lock().push(pcm);
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        self.shared.finished.store(true, Ordering::Release);
        self.shared.finished_notify.notify_waiters();
        Ok(())
    }
}

#[derive(Default)]
pub struct SimulatedRecognizer {
    streams: Mutex<HashMap<String, SimulatedStream>>,
    ended: Mutex<Vec<String>>,
    fail_next: AtomicBool,
}

impl SimulatedRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the stream opened for `call_id`
    pub fn stream(&self, call_id: &str) -> Option<SimulatedStream> {
        self.streams.lock().get(call_id).cloned()
    }

    /// Wait until a stream is opened for `call_id`
    pub async fn wait_for_stream(&self, call_id: &str) -> SimulatedStream {
        loop {
            if let Some(stream) = self.stream(call_id) {
                return stream;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Make the next `open_stream` call fail
    pub fn fail_next_open(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Calls whose recognition session has been ended
    pub fn ended_sessions(&self) -> Vec<String> {
        self.ended.lock().clone()
    }
}

#[async_trait]
impl SpeechRecognizer for SimulatedRecognizer {
    async fn open_stream(&self, call_id: &str) -> Result<RecognitionStream> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(Error::Recognition("simulated open failure".to_string()));
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let shared = Arc::new(StreamShared {
            results: Mutex::new(Some(tx)),
            ..Default::default()
        });
        self.streams.lock().insert(
            call_id.to_string(),
            SimulatedStream {
                shared: shared.clone(),
            },
        );

        let events = async_stream::stream! {
            while let Some(item) = rx.recv().await {
                yield item;
            }
        };

        Ok(RecognitionStream {
            sink: Box::new(SimulatedSink { shared }),
            events: Box::pin(events),
        })
    }

    fn mode(&self) -> RecognitionMode {
        RecognitionMode::Streaming
    }

    async fn end_session(&self, call_id: &str) -> Result<()> {
        self.ended.lock().push(call_id.to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
