//! Transcription bridge
//!
//! Owns one recognition stream per call. The sender half drains the audio
//! queue, drops silence and forwards the rest in arrival order. The receiver
//! half turns recognition results into speech-start and final-transcript
//! callbacks.

use bytes::Bytes;
use futures::StreamExt;
use media_gateway_core::{
    is_silence, RecognitionEvents, RecognitionResult, RecognitionSink, SpeechRecognizer,
    TranscriptEvent,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::PipelineError;

/// Receives bridge callbacks. Implementations must return promptly.
pub trait TranscriptListener: Send + Sync + 'static {
    /// First non-empty result of an utterance
    fn on_speech_start(&self);

    /// Completed utterance
    fn on_transcript(&self, text: String);

    /// The recognition stream stopped while the call is still up. No more
    /// transcripts will arrive from it.
    fn on_recognition_ended(&self, end: RecognitionEnd);
}

/// Why a recognition stream stopped before the call ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEnd {
    /// The service closed the stream
    Closed,
    Failed(String),
}

/// Per-utterance state of the receiver
#[derive(Debug, Default)]
pub struct UtteranceTracker {
    speech_started: bool,
}

impl UtteranceTracker {
    pub fn in_utterance(&self) -> bool {
        self.speech_started
    }

    /// Events produced by one recognition result. Empty results produce none.
    pub fn observe(&mut self, result: &RecognitionResult) -> Vec<TranscriptEvent> {
        let Some(text) = result.best_transcript() else {
            return Vec::new();
        };

        let mut events = Vec::with_capacity(2);
        if !self.speech_started {
            self.speech_started = true;
            events.push(TranscriptEvent::SpeechStarted);
        }

        if result.is_partial {
            events.push(TranscriptEvent::Partial(text.to_string()));
        } else {
            events.push(TranscriptEvent::Final(text.to_string()));
            self.speech_started = false;
        }
        events
    }
}

pub struct TranscriptionBridge {
    recognizer: Arc<dyn SpeechRecognizer>,
    call_id: String,
}

impl TranscriptionBridge {
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>, call_id: impl Into<String>) -> Self {
        Self {
            recognizer,
            call_id: call_id.into(),
        }
    }

    /// Open the recognition stream and spawn its sender and receiver tasks.
    ///
    /// An error here leaves the call running without recognition.
    pub async fn start(
        self,
        audio: mpsc::Receiver<Bytes>,
        listener: Arc<dyn TranscriptListener>,
        cancel: CancellationToken,
        tasks: &TaskTracker,
    ) -> Result<(), PipelineError> {
        let stream = tokio::select! {
            _ = cancel.cancelled() => return Err(PipelineError::ChannelClosed),
            stream = self.recognizer.open_stream(&self.call_id) => {
                stream.map_err(|e| PipelineError::Stt(e.to_string()))?
            }
        };

        tracing::info!(
            call_id = %self.call_id,
            recognizer = self.recognizer.name(),
            "Recognition stream opened"
        );

        tasks.spawn(forward_audio(
            stream.sink,
            audio,
            cancel.clone(),
            self.call_id.clone(),
        ));
        tasks.spawn(dispatch_results(stream.events, listener, cancel, self.call_id));
        Ok(())
    }
}

async fn forward_audio(
    mut sink: Box<dyn RecognitionSink>,
    mut audio: mpsc::Receiver<Bytes>,
    cancel: CancellationToken,
    call_id: String,
) {
    let mut forwarded = 0u64;
    let mut silent = 0u64;

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            chunk = audio.recv() => chunk,
        };
        let Some(chunk) = chunk else {
            break;
        };

        if is_silence(&chunk) {
            silent += 1;
            metrics::counter!("gateway_audio_chunks_silent_total").increment(1);
            continue;
        }

        if let Err(e) = sink.send_audio(chunk).await {
            tracing::warn!(call_id = %call_id, error = %e, "Recognition upload failed");
            break;
        }
        forwarded += 1;
    }

    if let Err(e) = sink.finish().await {
        tracing::debug!(call_id = %call_id, error = %e, "Recognition stream finish failed");
    }
    tracing::debug!(call_id = %call_id, forwarded, silent, "Recognition sender stopped");
}

async fn dispatch_results(
    mut events: RecognitionEvents,
    listener: Arc<dyn TranscriptListener>,
    cancel: CancellationToken,
    call_id: String,
) {
    let mut tracker = UtteranceTracker::default();

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = events.next() => next,
        };

        match next {
            None => {
                tracing::info!(call_id = %call_id, "Recognition stream ended");
                if !cancel.is_cancelled() {
                    listener.on_recognition_ended(RecognitionEnd::Closed);
                }
                break;
            }
            Some(Err(e)) => {
                tracing::warn!(call_id = %call_id, error = %e, "Recognition stream failed");
                if !cancel.is_cancelled() {
                    listener.on_recognition_ended(RecognitionEnd::Failed(e.to_string()));
                }
                break;
            }
            Some(Ok(result)) => {
                for event in tracker.observe(&result) {
                    match event {
                        TranscriptEvent::SpeechStarted => {
                            tracing::debug!(call_id = %call_id, "Speech started");
                            listener.on_speech_start();
                        }
                        TranscriptEvent::Partial(text) => {
                            tracing::trace!(call_id = %call_id, partial = %text);
                        }
                        TranscriptEvent::Final(text) => {
                            tracing::info!(call_id = %call_id, transcript = %text, "Final transcript");
                            listener.on_transcript(text);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stt::{audio_queue, SimulatedRecognizer};
    use parking_lot::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl TranscriptListener for Recorder {
        fn on_speech_start(&self) {
            self.events.lock().push("start".to_string());
        }

        fn on_transcript(&self, text: String) {
            self.events.lock().push(format!("final:{}", text));
        }

        fn on_recognition_ended(&self, end: RecognitionEnd) {
            self.events.lock().push(format!("ended:{:?}", end));
        }
    }

    fn loud(len: usize) -> Bytes {
        Bytes::from(
            std::iter::repeat(1000i16.to_le_bytes())
                .take(len / 2)
                .flatten()
                .collect::<Vec<u8>>(),
        )
    }

    #[test]
    fn test_tracker_speech_start_once_per_utterance() {
        let mut tracker = UtteranceTracker::default();

        let events = tracker.observe(&RecognitionResult::partial("I"));
        assert_eq!(events, vec![TranscriptEvent::SpeechStarted, TranscriptEvent::Partial("I".into())]);

        let events = tracker.observe(&RecognitionResult::partial("I need"));
        assert_eq!(events, vec![TranscriptEvent::Partial("I need".into())]);

        let events = tracker.observe(&RecognitionResult::final_result("I need help"));
        assert_eq!(events, vec![TranscriptEvent::Final("I need help".into())]);
        assert!(!tracker.in_utterance());

        let events = tracker.observe(&RecognitionResult::final_result("Thanks"));
        assert_eq!(
            events,
            vec![TranscriptEvent::SpeechStarted, TranscriptEvent::Final("Thanks".into())]
        );
    }

    #[test]
    fn test_tracker_ignores_empty_results() {
        let mut tracker = UtteranceTracker::default();
        assert!(tracker.observe(&RecognitionResult::partial("")).is_empty());
        assert!(tracker.observe(&RecognitionResult::default()).is_empty());
        assert!(!tracker.in_utterance());
    }

    #[tokio::test]
    async fn test_bridge_filters_silence_and_preserves_order() {
        let recognizer = Arc::new(SimulatedRecognizer::new());
        let (queue, rx) = audio_queue(16);
        let cancel = CancellationToken::new();
        let tasks = TaskTracker::new();
        let listener = Arc::new(Recorder::default());

        TranscriptionBridge::new(recognizer.clone(), "call-1")
            .start(rx, listener.clone(), cancel.clone(), &tasks)
            .await
            .unwrap();
        let stream = recognizer.stream("call-1").unwrap();

        queue.offer(loud(320));
        queue.offer(Bytes::from(vec![0u8; 320]));
        queue.offer(Bytes::from(vec![0xAB]));
        let mut tagged = loud(320).to_vec();
        tagged[0] = 0x01;
        queue.offer(Bytes::from(tagged.clone()));
        queue.close();

        tokio::time::timeout(Duration::from_secs(1), stream.wait_finished())
            .await
            .unwrap();
        let received = stream.received_audio();
        assert_eq!(received.len(), 2);
        assert_eq!(received[1].as_ref(), tagged.as_slice());

        cancel.cancel();
        tasks.close();
        tasks.wait().await;
    }

    #[tokio::test]
    async fn test_bridge_dispatches_events() {
        let recognizer = Arc::new(SimulatedRecognizer::new());
        let (_queue, rx) = audio_queue(4);
        let cancel = CancellationToken::new();
        let tasks = TaskTracker::new();
        let listener = Arc::new(Recorder::default());

        TranscriptionBridge::new(recognizer.clone(), "call-2")
            .start(rx, listener.clone(), cancel.clone(), &tasks)
            .await
            .unwrap();
        let stream = recognizer.stream("call-2").unwrap();

        stream.push(RecognitionResult::partial("book"));
        stream.push(RecognitionResult::final_result("book a visit"));
        stream.end();

        tasks.close();
        tokio::time::timeout(Duration::from_secs(1), async {
            while listener.events.lock().len() < 3 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(
            listener.events.lock().as_slice(),
            [
                "start".to_string(),
                "final:book a visit".to_string(),
                "ended:Closed".to_string(),
            ]
        );

        cancel.cancel();
        tasks.wait().await;
    }

    #[tokio::test]
    async fn test_stream_failure_reported_to_listener() {
        let recognizer = Arc::new(SimulatedRecognizer::new());
        let (_queue, rx) = audio_queue(4);
        let cancel = CancellationToken::new();
        let tasks = TaskTracker::new();
        let listener = Arc::new(Recorder::default());

        TranscriptionBridge::new(recognizer.clone(), "call-4")
            .start(rx, listener.clone(), cancel.clone(), &tasks)
            .await
            .unwrap();
        recognizer.stream("call-4").unwrap().fail("socket reset");

        tokio::time::timeout(Duration::from_secs(1), async {
            while listener.events.lock().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        let events = listener.events.lock().clone();
        assert_eq!(events.len(), 1);
        assert!(events[0].starts_with("ended:Failed("));
        assert!(events[0].contains("socket reset"));

        cancel.cancel();
        tasks.close();
        tasks.wait().await;
    }

    #[tokio::test]
    async fn test_cancelled_call_does_not_report_end() {
        let recognizer = Arc::new(SimulatedRecognizer::new());
        let (_queue, rx) = audio_queue(4);
        let cancel = CancellationToken::new();
        let tasks = TaskTracker::new();
        let listener = Arc::new(Recorder::default());

        TranscriptionBridge::new(recognizer.clone(), "call-5")
            .start(rx, listener.clone(), cancel.clone(), &tasks)
            .await
            .unwrap();
        cancel.cancel();
        recognizer.stream("call-5").unwrap().end();

        tasks.close();
        tasks.wait().await;
        assert!(listener.events.lock().is_empty());
    }

    #[tokio::test]
    async fn test_open_failure_is_reported() {
        let recognizer = Arc::new(SimulatedRecognizer::new());
        recognizer.fail_next_open();
        let (_queue, rx) = audio_queue(4);

        let result = TranscriptionBridge::new(recognizer, "call-3")
            .start(rx, Arc::new(Recorder::default()), CancellationToken::new(), &TaskTracker::new())
            .await;
        assert!(matches!(result, Err(PipelineError::Stt(_))));
    }
}
