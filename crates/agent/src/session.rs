//! Call sessions and their manager
//!
//! A call session owns one caller connection and a task group tied to one
//! cancellation token: ingress reader, transcription sender and receiver,
//! turn worker, and a supervisor that tears the call down exactly once.
//!
//! ```text
//! caller ──► ingress ──► audio queue ──► recognition ──► speech start ──► barge-in
//!                │                              │
//!                └── injected transcript ──┬────┘ final transcript
//!                                          ▼
//!                                    turn worker ──► agent ──► playback ──► caller
//! ```

use chrono::{DateTime, Utc};
use media_gateway_config::{PlaybackConfig, SessionConfig};
use media_gateway_core::{RecognitionMode, TenantProfile};
use media_gateway_pipeline::{
    audio_queue, AudioQueue, PlaybackEngine, PlaybackOutcome, PlaybackTarget, SpeakingState,
    RecognitionEnd, TranscriptListener, TranscriptionBridge,
};
use media_gateway_transport::{FrameSink, FrameSource, OutboundMessage, TransportWriter};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::barge_in::BargeInCoordinator;
use crate::ingress::{AudioIngress, IngressExit};
use crate::services::SessionServices;
use crate::turn::{closing_delays, DialogueTurnController, TurnSubmitter};
use crate::AgentError;

/// Why a call ended. The first reason recorded wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    CallerHangup,
    ReadTimeout,
    TransportError,
    EndOfCall,
    Handoff,
    AdminHangup,
    Shutdown,
    /// A new connection arrived with the same call id
    Replaced,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::CallerHangup => "caller_hangup",
            EndReason::ReadTimeout => "read_timeout",
            EndReason::TransportError => "transport_error",
            EndReason::EndOfCall => "end_of_call",
            EndReason::Handoff => "handoff",
            EndReason::AdminHangup => "admin_hangup",
            EndReason::Shutdown => "shutdown",
            EndReason::Replaced => "replaced",
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of an active call
#[derive(Debug, Clone, Serialize)]
pub struct CallInfo {
    pub call_id: String,
    pub dialed_number: String,
    pub tenant_id: String,
    pub tenant_name: String,
    pub voice_id: String,
    pub started_at: DateTime<Utc>,
    pub duration_secs: u64,
    pub speaking: bool,
    pub dropped_audio_chunks: u64,
    /// Recognition is gone; only injected transcripts can start turns
    pub recognition_degraded: bool,
}

/// One active call
pub struct CallSession {
    call_id: String,
    dialed_number: String,
    tenant: TenantProfile,
    started_at: DateTime<Utc>,
    opened: Instant,
    writer: Arc<TransportWriter>,
    speaking: Arc<SpeakingState>,
    queue: Arc<AudioQueue>,
    cancel: CancellationToken,
    tasks: TaskTracker,
    services: SessionServices,
    end_reason: Mutex<Option<EndReason>>,
    recognition_degraded: AtomicBool,
    torn_down: AtomicBool,
}

impl CallSession {
    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    pub fn dialed_number(&self) -> &str {
        &self.dialed_number
    }

    pub fn tenant(&self) -> &TenantProfile {
        &self.tenant
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking.is_speaking()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        *self.end_reason.lock()
    }

    pub fn is_recognition_degraded(&self) -> bool {
        self.recognition_degraded.load(Ordering::Acquire)
    }

    /// Recognition stopped or never opened. The call carries on.
    fn mark_recognition_degraded(&self, cause: &str) {
        if self.is_cancelled() || self.recognition_degraded.swap(true, Ordering::AcqRel) {
            return;
        }
        metrics::counter!("gateway_recognition_degraded_total").increment(1);
        tracing::warn!(call_id = %self.call_id, cause = %cause, "Recognition unavailable for the rest of the call");
    }

    /// End the call. Later reasons are ignored once one is recorded.
    pub fn cancel(&self, reason: EndReason) {
        {
            let mut recorded = self.end_reason.lock();
            if recorded.is_none() {
                *recorded = Some(reason);
            }
        }
        self.cancel.cancel();
    }

    /// Wait until every session task, teardown included, has finished
    pub async fn wait(&self) {
        self.tasks.wait().await;
    }

    pub fn info(&self) -> CallInfo {
        CallInfo {
            call_id: self.call_id.clone(),
            dialed_number: self.dialed_number.clone(),
            tenant_id: self.tenant.tenant_id.clone(),
            tenant_name: self.tenant.display_name.clone(),
            voice_id: self.tenant.voice_id.clone(),
            started_at: self.started_at,
            duration_secs: self.opened.elapsed().as_secs(),
            speaking: self.is_speaking(),
            dropped_audio_chunks: self.queue.dropped_count(),
            recognition_degraded: self.is_recognition_degraded(),
        }
    }

    /// Release everything the call holds. Only the first call does any work.
    ///
    /// Order: cancellation, audio queue, transport, then upstream sessions.
    /// A replaced session leaves the upstream sessions to its replacement.
    pub async fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }
        self.cancel(EndReason::CallerHangup);
        self.queue.close();

        if let Err(e) = self.writer.close().await {
            tracing::debug!(call_id = %self.call_id, error = %e, "Transport close failed");
        }
        // Upstream sessions are keyed by call id and now belong to the replacement
        if self.end_reason() != Some(EndReason::Replaced) {
            if let Err(e) = self.services.recognizer.end_session(&self.call_id).await {
                tracing::warn!(call_id = %self.call_id, error = %e, "Ending recognition session failed");
            }
            if let Err(e) = self.services.dialogue.end_session(&self.call_id).await {
                tracing::warn!(call_id = %self.call_id, error = %e, "Ending dialogue session failed");
            }
        }

        metrics::gauge!("gateway_calls_active").decrement(1.0);
        tracing::info!(
            call_id = %self.call_id,
            did = %self.dialed_number,
            reason = %self.end_reason().unwrap_or(EndReason::CallerHangup),
            duration_secs = self.opened.elapsed().as_secs(),
            dropped_audio_chunks = self.queue.dropped_count(),
            "Call ended"
        );
    }

    fn playback_target(&self) -> PlaybackTarget {
        PlaybackTarget {
            call_id: self.call_id.clone(),
            tenant: self.tenant.clone(),
            writer: self.writer.clone(),
            speaking: self.speaking.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl fmt::Debug for CallSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSession")
            .field("call_id", &self.call_id)
            .field("dialed_number", &self.dialed_number)
            .field("tenant_id", &self.tenant.tenant_id)
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

type Registry = Arc<RwLock<HashMap<String, Arc<CallSession>>>>;

/// Opens calls and keeps the registry of active ones
pub struct CallSessionManager {
    services: SessionServices,
    config: SessionConfig,
    playback: Arc<PlaybackEngine>,
    registry: Registry,
    root: CancellationToken,
}

impl CallSessionManager {
    pub fn new(services: SessionServices, config: SessionConfig, playback: &PlaybackConfig) -> Self {
        let engine = PlaybackEngine::new(services.synthesizer.clone(), playback);
        Self {
            services,
            config,
            playback: Arc::new(engine),
            registry: Arc::new(RwLock::new(HashMap::new())),
            root: CancellationToken::new(),
        }
    }

    pub fn services(&self) -> &SessionServices {
        &self.services
    }

    /// Open a call on a freshly connected transport.
    ///
    /// Tenant resolution falls back to the default tenant and never fails
    /// the call. Fails only once the manager is shutting down.
    pub async fn open(
        &self,
        call_id: &str,
        dialed_number: &str,
        sink: Box<dyn FrameSink>,
        source: Box<dyn FrameSource>,
    ) -> Result<Arc<CallSession>, AgentError> {
        if self.root.is_cancelled() {
            return Err(AgentError::ShuttingDown);
        }

        let tenant = self.services.tenants.resolve(dialed_number).await;
        let (queue, audio_rx) = audio_queue(self.config.audio_queue_capacity);
        let session = Arc::new(CallSession {
            call_id: call_id.to_string(),
            dialed_number: dialed_number.to_string(),
            tenant,
            started_at: Utc::now(),
            opened: Instant::now(),
            writer: Arc::new(TransportWriter::new(sink)),
            speaking: SpeakingState::new(),
            queue,
            cancel: self.root.child_token(),
            tasks: TaskTracker::new(),
            services: self.services.clone(),
            end_reason: Mutex::new(None),
            recognition_degraded: AtomicBool::new(false),
            torn_down: AtomicBool::new(false),
        });

        let replaced = self
            .registry
            .write()
            .insert(call_id.to_string(), session.clone());
        if let Some(previous) = replaced {
            tracing::warn!(call_id = %call_id, "Call id reconnected, replacing previous session");
            previous.cancel(EndReason::Replaced);
        }

        metrics::counter!("gateway_calls_total").increment(1);
        metrics::gauge!("gateway_calls_active").increment(1.0);
        tracing::info!(
            call_id = %call_id,
            did = %dialed_number,
            tenant = %session.tenant.tenant_id,
            voice = %session.tenant.voice_id,
            "Call opened"
        );

        self.spawn_tasks(&session, audio_rx, source);
        session.tasks.close();
        Ok(session)
    }

    fn spawn_tasks(
        &self,
        session: &Arc<CallSession>,
        audio_rx: mpsc::Receiver<bytes::Bytes>,
        mut source: Box<dyn FrameSource>,
    ) {
        let tasks = &session.tasks;
        let (turns, turn_rx) = TurnSubmitter::channel(&session.call_id);

        // Supervisor
        let registry = self.registry.clone();
        let supervised = session.clone();
        tasks.spawn(async move {
            supervised.cancel.cancelled().await;
            supervised.teardown().await;
            let mut registry = registry.write();
            if registry
                .get(&supervised.call_id)
                .is_some_and(|current| Arc::ptr_eq(current, &supervised))
            {
                registry.remove(&supervised.call_id);
            }
        });

        // Ingress
        let injected = self.services.recognizer.mode() == RecognitionMode::Injected;
        let mut ingress = AudioIngress::new(
            session.call_id.clone(),
            session.queue.clone(),
            turns.clone(),
            self.config.read_timeout(injected),
        );
        let reader = session.clone();
        tasks.spawn(async move {
            let exit = ingress.run(source.as_mut(), &reader.cancel).await;
            let stats = ingress.stats();
            tracing::debug!(
                call_id = %reader.call_id,
                queued = stats.queued,
                dropped = stats.dropped,
                transcripts = stats.transcripts,
                exit = ?exit,
                "Ingress stopped"
            );
            match exit {
                IngressExit::Cancelled => {}
                IngressExit::Disconnected => reader.cancel(EndReason::CallerHangup),
                IngressExit::IdleTimeout => reader.cancel(EndReason::ReadTimeout),
                IngressExit::ReadError(e) => {
                    tracing::warn!(call_id = %reader.call_id, error = %e, "Caller connection failed");
                    reader.cancel(EndReason::TransportError);
                }
            }
        });

        // Transcription bridge
        let listener = Arc::new(SessionListener {
            barge_in: BargeInCoordinator::new(
                session.call_id.clone(),
                session.speaking.clone(),
                self.services.telephony.clone(),
                tasks.clone(),
            ),
            turns,
            session: session.clone(),
        });
        let bridge = TranscriptionBridge::new(self.services.recognizer.clone(), session.call_id.clone());
        let bridged = session.clone();
        tasks.spawn(async move {
            if let Err(e) = bridge
                .start(audio_rx, listener, bridged.cancel.clone(), &bridged.tasks)
                .await
            {
                bridged.mark_recognition_degraded(&e.to_string());
            }
        });

        // Turn worker
        let worker = TurnWorker {
            session: session.clone(),
            controller: DialogueTurnController::new(
                session.call_id.clone(),
                &session.tenant,
                self.services.dialogue.clone(),
                self.services.conversation_log.clone(),
                tasks.clone(),
            ),
            playback: self.playback.clone(),
            config: self.config.clone(),
        };
        tasks.spawn(worker.run(turn_rx));
    }

    pub fn get(&self, call_id: &str) -> Option<Arc<CallSession>> {
        self.registry.read().get(call_id).cloned()
    }

    pub fn list(&self) -> Vec<CallInfo> {
        let mut calls: Vec<CallInfo> = self.registry.read().values().map(|s| s.info()).collect();
        calls.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        calls
    }

    pub fn active_count(&self) -> usize {
        self.registry.read().len()
    }

    /// Hang up a call on the switch and end the session
    pub async fn hangup(&self, call_id: &str) -> Result<(), AgentError> {
        let session = self
            .get(call_id)
            .ok_or_else(|| AgentError::CallNotFound(call_id.to_string()))?;

        if self.services.telephony.is_enabled() {
            if let Err(e) = self.services.telephony.hangup(call_id).await {
                tracing::warn!(call_id = %call_id, error = %e, "Switch hangup failed");
            }
        }
        session.cancel(EndReason::AdminHangup);
        Ok(())
    }

    /// Cancel every call and wait for their teardown
    pub async fn shutdown(&self) {
        let sessions: Vec<Arc<CallSession>> = self.registry.read().values().cloned().collect();
        tracing::info!(active = sessions.len(), "Shutting down call sessions");

        for session in &sessions {
            session.cancel(EndReason::Shutdown);
        }
        self.root.cancel();
        for session in sessions {
            session.wait().await;
        }
    }
}

struct SessionListener {
    barge_in: BargeInCoordinator,
    turns: TurnSubmitter,
    session: Arc<CallSession>,
}

impl TranscriptListener for SessionListener {
    fn on_speech_start(&self) {
        self.barge_in.on_speech_start();
    }

    fn on_transcript(&self, text: String) {
        self.turns.submit(text);
    }

    fn on_recognition_ended(&self, end: RecognitionEnd) {
        let cause = match end {
            RecognitionEnd::Closed => "stream closed by service".to_string(),
            RecognitionEnd::Failed(e) => e,
        };
        self.session.mark_recognition_degraded(&cause);
    }
}

/// Greets the caller, then runs turns one at a time
struct TurnWorker {
    session: Arc<CallSession>,
    controller: DialogueTurnController,
    playback: Arc<PlaybackEngine>,
    config: SessionConfig,
}

impl TurnWorker {
    async fn run(self, mut turns: mpsc::UnboundedReceiver<String>) {
        let cancel = self.session.cancel.clone();

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(self.config.greeting_delay()) => {}
        }
        if !self.greet().await {
            return;
        }

        loop {
            let utterance = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = turns.recv() => match next {
                    Some(utterance) => utterance,
                    None => break,
                },
            };

            let response = tokio::select! {
                _ = cancel.cancelled() => break,
                response = self.controller.take_turn(&utterance) => response,
            };

            if !self.speak(&response.completion).await {
                break;
            }

            for (delay, reason) in closing_delays(
                &response,
                self.config.handoff_grace(),
                self.config.end_of_call_grace(),
            ) {
                self.schedule_cancel(delay, reason);
            }
        }
    }

    async fn greet(&self) -> bool {
        let session = &self.session;
        let greeting = OutboundMessage::greeting(&session.tenant);
        if let Err(e) = session.writer.send_message(&greeting).await {
            tracing::warn!(call_id = %session.call_id, error = %e, "Greeting failed");
            session.cancel(EndReason::TransportError);
            return false;
        }
        tracing::debug!(call_id = %session.call_id, tenant = %session.tenant.tenant_id, "Greeting sent");

        if self.config.speak_greeting {
            return self.speak(&session.tenant.greeting).await;
        }
        true
    }

    /// Speak one utterance. Returns false once the call is over.
    async fn speak(&self, text: &str) -> bool {
        let session = &self.session;
        match self.playback.speak(&session.playback_target(), text).await {
            Ok(PlaybackOutcome::Cancelled) => false,
            Ok(outcome) => {
                tracing::debug!(call_id = %session.call_id, outcome = ?outcome, "Utterance finished");
                true
            }
            Err(e) if e.is_transport() => {
                tracing::warn!(call_id = %session.call_id, error = %e, "Caller connection failed during playback");
                session.cancel(EndReason::TransportError);
                false
            }
            Err(e) => {
                tracing::error!(call_id = %session.call_id, error = %e, "Speech synthesis failed, utterance dropped");
                true
            }
        }
    }

    fn schedule_cancel(&self, delay: Duration, reason: EndReason) {
        let session = self.session.clone();
        tracing::info!(
            call_id = %session.call_id,
            reason = %reason,
            delay_ms = delay.as_millis() as u64,
            "Scheduling hang-up"
        );
        self.session.tasks.spawn(async move {
            tokio::select! {
                _ = session.cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => session.cancel(reason),
            }
        });
    }
}
