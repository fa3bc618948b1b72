//! End-to-end call session tests
//!
//! Each test drives a full session through the loopback transport with the
//! simulated recognizer and in-process synthesis, dialogue and switch mocks.

use async_trait::async_trait;
use media_gateway_agent::{
    AgentError, CallSession, CallSessionManager, EndReason, SessionServices,
    StaticTenantDirectory, TenantDirectory,
};
use media_gateway_config::{PlaybackConfig, SessionConfig};
use media_gateway_core::{
    AgentReply, DialogueService, Error, RecognitionResult, Result, SessionAttributes,
    SpeechSynthesizer, SynthesisRequest, SynthesizedSpeech, TelephonyControl, TenantProfile,
    TenantResolver, APOLOGY_TEXT,
};
use media_gateway_pipeline::{SimulatedRecognizer, SimulatedStream};
use media_gateway_transport::{loopback, LoopbackPeer, OutboundFrame};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

const CHUNK: usize = 3200;

struct PcmSynthesizer {
    bytes: usize,
    requests: Mutex<Vec<SynthesisRequest>>,
}

#[async_trait]
impl SpeechSynthesizer for PcmSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesizedSpeech> {
        self.requests.lock().push(request.clone());
        let pcm = vec![0x11u8; self.bytes];
        Ok(SynthesizedSpeech::Pcm(Box::pin(std::io::Cursor::new(pcm))))
    }

    fn name(&self) -> &str {
        "pcm"
    }
}

#[derive(Default)]
struct MockDialogue {
    replies: Mutex<HashMap<String, AgentReply>>,
    invoked: Mutex<Vec<(String, String, SessionAttributes)>>,
    ended: Mutex<Vec<String>>,
    latency: Mutex<Duration>,
}

impl MockDialogue {
    fn reply(&self, input: &str, reply: AgentReply) {
        self.replies.lock().insert(input.to_string(), reply);
    }
}

#[async_trait]
impl DialogueService for MockDialogue {
    async fn invoke(&self, session_id: &str, input: &str, attributes: &SessionAttributes) -> Result<AgentReply> {
        self.invoked
            .lock()
            .push((session_id.to_string(), input.to_string(), attributes.clone()));
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            sleep(latency).await;
        }
        if input.contains("crash") {
            return Err(Error::Dialogue("agent throttled".to_string()));
        }
        Ok(self
            .replies
            .lock()
            .get(input)
            .cloned()
            .unwrap_or_else(|| AgentReply::text("Okay.")))
    }

    async fn end_session(&self, session_id: &str) -> Result<()> {
        self.ended.lock().push(session_id.to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[derive(Default)]
struct RecordingSwitch {
    breaks: Mutex<Vec<String>>,
    hangups: Mutex<Vec<String>>,
}

#[async_trait]
impl TelephonyControl for RecordingSwitch {
    async fn interrupt_playback(&self, call_id: &str) -> Result<()> {
        self.breaks.lock().push(call_id.to_string());
        Ok(())
    }

    async fn channel_info(&self, call_id: &str) -> Result<BTreeMap<String, String>> {
        let mut info = BTreeMap::new();
        info.insert("Unique-ID".to_string(), call_id.to_string());
        Ok(info)
    }

    async fn hangup(&self, call_id: &str) -> Result<()> {
        self.hangups.lock().push(call_id.to_string());
        Ok(())
    }
}

struct Harness {
    manager: CallSessionManager,
    recognizer: Arc<SimulatedRecognizer>,
    synthesizer: Arc<PcmSynthesizer>,
    dialogue: Arc<MockDialogue>,
    switch: Arc<RecordingSwitch>,
}

impl Harness {
    fn new(pcm_bytes: usize, pacing_ms: u64) -> Self {
        let recognizer = Arc::new(SimulatedRecognizer::new());
        let synthesizer = Arc::new(PcmSynthesizer {
            bytes: pcm_bytes,
            requests: Mutex::new(Vec::new()),
        });
        let dialogue = Arc::new(MockDialogue::default());
        let switch = Arc::new(RecordingSwitch::default());
        let tenants = TenantDirectory::new(
            vec![Arc::new(StaticTenantDirectory::builtin()) as Arc<dyn TenantResolver>],
            TenantProfile::fallback(),
            Duration::from_millis(500),
        );

        let services = SessionServices::new(
            recognizer.clone(),
            synthesizer.clone(),
            dialogue.clone(),
            Arc::new(tenants),
        )
        .with_telephony(switch.clone());

        let session = SessionConfig {
            greeting_delay_ms: 0,
            read_timeout_secs: 60,
            injected_read_timeout_secs: 60,
            handoff_grace_ms: 50,
            end_of_call_grace_ms: 100,
            ..Default::default()
        };
        let playback = PlaybackConfig {
            pacing_ms,
            ..Default::default()
        };

        Self {
            manager: CallSessionManager::new(services, session, &playback),
            recognizer,
            synthesizer,
            dialogue,
            switch,
        }
    }

    async fn open(&self, call_id: &str, did: &str) -> (Arc<CallSession>, LoopbackPeer, SimulatedStream) {
        let (sink, source, peer) = loopback();
        let session = self
            .manager
            .open(call_id, did, Box::new(sink), Box::new(source))
            .await
            .unwrap();
        let stream = timeout(Duration::from_secs(2), self.recognizer.wait_for_stream(call_id))
            .await
            .expect("recognition stream opened");
        (session, peer, stream)
    }
}

async fn next_frame(peer: &mut LoopbackPeer) -> OutboundFrame {
    timeout(Duration::from_secs(2), peer.recv())
        .await
        .expect("frame within deadline")
        .expect("connection open")
}

async fn expect_greeting(peer: &mut LoopbackPeer) -> serde_json::Value {
    match next_frame(peer).await {
        OutboundFrame::Text(json) => {
            let value: serde_json::Value = serde_json::from_str(&json).unwrap();
            assert_eq!(value["type"], "greeting");
            value
        }
        other => panic!("expected greeting, got {:?}", other),
    }
}

async fn collect_audio(peer: &mut LoopbackPeer, chunks: usize) -> Vec<bytes::Bytes> {
    let mut audio = Vec::new();
    while audio.len() < chunks {
        match next_frame(peer).await {
            OutboundFrame::Binary(chunk) => audio.push(chunk),
            OutboundFrame::Text(text) => panic!("unexpected text frame {}", text),
        }
    }
    audio
}

async fn eventually(what: &str, check: impl Fn() -> bool) {
    let waited = timeout(Duration::from_secs(3), async {
        while !check() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {}", what);
}

async fn ended(session: &CallSession) {
    timeout(Duration::from_secs(3), session.wait())
        .await
        .expect("session tasks finished");
}

#[tokio::test]
async fn test_uninterrupted_reply_end_to_end() {
    let harness = Harness::new(CHUNK * 3 + 100, 2);
    harness
        .dialogue
        .reply("I need an appointment", AgentReply::text("Sure, **what time** works for you?"));
    let (session, mut peer, stream) = harness.open("call-e2e", "1001").await;

    let greeting = expect_greeting(&mut peer).await;
    assert_eq!(greeting["voice"], "Joanna");
    assert!(greeting["text"].as_str().unwrap().contains("Downtown Medical Center"));

    stream.push(RecognitionResult::partial("I need"));
    stream.push(RecognitionResult::final_result("I need an appointment"));

    let audio = collect_audio(&mut peer, 4).await;
    assert_eq!(audio.iter().map(|c| c.len()).sum::<usize>(), CHUNK * 3 + 100);
    assert_eq!(audio[0].len(), CHUNK);
    assert_eq!(audio[3].len(), 100);

    eventually("playback to finish", || !session.is_speaking()).await;
    assert!(!session.is_cancelled());
    assert!(harness.switch.breaks.lock().is_empty());

    let requests = harness.synthesizer.requests.lock().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].text, "Sure, what time works for you?");
    assert_eq!(requests[0].voice_id, "Joanna");

    let invoked = harness.dialogue.invoked.lock().clone();
    assert_eq!(invoked.len(), 1);
    assert_eq!(invoked[0].0, "call-e2e");
    assert_eq!(invoked[0].2.get("tenant_name").map(String::as_str), Some("Downtown Medical Center"));

    harness.manager.shutdown().await;
}

#[tokio::test]
async fn test_barge_in_halts_playback() {
    let harness = Harness::new(CHUNK * 100, 10);
    let (session, mut peer, stream) = harness.open("call-barge", "1002").await;
    expect_greeting(&mut peer).await;

    stream.push(RecognitionResult::final_result("What are your hours?"));
    collect_audio(&mut peer, 1).await;
    assert!(session.is_speaking());

    stream.push(RecognitionResult::partial("wait"));

    eventually("switch interrupt", || !harness.switch.breaks.lock().is_empty()).await;
    assert_eq!(harness.switch.breaks.lock().as_slice(), ["call-barge".to_string()]);
    assert!(!session.is_speaking());

    sleep(Duration::from_millis(50)).await;
    let mut received = 1;
    while let Ok(frame) = peer.try_recv() {
        assert!(matches!(frame, OutboundFrame::Binary(_)));
        received += 1;
    }
    assert!(received < 100, "playback continued after barge-in: {} chunks", received);

    sleep(Duration::from_millis(100)).await;
    assert!(peer.try_recv().is_err(), "chunk written after interruption settled");
    assert!(!session.is_cancelled());

    harness.manager.shutdown().await;
}

#[tokio::test]
async fn test_end_of_call_phrase_closes_after_grace() {
    let harness = Harness::new(CHUNK, 2);
    harness.dialogue.reply(
        "no, that's all",
        AgentReply::text("Thank you for calling, have a great day!"),
    );
    let (session, mut peer, stream) = harness.open("call-bye", "1003").await;
    expect_greeting(&mut peer).await;

    stream.push(RecognitionResult::final_result("no, that's all"));
    collect_audio(&mut peer, 1).await;
    assert!(!session.is_cancelled());

    ended(&session).await;
    assert_eq!(session.end_reason(), Some(EndReason::EndOfCall));
    assert_eq!(peer.close_count(), 1);
    assert!(harness.manager.get("call-bye").is_none());
    assert_eq!(harness.recognizer.ended_sessions(), vec!["call-bye".to_string()]);
    assert_eq!(harness.dialogue.ended.lock().as_slice(), ["call-bye".to_string()]);
    assert!(stream.is_finished());
}

#[tokio::test]
async fn test_handoff_closes_call() {
    let harness = Harness::new(CHUNK, 2);
    harness.dialogue.reply(
        "operator please",
        AgentReply {
            completion: "One moment.".to_string(),
            requires_handoff: true,
            handoff_reason: Some("caller request".to_string()),
        },
    );
    let (session, mut peer, stream) = harness.open("call-handoff", "1001").await;
    expect_greeting(&mut peer).await;

    stream.push(RecognitionResult::final_result("operator please"));
    ended(&session).await;
    assert_eq!(session.end_reason(), Some(EndReason::Handoff));
}

#[tokio::test]
async fn test_agent_failure_speaks_apology() {
    let harness = Harness::new(CHUNK, 2);
    let (session, mut peer, stream) = harness.open("call-apology", "1001").await;
    expect_greeting(&mut peer).await;

    stream.push(RecognitionResult::final_result("please crash"));
    collect_audio(&mut peer, 1).await;

    let requests = harness.synthesizer.requests.lock().clone();
    assert_eq!(requests.last().map(|r| r.text.as_str()), Some(APOLOGY_TEXT));
    assert!(!session.is_cancelled());

    harness.manager.shutdown().await;
}

#[tokio::test]
async fn test_slow_agent_still_takes_every_final() {
    let harness = Harness::new(CHUNK, 1);
    *harness.dialogue.latency.lock() = Duration::from_millis(20);
    let (session, mut peer, stream) = harness.open("call-backlog", "1001").await;
    expect_greeting(&mut peer).await;

    let utterances: Vec<String> = (0..12).map(|i| format!("request number {}", i)).collect();
    for utterance in &utterances {
        stream.push(RecognitionResult::final_result(utterance));
    }

    let dialogue = harness.dialogue.clone();
    eventually("every final to reach the agent", move || dialogue.invoked.lock().len() == 12).await;
    let inputs: Vec<String> = harness
        .dialogue
        .invoked
        .lock()
        .iter()
        .map(|(_, input, _)| input.clone())
        .collect();
    assert_eq!(inputs, utterances);
    assert!(!session.is_cancelled());

    harness.manager.shutdown().await;
}

#[tokio::test]
async fn test_recognition_failure_degrades_but_keeps_call() {
    let harness = Harness::new(CHUNK, 1);
    let (session, mut peer, stream) = harness.open("call-degraded", "1001").await;
    expect_greeting(&mut peer).await;
    assert!(!session.info().recognition_degraded);

    stream.fail("upstream reset");
    eventually("recognition marked degraded", || session.is_recognition_degraded()).await;
    assert!(session.info().recognition_degraded);
    assert!(!session.is_cancelled());

    peer.send_text(r#"{"type":"transcript","text":"still there?"}"#);
    collect_audio(&mut peer, 1).await;
    let invoked = harness.dialogue.invoked.lock().clone();
    assert_eq!(invoked.last().map(|i| i.1.as_str()), Some("still there?"));

    harness.manager.shutdown().await;
}

#[tokio::test]
async fn test_recognition_open_failure_degrades() {
    let harness = Harness::new(CHUNK, 1);
    harness.recognizer.fail_next_open();
    let (sink, source, mut peer) = loopback();
    let session = harness
        .manager
        .open("call-no-stt", "1002", Box::new(sink), Box::new(source))
        .await
        .unwrap();
    expect_greeting(&mut peer).await;

    eventually("recognition marked degraded", || session.is_recognition_degraded()).await;
    assert!(!session.is_cancelled());

    harness.manager.shutdown().await;
}

#[tokio::test]
async fn test_injected_transcript_takes_turn() {
    let harness = Harness::new(CHUNK, 2);
    harness
        .dialogue
        .reply("book a cleaning", AgentReply::text("I have a slot at 9:30 AM."));
    let (session, mut peer, _stream) = harness.open("call-injected", "1002").await;
    expect_greeting(&mut peer).await;

    peer.send_text(r#"{"type":"heartbeat"}"#);
    peer.send_text(r#"{"type":"transcript","text":"book a cleaning"}"#);
    collect_audio(&mut peer, 1).await;

    let invoked = harness.dialogue.invoked.lock().clone();
    assert_eq!(invoked.len(), 1);
    assert_eq!(invoked[0].1, "book a cleaning");
    assert!(!session.is_cancelled());

    harness.manager.shutdown().await;
}

#[tokio::test]
async fn test_unknown_number_uses_default_tenant() {
    let harness = Harness::new(CHUNK, 2);
    let (session, mut peer, _stream) = harness.open("call-unknown", "5550000").await;

    let greeting = expect_greeting(&mut peer).await;
    assert_eq!(greeting["text"], "Hello! How can I help you today?");
    assert!(session.tenant().is_fallback());

    harness.manager.shutdown().await;
}

#[tokio::test]
async fn test_teardown_is_idempotent() {
    let harness = Harness::new(CHUNK, 2);
    let (session, mut peer, _stream) = harness.open("call-idem", "1001").await;
    expect_greeting(&mut peer).await;

    peer.hang_up();
    ended(&session).await;
    session.teardown().await;
    session.cancel(EndReason::AdminHangup);
    session.teardown().await;

    assert_eq!(session.end_reason(), Some(EndReason::CallerHangup));
    assert_eq!(peer.close_count(), 1);
    assert_eq!(harness.recognizer.ended_sessions().len(), 1);
    assert_eq!(harness.dialogue.ended.lock().len(), 1);
    assert_eq!(harness.manager.active_count(), 0);
}

#[tokio::test]
async fn test_audio_reaches_recognition_in_order() {
    let harness = Harness::new(CHUNK, 2);
    let (session, mut peer, stream) = harness.open("call-audio", "1001").await;
    expect_greeting(&mut peer).await;

    let loud = |tag: u8| {
        let mut pcm: Vec<u8> = std::iter::repeat(1200i16.to_le_bytes()).take(160).flatten().collect();
        pcm[0] = tag;
        pcm
    };
    peer.send_audio(loud(1));
    peer.send_audio(vec![0u8; 320]);
    peer.send_audio(loud(2));
    peer.send_audio(loud(3));

    eventually("audio forwarded", || stream.received_audio().len() == 3).await;
    let tags: Vec<u8> = stream.received_audio().iter().map(|c| c[0]).collect();
    assert_eq!(tags, vec![1, 2, 3]);
    assert_eq!(session.info().dropped_audio_chunks, 0);

    harness.manager.shutdown().await;
    assert!(stream.is_finished());
}

#[tokio::test]
async fn test_admin_hangup_and_registry() {
    let harness = Harness::new(CHUNK, 2);
    let (first, mut first_peer, _s1) = harness.open("call-a", "1001").await;
    let (second, mut second_peer, _s2) = harness.open("call-b", "1002").await;
    expect_greeting(&mut first_peer).await;
    expect_greeting(&mut second_peer).await;

    let calls = harness.manager.list();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().any(|c| c.call_id == "call-b" && c.tenant_name == "Westside Family Practice"));

    harness.manager.hangup("call-a").await.unwrap();
    ended(&first).await;
    assert_eq!(first.end_reason(), Some(EndReason::AdminHangup));
    assert_eq!(harness.switch.hangups.lock().as_slice(), ["call-a".to_string()]);
    assert!(harness.manager.get("call-a").is_none());
    assert!(matches!(
        harness.manager.hangup("call-a").await,
        Err(AgentError::CallNotFound(_))
    ));

    harness.manager.shutdown().await;
    assert_eq!(second.end_reason(), Some(EndReason::Shutdown));
    assert_eq!(harness.manager.active_count(), 0);

    let (sink, source, _peer) = loopback();
    let reopened = harness
        .manager
        .open("call-c", "1001", Box::new(sink), Box::new(source))
        .await;
    assert!(matches!(reopened, Err(AgentError::ShuttingDown)));
}

#[tokio::test]
async fn test_reconnect_replaces_session() {
    let harness = Harness::new(CHUNK, 2);
    let (old, _old_peer, _s1) = harness.open("call-dup", "1001").await;
    let (sink, source, _new_peer) = loopback();
    let new = harness
        .manager
        .open("call-dup", "1001", Box::new(sink), Box::new(source))
        .await
        .unwrap();

    ended(&old).await;
    assert_eq!(old.end_reason(), Some(EndReason::Replaced));
    let current = harness.manager.get("call-dup").expect("new session registered");
    assert!(Arc::ptr_eq(&current, &new));
    assert!(!new.is_cancelled());
    assert!(harness.dialogue.ended.lock().is_empty());

    harness.manager.shutdown().await;
}
