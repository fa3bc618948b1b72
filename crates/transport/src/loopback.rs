//! In-memory caller connection
//!
//! Used to drive sessions without a network socket. The peer handle plays the
//! part of the caller: it injects inbound frames and observes outbound ones.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::frame::InboundFrame;
use crate::traits::{FrameSink, FrameSource};
use crate::TransportError;

/// Frame written by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    Binary(Bytes),
}

/// Write accounting shared between a sink and its observers
#[derive(Debug, Default)]
pub struct WriteMonitor {
    active: AtomicUsize,
    max_active: AtomicUsize,
    closes: AtomicUsize,
}

impl WriteMonitor {
    pub fn max_concurrent_writes(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Create a connected sink/source pair and the caller-side peer
pub fn loopback() -> (LoopbackSink, LoopbackSource, LoopbackPeer) {
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let monitor = Arc::new(WriteMonitor::default());

    let sink = LoopbackSink {
        outbound: outbound_tx,
        monitor: monitor.clone(),
        write_delay: None,
        closed: false,
    };
    let source = LoopbackSource { inbound: inbound_rx };
    let peer = LoopbackPeer {
        inbound: Some(inbound_tx),
        outbound: outbound_rx,
        monitor,
    };
    (sink, source, peer)
}

pub struct LoopbackSink {
    outbound: mpsc::UnboundedSender<OutboundFrame>,
    monitor: Arc<WriteMonitor>,
    write_delay: Option<Duration>,
    closed: bool,
}

impl LoopbackSink {
    /// Hold each write for `delay`, widening any overlap window
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    pub fn monitor(&self) -> Arc<WriteMonitor> {
        self.monitor.clone()
    }

    async fn write(&mut self, frame: OutboundFrame) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.monitor.enter();
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        let result = self
            .outbound
            .send(frame)
            .map_err(|_| TransportError::Send("peer dropped".to_string()));
        self.monitor.exit();
        result
    }
}

#[async_trait]
impl FrameSink for LoopbackSink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.write(OutboundFrame::Text(text)).await
    }

    async fn send_binary(&mut self, data: Bytes) -> Result<(), TransportError> {
        self.write(OutboundFrame::Binary(data)).await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed = true;
        self.monitor.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct LoopbackSource {
    inbound: mpsc::UnboundedReceiver<Result<InboundFrame, TransportError>>,
}

#[async_trait]
impl FrameSource for LoopbackSource {
    async fn next_frame(&mut self) -> Option<Result<InboundFrame, TransportError>> {
        self.inbound.recv().await
    }
}

/// Caller side of a loopback connection
pub struct LoopbackPeer {
    inbound: Option<mpsc::UnboundedSender<Result<InboundFrame, TransportError>>>,
    outbound: mpsc::UnboundedReceiver<OutboundFrame>,
    monitor: Arc<WriteMonitor>,
}

impl LoopbackPeer {
    /// Inject a frame; false once the source is gone or the peer hung up
    pub fn send(&self, frame: InboundFrame) -> bool {
        match &self.inbound {
            Some(tx) => tx.send(Ok(frame)).is_ok(),
            None => false,
        }
    }

    pub fn send_audio(&self, pcm: impl Into<Bytes>) -> bool {
        self.send(InboundFrame::Audio(pcm.into()))
    }

    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.send(InboundFrame::Text(text.into()))
    }

    /// Inject a read error
    pub fn fail(&self, message: &str) -> bool {
        match &self.inbound {
            Some(tx) => tx.send(Err(TransportError::Receive(message.to_string()))).is_ok(),
            None => false,
        }
    }

    /// Drop the inbound side, as if the caller disconnected
    pub fn hang_up(&mut self) {
        self.inbound = None;
    }

    pub async fn recv(&mut self) -> Option<OutboundFrame> {
        self.outbound.recv().await
    }

    pub fn try_recv(&mut self) -> Result<OutboundFrame, mpsc::error::TryRecvError> {
        self.outbound.try_recv()
    }

    pub fn close_count(&self) -> usize {
        self.monitor.close_count()
    }

    pub fn monitor(&self) -> Arc<WriteMonitor> {
        self.monitor.clone()
    }
}
