//! The `Transport` capability: joins a voice channel and yields a `Connection`
//! that plays pushed streams and reports lifecycle events back to the session.

use serenity::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use super::music_manager::{ChannelRef, TenantId, Volume};
use super::session::{SessionEvent, SessionId};
use crate::commands::music::audio_sources::StreamHandle;

/// Errors reported by a transport or one of its connections.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Missing permission to join or speak: {0}")]
    Denied(String),

    #[error("Transport failure: {0}")]
    Failed(String),

    #[error("Connection is closed")]
    Closed,
}

/// Lifecycle events a connection reports.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The voice connection is established.
    Ready,
    /// The connection was dropped by the remote side.
    Disconnected,
    /// The connection failed irrecoverably.
    Error(String),
    /// The stream pushed with `generation` ended on its own.
    TrackFinished { generation: u64 },
}

impl From<TransportEvent> for SessionEvent {
    fn from(event: TransportEvent) -> Self {
        match event {
            TransportEvent::Ready => SessionEvent::TransportReady,
            TransportEvent::Disconnected => SessionEvent::TransportLost("disconnected".to_string()),
            TransportEvent::Error(reason) => SessionEvent::TransportLost(reason),
            TransportEvent::TrackFinished { generation } => SessionEvent::TrackFinished { generation },
        }
    }
}

/// An event addressed to one session instance.
#[derive(Debug)]
pub(crate) struct SessionEnvelope {
    pub tenant: TenantId,
    pub session: SessionId,
    pub event: SessionEvent,
}

/// Where a session's collaborators and timers deliver events.
///
/// Events are tagged with the session instance they belong to; once that
/// session is gone they are dropped by the manager.
#[derive(Debug, Clone)]
pub struct EventSink {
    tenant: TenantId,
    session: SessionId,
    tx: mpsc::UnboundedSender<SessionEnvelope>,
}

impl EventSink {
    pub(crate) fn new(
        tenant: TenantId,
        session: SessionId,
        tx: mpsc::UnboundedSender<SessionEnvelope>,
    ) -> Self {
        Self {
            tenant,
            session,
            tx,
        }
    }

    pub fn tenant(&self) -> TenantId {
        self.tenant
    }

    /// Report a transport lifecycle event.
    pub fn report(&self, event: TransportEvent) {
        self.emit(event.into());
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        let envelope = SessionEnvelope {
            tenant: self.tenant,
            session: self.session,
            event,
        };
        if self.tx.send(envelope).is_err() {
            debug!("Session manager is gone, dropping event for guild {}", self.tenant);
        }
    }
}

/// Opens connections to voice channels.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(
        &self,
        tenant: TenantId,
        channel: ChannelRef,
        events: EventSink,
    ) -> Result<Box<dyn Connection>, TransportError>;
}

/// A live voice connection owned by one session.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Start playing `stream`, replacing whatever was playing. Returns once the
    /// transport accepted the stream. End of this stream is reported as
    /// `TrackFinished { generation }`.
    async fn push(&mut self, stream: StreamHandle, generation: u64) -> Result<(), TransportError>;

    /// Suspend the stream without closing the connection.
    async fn pause(&mut self) -> Result<(), TransportError>;

    async fn resume(&mut self) -> Result<(), TransportError>;

    async fn set_volume(&mut self, volume: Volume) -> Result<(), TransportError>;

    /// Leave the channel. Idempotent.
    async fn close(&mut self) -> Result<(), TransportError>;
}
