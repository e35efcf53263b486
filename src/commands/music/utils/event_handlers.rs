//! Songbird event handlers that forward voice driver and track events to the
//! owning session.

use poise::serenity_prelude as serenity;
use serenity::async_trait;
use songbird::tracks::PlayMode;
use songbird::{Event, EventContext, EventHandler};
use tracing::{debug, warn};

use super::transport::{EventSink, TransportEvent};

/// Reports the end (or failure) of one pushed stream.
pub struct TrackEndNotifier {
    pub events: EventSink,
    pub generation: u64,
}

#[async_trait]
impl EventHandler for TrackEndNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        if let EventContext::Track(tracks) = ctx {
            for (state, _) in tracks.iter() {
                if let PlayMode::Errored(err) = &state.playing {
                    warn!(
                        "Stream {} for guild {} failed: {}",
                        self.generation,
                        self.events.tenant(),
                        err
                    );
                }
            }
            debug!(
                "Stream {} ended for guild {}",
                self.generation,
                self.events.tenant()
            );
            self.events.report(TransportEvent::TrackFinished {
                generation: self.generation,
            });
        }
        None
    }
}

/// Reports voice driver connectivity changes.
pub struct DriverNotifier {
    pub events: EventSink,
}

#[async_trait]
impl EventHandler for DriverNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        match ctx {
            EventContext::DriverConnect(_) | EventContext::DriverReconnect(_) => {
                self.events.report(TransportEvent::Ready);
            }
            EventContext::DriverDisconnect(data) => match &data.reason {
                Some(reason) => self
                    .events
                    .report(TransportEvent::Error(format!("{:?}", reason))),
                None => self.events.report(TransportEvent::Disconnected),
            },
            _ => {}
        }
        None
    }
}
