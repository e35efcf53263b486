//! Auto-leave timers. Expiry is delivered to the owning session as a
//! `SessionEvent::IdleExpired`, so teardown goes through the normal
//! transition path.

use std::fmt;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use super::session::SessionEvent;
use super::transport::EventSink;

/// The two independent auto-leave timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdleTimer {
    /// Nobody but the bot is left in the voice channel.
    EmptyChannel,
    /// The queue ran out on natural completion.
    QueueEnd,
}

impl fmt::Display for IdleTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdleTimer::EmptyChannel => f.write_str("empty-channel"),
            IdleTimer::QueueEnd => f.write_str("queue-end"),
        }
    }
}

struct ArmedTimer {
    epoch: u64,
    handle: JoinHandle<()>,
}

impl Drop for ArmedTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Armed timers of one session. Dropping this cancels everything.
#[derive(Default)]
pub struct IdleTimers {
    empty_channel: Option<ArmedTimer>,
    queue_end: Option<ArmedTimer>,
    next_epoch: u64,
}

impl fmt::Debug for IdleTimers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdleTimers")
            .field("empty_channel", &self.empty_channel.is_some())
            .field("queue_end", &self.queue_end.is_some())
            .finish()
    }
}

impl IdleTimers {
    fn slot(&mut self, timer: IdleTimer) -> &mut Option<ArmedTimer> {
        match timer {
            IdleTimer::EmptyChannel => &mut self.empty_channel,
            IdleTimer::QueueEnd => &mut self.queue_end,
        }
    }

    /// (Re)arm `timer`. A previously armed instance is cancelled.
    pub fn arm(&mut self, timer: IdleTimer, cooldown: Duration, sink: &EventSink) {
        self.next_epoch += 1;
        let epoch = self.next_epoch;
        let sink = sink.clone();

        debug!(
            "Arming {} timer for guild {} ({:?})",
            timer,
            sink.tenant(),
            cooldown
        );

        let handle = tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;
            sink.emit(SessionEvent::IdleExpired { timer, epoch });
        });

        *self.slot(timer) = Some(ArmedTimer { epoch, handle });
    }

    pub fn is_armed(&self, timer: IdleTimer) -> bool {
        match timer {
            IdleTimer::EmptyChannel => self.empty_channel.is_some(),
            IdleTimer::QueueEnd => self.queue_end.is_some(),
        }
    }

    /// Cancel `timer`. Returns whether it was armed.
    pub fn cancel(&mut self, timer: IdleTimer) -> bool {
        self.slot(timer).take().is_some()
    }

    pub fn cancel_all(&mut self) {
        self.empty_channel = None;
        self.queue_end = None;
    }

    /// Consume an expiry. Only the currently armed instance of `timer` counts;
    /// expiries of cancelled or replaced instances return `false`.
    pub fn expire(&mut self, timer: IdleTimer, epoch: u64) -> bool {
        let slot = self.slot(timer);
        match slot {
            Some(armed) if armed.epoch == epoch => {
                *slot = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::music::utils::music_manager::TenantId;
    use crate::commands::music::utils::session::SessionId;
    use crate::commands::music::utils::transport::SessionEnvelope;
    use assert_matches::assert_matches;
    use tokio::sync::mpsc;

    fn sink() -> (EventSink, mpsc::UnboundedReceiver<SessionEnvelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventSink::new(TenantId(1), SessionId::next(), tx), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_is_delivered_after_cooldown() {
        let (sink, mut rx) = sink();
        let mut timers = IdleTimers::default();

        timers.arm(IdleTimer::QueueEnd, Duration::from_secs(300), &sink);

        tokio::time::sleep(Duration::from_secs(299)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(2)).await;
        let envelope = rx.recv().await.unwrap();
        assert_matches!(envelope.event, SessionEvent::IdleExpired { timer: IdleTimer::QueueEnd, .. });

        let SessionEvent::IdleExpired { timer, epoch } = envelope.event else {
            unreachable!()
        };
        assert!(timers.expire(timer, epoch));
        assert!(!timers.is_armed(IdleTimer::QueueEnd));
        assert!(!timers.expire(timer, epoch));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let (sink, mut rx) = sink();
        let mut timers = IdleTimers::default();

        timers.arm(IdleTimer::EmptyChannel, Duration::from_secs(60), &sink);
        assert!(timers.cancel(IdleTimer::EmptyChannel));

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_invalidates_the_old_epoch() {
        let (sink, _rx) = sink();
        let mut timers = IdleTimers::default();

        timers.arm(IdleTimer::EmptyChannel, Duration::from_secs(60), &sink);
        let stale_epoch = timers.next_epoch;
        timers.arm(IdleTimer::EmptyChannel, Duration::from_secs(60), &sink);

        assert!(!timers.expire(IdleTimer::EmptyChannel, stale_epoch));
        assert!(timers.is_armed(IdleTimer::EmptyChannel));
    }

    #[tokio::test(start_paused = true)]
    async fn timers_are_independent() {
        let (sink, _rx) = sink();
        let mut timers = IdleTimers::default();

        timers.arm(IdleTimer::EmptyChannel, Duration::from_secs(60), &sink);
        timers.arm(IdleTimer::QueueEnd, Duration::from_secs(60), &sink);
        timers.cancel(IdleTimer::QueueEnd);

        assert!(timers.is_armed(IdleTimer::EmptyChannel));
        assert!(!timers.is_armed(IdleTimer::QueueEnd));
    }
}
