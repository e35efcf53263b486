//! Per-guild playback state machine.
//!
//! A `Session` is only ever touched while its tenant lock is held by the
//! `SessionManager`. Every event-driven change (track end, skip, stop, lost
//! transport, idle expiry, channel occupancy) goes through
//! [`Session::transition`]; a session that ends up `Disconnected` has already
//! released its connection and is evicted by the manager.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::filters::{FilterChain, FilterName};
use super::guild_settings::TenantSettings;
use super::idle_timers::{IdleTimer, IdleTimers};
use super::music_manager::{ChannelRef, Collaborators, MusicError, MusicResult, TenantId, Volume};
use super::queue_manager::{FinishReason, LoopMode, QueuePage, TrackQueue};
use super::transport::{Connection, EventSink, TransportError};
use crate::commands::music::audio_sources::{SourceError, Track};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Furthest seek target for tracks without a known duration.
pub const MAX_SEEK_WITHOUT_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Identifies one session instance. A new session for the same guild gets a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaybackState {
    /// Connected, nothing current; waiting out the queue-end cooldown.
    Idle,
    Connecting,
    Playing,
    Paused,
    Disconnected,
}

/// Inputs of the transition function.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    TrackFinished { generation: u64 },
    Skipped,
    StopRequested,
    TransportReady,
    TransportLost(String),
    ChannelEmptied,
    ChannelOccupied,
    IdleExpired { timer: IdleTimer, epoch: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekDirection {
    Forward,
    Backward,
}

/// Best-effort media-time cursor.
#[derive(Debug, Clone, Copy)]
struct PlaybackClock {
    base: Duration,
    resumed_at: Option<Instant>,
    speed: f64,
}

impl PlaybackClock {
    fn stopped() -> Self {
        Self {
            base: Duration::ZERO,
            resumed_at: None,
            speed: 1.0,
        }
    }

    fn start(offset: Duration, speed: f64) -> Self {
        Self {
            base: offset,
            resumed_at: Some(Instant::now()),
            speed,
        }
    }

    fn position(&self) -> Duration {
        match self.resumed_at {
            Some(at) => self.base.saturating_add(at.elapsed().mul_f64(self.speed)),
            None => self.base,
        }
    }

    fn pause(&mut self) {
        self.base = self.position();
        self.resumed_at = None;
    }

    fn resume(&mut self) {
        if self.resumed_at.is_none() {
            self.resumed_at = Some(Instant::now());
        }
    }
}

/// Result of a successful `now_playing`.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub track: Track,
    pub position: Duration,
    pub state: PlaybackState,
    pub loop_mode: LoopMode,
    pub volume: Volume,
    pub filters: FilterChain,
    pub upcoming: usize,
}

/// Read-only view of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub tenant: TenantId,
    pub channel: ChannelRef,
    pub state: PlaybackState,
    pub current: Option<Track>,
    pub queue: Vec<Track>,
    pub loop_mode: LoopMode,
    pub volume: Volume,
    pub filters: FilterChain,
    pub position: Duration,
    pub idle_since: Option<DateTime<Utc>>,
    pub empty_channel_timer: bool,
    pub queue_end_timer: bool,
    pub connected: bool,
}

/// Failure while starting a stream.
enum StepError {
    /// The source could not open the track. Nothing was changed.
    Open(MusicError),
    /// The transport rejected the stream. The old stream may be gone.
    Push(MusicError),
}

fn source_error(err: SourceError) -> MusicError {
    MusicError::SearchFailed(err.to_string())
}

fn transport_error(err: TransportError) -> MusicError {
    MusicError::TransportDenied(err.to_string())
}

pub struct Session {
    id: SessionId,
    tenant: TenantId,
    channel: ChannelRef,
    state: PlaybackState,
    queue: TrackQueue,
    current: Option<Track>,
    loop_mode: LoopMode,
    volume: Volume,
    filters: FilterChain,
    connection: Option<Box<dyn Connection>>,
    timers: IdleTimers,
    idle_since: Option<DateTime<Utc>>,
    clock: PlaybackClock,
    generation: u64,
    events: EventSink,
}

impl Session {
    /// A freshly connected session with nothing current yet.
    pub(crate) fn new(
        id: SessionId,
        tenant: TenantId,
        channel: ChannelRef,
        settings: TenantSettings,
        connection: Box<dyn Connection>,
        events: EventSink,
    ) -> Self {
        Self {
            id,
            tenant,
            channel,
            state: PlaybackState::Idle,
            queue: TrackQueue::new(),
            current: None,
            loop_mode: settings.loop_mode,
            volume: settings.volume,
            filters: FilterChain::default(),
            connection: Some(connection),
            timers: IdleTimers::default(),
            idle_since: None,
            clock: PlaybackClock::stopped(),
            generation: 0,
            events,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn channel(&self) -> ChannelRef {
        self.channel
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_disconnected(&self) -> bool {
        self.state == PlaybackState::Disconnected
    }

    pub fn current(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    /// Media-time position of the current track.
    pub fn position(&self) -> Duration {
        let Some(track) = &self.current else {
            return Duration::ZERO;
        };
        let position = self.clock.position();
        match track.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    /// The single entry point for event-driven transitions.
    pub(crate) async fn transition(
        &mut self,
        event: SessionEvent,
        collab: &Collaborators,
    ) -> MusicResult<()> {
        match event {
            SessionEvent::TrackFinished { generation } => {
                let live = matches!(self.state, PlaybackState::Playing | PlaybackState::Connecting);
                if generation != self.generation || !live {
                    debug!(
                        "Ignoring stale track end (generation {}) for guild {}",
                        generation, self.tenant
                    );
                    return Ok(());
                }
                self.advance(FinishReason::Natural, collab).await
            }
            SessionEvent::Skipped => self.advance(FinishReason::Skipped, collab).await,
            SessionEvent::StopRequested => {
                self.disconnect("stopped on request", collab).await;
                Ok(())
            }
            SessionEvent::TransportReady => {
                debug!("Voice connection ready for guild {}", self.tenant);
                Ok(())
            }
            SessionEvent::TransportLost(reason) => {
                warn!("Voice connection lost for guild {}: {}", self.tenant, reason);
                self.disconnect("transport lost", collab).await;
                Ok(())
            }
            SessionEvent::ChannelEmptied => {
                if self.idle_since.is_none() {
                    self.idle_since = Some(Utc::now());
                }
                if !self.timers.is_armed(IdleTimer::EmptyChannel) {
                    info!("Voice channel empty for guild {}", self.tenant);
                    self.timers.arm(
                        IdleTimer::EmptyChannel,
                        collab.config.leave_on_empty_cooldown,
                        &self.events,
                    );
                }
                Ok(())
            }
            SessionEvent::ChannelOccupied => {
                if self.timers.cancel(IdleTimer::EmptyChannel) {
                    info!("Listeners are back for guild {}", self.tenant);
                }
                if !self.timers.is_armed(IdleTimer::QueueEnd) {
                    self.idle_since = None;
                }
                Ok(())
            }
            SessionEvent::IdleExpired { timer, epoch } => {
                if self.timers.expire(timer, epoch) {
                    info!("{} timer expired for guild {}", timer, self.tenant);
                    self.disconnect("idle timeout", collab).await;
                } else {
                    debug!("Ignoring cancelled {} timer for guild {}", timer, self.tenant);
                }
                Ok(())
            }
        }
    }

    /// Open `track` at `offset` and push it to the connection.
    ///
    /// Nothing is changed if the source fails. After a push failure the
    /// caller must disconnect.
    async fn begin(
        &mut self,
        track: Track,
        offset: Duration,
        collab: &Collaborators,
    ) -> Result<(), StepError> {
        let stream = match collab
            .bounded("track source", collab.source.open_stream(&track, offset, &self.filters))
            .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(err)) => return Err(StepError::Open(source_error(err))),
            Err(err) => return Err(StepError::Open(err)),
        };
        let stream = stream.with_volume(self.volume);

        let Some(connection) = self.connection.as_mut() else {
            return Err(StepError::Push(transport_error(TransportError::Closed)));
        };

        let generation = self.generation + 1;
        self.state = PlaybackState::Connecting;
        self.current = Some(track);

        match collab
            .bounded("transport", connection.push(stream, generation))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(StepError::Push(transport_error(err))),
            Err(err) => return Err(StepError::Push(err)),
        }

        self.generation = generation;
        self.state = PlaybackState::Playing;
        self.clock = PlaybackClock::start(offset, self.filters.speed_factor());
        self.idle_since = None;
        self.timers.cancel(IdleTimer::QueueEnd);

        if let Some(track) = &self.current {
            info!(
                "Now playing '{}' for guild {} at {:?}",
                track.title, self.tenant, offset
            );
        }
        Ok(())
    }

    /// Start `track` on a connected session with nothing current.
    pub(crate) async fn start(&mut self, track: Track, collab: &Collaborators) -> MusicResult<()> {
        self.timers.cancel_all();
        match self.begin(track, Duration::ZERO, collab).await {
            Ok(()) => Ok(()),
            Err(StepError::Open(err)) => {
                self.linger(collab).await;
                Err(err)
            }
            Err(StepError::Push(err)) => {
                self.disconnect("transport rejected the stream", collab).await;
                Err(err)
            }
        }
    }

    /// Finish the current track and move on according to the loop mode.
    async fn advance(&mut self, reason: FinishReason, collab: &Collaborators) -> MusicResult<()> {
        let finished = self.current.clone().ok_or(MusicError::EmptyQueue)?;
        let saved_queue = self.queue.clone();
        let mut next = self.queue.advance(finished, self.loop_mode, reason);

        while let Some(track) = next.take() {
            let title = track.title.clone();
            match self.begin(track, Duration::ZERO, collab).await {
                Ok(()) => return Ok(()),
                Err(StepError::Push(err)) => {
                    self.disconnect("transport rejected the stream", collab).await;
                    return Err(err);
                }
                Err(StepError::Open(err)) if reason == FinishReason::Skipped => {
                    self.queue = saved_queue;
                    return Err(err);
                }
                Err(StepError::Open(err)) => {
                    warn!(
                        "Dropping unplayable track '{}' for guild {}: {}",
                        title, self.tenant, err
                    );
                    next = self.queue.next();
                }
            }
        }

        match reason {
            FinishReason::Skipped => self.disconnect("skipped past the end of the queue", collab).await,
            FinishReason::Natural => self.linger(collab).await,
        }
        Ok(())
    }

    /// Queue ran out: stay connected until the queue-end cooldown expires.
    async fn linger(&mut self, collab: &Collaborators) {
        self.current = None;
        self.state = PlaybackState::Idle;
        self.clock = PlaybackClock::stopped();
        self.idle_since = Some(Utc::now());

        let cooldown = collab.config.leave_on_end_cooldown;
        if cooldown.is_zero() {
            self.disconnect("queue finished", collab).await;
        } else {
            info!("Queue finished for guild {}, leaving in {:?}", self.tenant, cooldown);
            self.timers.arm(IdleTimer::QueueEnd, cooldown, &self.events);
        }
    }

    /// Release everything. Idempotent.
    pub(crate) async fn disconnect(&mut self, reason: &str, collab: &Collaborators) {
        self.timers.cancel_all();
        self.queue.clear();
        self.current = None;
        self.clock = PlaybackClock::stopped();

        if let Some(mut connection) = self.connection.take() {
            match collab.bounded("transport", connection.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!("Failed to leave voice channel for guild {}: {}", self.tenant, err),
                Err(err) => warn!("Leaving voice channel for guild {}: {}", self.tenant, err),
            }
        }

        if self.state != PlaybackState::Disconnected {
            info!("Session for guild {} disconnected: {}", self.tenant, reason);
        }
        self.state = PlaybackState::Disconnected;
    }

    /// Append to the queue. Returns the 1-based queue position.
    pub(crate) fn enqueue(&mut self, track: Track) -> usize {
        self.queue.add(track)
    }

    pub(crate) fn cancel_idle_timers(&mut self) {
        self.timers.cancel_all();
        self.idle_since = None;
    }

    pub(crate) async fn pause(&mut self, collab: &Collaborators) -> MusicResult<Track> {
        if self.state != PlaybackState::Playing {
            return Err(MusicError::NotPlaying);
        }
        let connection = self.connection.as_mut().ok_or(MusicError::NotPlaying)?;
        collab
            .bounded("transport", connection.pause())
            .await?
            .map_err(transport_error)?;

        self.clock.pause();
        self.state = PlaybackState::Paused;
        self.current.clone().ok_or(MusicError::NotPlaying)
    }

    pub(crate) async fn resume(&mut self, collab: &Collaborators) -> MusicResult<Track> {
        if self.state != PlaybackState::Paused {
            return Err(MusicError::NotPaused);
        }
        let connection = self.connection.as_mut().ok_or(MusicError::NotPaused)?;
        collab
            .bounded("transport", connection.resume())
            .await?
            .map_err(transport_error)?;

        self.clock.resume();
        self.state = PlaybackState::Playing;
        self.cancel_idle_timers();
        self.current.clone().ok_or(MusicError::NotPaused)
    }

    /// Apply a validated volume to the live stream, if any.
    pub(crate) async fn set_volume(&mut self, volume: Volume, collab: &Collaborators) -> MusicResult<()> {
        if matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
            if let Some(connection) = self.connection.as_mut() {
                collab
                    .bounded("transport", connection.set_volume(volume))
                    .await?
                    .map_err(transport_error)?;
            }
        }
        self.volume = volume;
        Ok(())
    }

    pub(crate) fn set_loop(&mut self, mode: LoopMode) {
        self.loop_mode = mode;
    }

    /// Flip one filter and re-apply the chain to the live stream.
    pub(crate) async fn toggle_filter(
        &mut self,
        name: FilterName,
        collab: &Collaborators,
    ) -> MusicResult<FilterChain> {
        let mut filters = self.filters.clone();
        filters.toggle(name);

        if matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
            let position = self.position();
            let previous = std::mem::replace(&mut self.filters, filters);
            if let Err(err) = self.reopen(position, collab).await {
                self.filters = previous;
                return Err(err);
            }
        } else {
            self.filters = filters;
        }

        Ok(self.filters.clone())
    }

    /// Reopen the current track at `seconds` relative to the cursor.
    pub(crate) async fn seek(
        &mut self,
        direction: SeekDirection,
        seconds: u64,
        collab: &Collaborators,
    ) -> MusicResult<Duration> {
        if !collab.source.supports_seek() {
            return Err(MusicError::SeekUnsupported);
        }
        let track = self.current.clone().ok_or(MusicError::NothingPlaying)?;

        let position = self.position();
        let delta = Duration::from_secs(seconds);
        let target = match direction {
            SeekDirection::Forward => position.saturating_add(delta),
            SeekDirection::Backward => position.saturating_sub(delta),
        }
        .min(track.duration.unwrap_or(MAX_SEEK_WITHOUT_DURATION));

        self.reopen(target, collab).await?;
        Ok(target)
    }

    /// Restart the current track at `offset`, keeping a paused session paused.
    async fn reopen(&mut self, offset: Duration, collab: &Collaborators) -> MusicResult<()> {
        let track = self.current.clone().ok_or(MusicError::NothingPlaying)?;
        let was_paused = self.state == PlaybackState::Paused;

        match self.begin(track, offset, collab).await {
            Ok(()) => {}
            Err(StepError::Open(err)) => return Err(err),
            Err(StepError::Push(err)) => {
                self.disconnect("transport rejected the stream", collab).await;
                return Err(err);
            }
        }

        if was_paused {
            if let Some(connection) = self.connection.as_mut() {
                match collab.bounded("transport", connection.pause()).await {
                    Ok(Ok(())) => {
                        self.clock.pause();
                        self.state = PlaybackState::Paused;
                    }
                    Ok(Err(err)) => warn!("Could not re-pause guild {}: {}", self.tenant, err),
                    Err(err) => warn!("Could not re-pause guild {}: {}", self.tenant, err),
                }
            }
        }
        Ok(())
    }

    pub(crate) fn remove(&mut self, position: usize) -> MusicResult<Track> {
        if self.queue.is_empty() {
            return Err(MusicError::EmptyQueue);
        }
        self.queue
            .remove_track(position)
            .ok_or(MusicError::OutOfRange(i64::try_from(position).unwrap_or(i64::MAX)))
    }

    pub(crate) fn clear_queue(&mut self) -> usize {
        self.queue.clear()
    }

    pub fn queue_page(&self, page: usize) -> QueuePage {
        self.queue.page(page, self.current.clone())
    }

    pub fn now_playing(&self) -> MusicResult<NowPlaying> {
        let track = self.current.clone().ok_or(MusicError::NothingPlaying)?;
        Ok(NowPlaying {
            track,
            position: self.position(),
            state: self.state,
            loop_mode: self.loop_mode,
            volume: self.volume,
            filters: self.filters.clone(),
            upcoming: self.queue.len(),
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            tenant: self.tenant,
            channel: self.channel,
            state: self.state,
            current: self.current.clone(),
            queue: self.queue.iter().cloned().collect(),
            loop_mode: self.loop_mode,
            volume: self.volume,
            filters: self.filters.clone(),
            position: self.position(),
            idle_since: self.idle_since,
            empty_channel_timer: self.timers.is_armed(IdleTimer::EmptyChannel),
            queue_end_timer: self.timers.is_armed(IdleTimer::QueueEnd),
            connected: self.connection.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn clock_advances_at_filter_speed() {
        let clock = PlaybackClock::start(Duration::from_secs(10), 1.25);

        tokio::time::advance(Duration::from_secs(8)).await;

        assert_eq!(clock.position(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn paused_clock_stands_still() {
        let mut clock = PlaybackClock::start(Duration::ZERO, 1.0);
        tokio::time::advance(Duration::from_secs(5)).await;
        clock.pause();

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(clock.position(), Duration::from_secs(5));

        clock.resume();
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(clock.position(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn clock_saturates_instead_of_overflowing() {
        let clock = PlaybackClock::start(Duration::MAX, 1.0);

        tokio::time::advance(Duration::from_secs(1)).await;

        assert_eq!(clock.position(), Duration::MAX);
    }

    #[test]
    fn session_ids_are_unique() {
        assert_ne!(SessionId::next(), SessionId::next());
    }
}
