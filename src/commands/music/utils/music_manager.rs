use dashmap::DashMap;
use futures::future::join_all;
use poise::serenity_prelude as serenity;
use serde::{Deserialize, Serialize};
use serenity::model::id::{ChannelId, GuildId};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use super::filters::{FilterChain, FilterName};
use super::guild_settings::{SettingsStore, TenantSettings};
use super::queue_manager::{LoopMode, QueuePage};
use super::session::{NowPlaying, SeekDirection, Session, SessionEvent, SessionId, SessionSnapshot};
use super::transport::{EventSink, SessionEnvelope, Transport};
use crate::commands::music::audio_sources::{Track, TrackSource};
use crate::utils::config::MusicConfig;

/// Errors that can occur during music operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MusicError {
    #[error("Not in a guild")]
    NotInGuild,

    #[error("You need to be in a voice channel")]
    NoChannel,

    #[error("Search failed: {0}")]
    SearchFailed(String),

    #[error("Cannot join or speak in the voice channel: {0}")]
    TransportDenied(String),

    #[error("Nothing is playing right now")]
    NotPlaying,

    #[error("Playback is not paused")]
    NotPaused,

    #[error("The queue is empty")]
    EmptyQueue,

    #[error("Nothing is playing")]
    NothingPlaying,

    #[error("Value {0} is out of range")]
    OutOfRange(i64),

    #[error("Invalid loop mode '{0}' (expected off, track or queue)")]
    InvalidMode(String),

    #[error("Unknown filter '{0}' (expected bassboost, nightcore or vaporwave)")]
    UnknownFilter(String),

    #[error("This source does not support seeking")]
    SeekUnsupported,

    #[error("Timed out waiting for the {0}")]
    CollaboratorTimeout(&'static str),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<rusqlite::Error> for MusicError {
    fn from(err: rusqlite::Error) -> Self {
        MusicError::ConfigError(err.to_string())
    }
}

/// Result type for music operations
pub type MusicResult<T> = Result<T, MusicError>;

/// A served guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TenantId(pub u64);

impl From<GuildId> for TenantId {
    fn from(guild_id: GuildId) -> Self {
        TenantId(guild_id.get())
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A voice channel the bot can be asked to join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelRef(pub u64);

impl From<ChannelId> for ChannelRef {
    fn from(channel_id: ChannelId) -> Self {
        ChannelRef(channel_id.get())
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Playback volume in percent, always within `1..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Volume(u8);

impl Volume {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 100;
    pub const DEFAULT: u8 = 50;

    pub fn new(value: i64) -> MusicResult<Self> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Volume(value as u8))
        } else {
            Err(MusicError::OutOfRange(value))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    /// Linear gain for the audio driver (`1.0` = unchanged).
    pub fn gain(&self) -> f32 {
        f32::from(self.0) / 100.0
    }
}

impl Default for Volume {
    fn default() -> Self {
        Volume(Self::DEFAULT)
    }
}

impl TryFrom<i64> for Volume {
    type Error = MusicError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Volume::new(value)
    }
}

impl From<Volume> for i64 {
    fn from(volume: Volume) -> Self {
        i64::from(volume.0)
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Everything a session talks to besides its own state.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn TrackSource>,
    pub transport: Arc<dyn Transport>,
    pub store: Arc<dyn SettingsStore>,
    pub config: MusicConfig,
}

impl Collaborators {
    /// Run a collaborator call under the configured deadline.
    pub(crate) async fn bounded<T>(
        &self,
        collaborator: &'static str,
        call: impl Future<Output = T>,
    ) -> MusicResult<T> {
        tokio::time::timeout(self.config.collaborator_timeout, call)
            .await
            .map_err(|_| {
                warn!(
                    "{} did not answer within {:?}",
                    collaborator, self.config.collaborator_timeout
                );
                MusicError::CollaboratorTimeout(collaborator)
            })
    }
}

/// What `play` did with the resolved track.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayOutcome {
    /// Nothing was playing; the track started immediately.
    Started(Track),
    /// Appended to the queue at this 1-based position.
    Queued { track: Track, position: usize },
}

impl PlayOutcome {
    pub fn track(&self) -> &Track {
        match self {
            PlayOutcome::Started(track) | PlayOutcome::Queued { track, .. } => track,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkipOutcome {
    pub skipped: Track,
    /// Now playing after the skip, `None` if the session left the channel.
    pub next: Option<Track>,
}

/// Per-guild slot. Slots are never removed; a session is evicted by
/// clearing `session`.
#[derive(Default)]
struct TenantSlot {
    session: Option<Session>,
}

struct Inner {
    slots: DashMap<TenantId, Arc<Mutex<TenantSlot>>>,
    collab: Collaborators,
    events: mpsc::UnboundedSender<SessionEnvelope>,
}

/// Owns one playback session per guild and serializes every operation on it.
///
/// Cheap to clone. Must be created inside a tokio runtime.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(collab: Collaborators) -> Self {
        let (events, rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            slots: DashMap::new(),
            collab,
            events,
        });

        tokio::spawn(dispatch_events(Arc::downgrade(&inner), rx));

        Self { inner }
    }

    pub fn config(&self) -> &MusicConfig {
        &self.inner.collab.config
    }

    fn slot(&self, tenant: TenantId) -> Arc<Mutex<TenantSlot>> {
        self.inner.slots.entry(tenant).or_default().clone()
    }

    fn existing_slot(&self, tenant: TenantId) -> Option<Arc<Mutex<TenantSlot>>> {
        self.inner.slots.get(&tenant).map(|slot| slot.clone())
    }

    /// Drop a session that ended up disconnected.
    fn settle(tenant: TenantId, slot: &mut TenantSlot) {
        if slot.session.as_ref().is_some_and(Session::is_disconnected) {
            slot.session = None;
            info!("Evicted session for guild {}", tenant);
        }
    }

    /// Run `op` on the guild's session under its lock, or fail with `missing`.
    async fn with_session<T>(
        &self,
        tenant: TenantId,
        missing: MusicError,
        op: impl AsyncFnOnce(&mut Session, &Collaborators) -> MusicResult<T>,
    ) -> MusicResult<T> {
        let slot = self.slot(tenant);
        let mut guard = slot.lock().await;

        let result = match guard.session.as_mut() {
            Some(session) => op(session, &self.inner.collab).await,
            None => Err(missing),
        };

        Self::settle(tenant, &mut guard);
        result
    }

    fn default_settings(&self) -> TenantSettings {
        let volume = Volume::new(i64::from(self.inner.collab.config.default_volume))
            .unwrap_or_default();
        TenantSettings::new(volume, LoopMode::default())
    }

    fn load_settings(&self, tenant: TenantId) -> MusicResult<TenantSettings> {
        Ok(self
            .inner
            .collab
            .store
            .load(tenant)?
            .unwrap_or_else(|| self.default_settings()))
    }

    async fn resolve(&self, query: &str, requested_by: &str) -> MusicResult<Track> {
        let collab = &self.inner.collab;
        let found = collab
            .bounded("track source", collab.source.search(query, requested_by))
            .await?
            .map_err(|e| MusicError::SearchFailed(e.to_string()))?;

        found
            .into_iter()
            .next()
            .ok_or_else(|| MusicError::SearchFailed(format!("No results for '{}'", query)))
    }

    /// Resolve `query` and play it, creating and connecting a session if the
    /// guild has none.
    ///
    /// A lingering session in another channel is replaced by a new one in
    /// `channel`. While a track is current, new tracks are queued on the
    /// existing session wherever it is.
    pub async fn play(
        &self,
        tenant: TenantId,
        channel: Option<ChannelRef>,
        query: &str,
        requested_by: &str,
    ) -> MusicResult<PlayOutcome> {
        let channel = channel.ok_or(MusicError::NoChannel)?;
        let query = query.trim();
        if query.is_empty() {
            return Err(MusicError::SearchFailed("Empty query".to_string()));
        }

        let slot = self.slot(tenant);
        let mut guard = slot.lock().await;
        let collab = &self.inner.collab;

        debug!("Resolving '{}' for guild {}", query, tenant);
        let track = self.resolve(query, requested_by).await?;

        if let Some(session) = guard.session.as_mut() {
            if session.current().is_none() && session.channel() != channel {
                info!(
                    "Moving guild {} from channel {} to {}",
                    tenant,
                    session.channel(),
                    channel
                );
                session.disconnect("requester is in another channel", collab).await;
                guard.session = None;
            }
        }

        if let Some(session) = guard.session.as_mut() {
            session.cancel_idle_timers();

            if session.current().is_some() {
                let position = session.enqueue(track.clone());
                info!(
                    "Queued '{}' at position {} for guild {}",
                    track.title, position, tenant
                );
                return Ok(PlayOutcome::Queued { track, position });
            }

            let result = session.start(track.clone(), collab).await;
            Self::settle(tenant, &mut guard);
            return result.map(|()| PlayOutcome::Started(track));
        }

        let settings = self.load_settings(tenant)?;
        let id = SessionId::next();
        let events = EventSink::new(tenant, id, self.inner.events.clone());

        info!("Joining channel {} for guild {}", channel, tenant);
        let connection = collab
            .bounded(
                "transport",
                collab.transport.connect(tenant, channel, events.clone()),
            )
            .await?
            .map_err(|e| MusicError::TransportDenied(e.to_string()))?;

        let mut session = Session::new(id, tenant, channel, settings, connection, events);
        match session.start(track.clone(), collab).await {
            Ok(()) => {
                guard.session = Some(session);
                Ok(PlayOutcome::Started(track))
            }
            Err(err) => {
                session.disconnect("failed to start playback", collab).await;
                Err(err)
            }
        }
    }

    pub async fn pause(&self, tenant: TenantId) -> MusicResult<Track> {
        self.with_session(tenant, MusicError::NotPlaying, async |session, collab| {
            session.pause(collab).await
        })
        .await
    }

    pub async fn resume(&self, tenant: TenantId) -> MusicResult<Track> {
        self.with_session(tenant, MusicError::NotPaused, async |session, collab| {
            session.resume(collab).await
        })
        .await
    }

    /// End the current track now. Loop modes are bypassed.
    pub async fn skip(&self, tenant: TenantId) -> MusicResult<SkipOutcome> {
        self.with_session(tenant, MusicError::EmptyQueue, async |session, collab| {
            let skipped = session.current().cloned().ok_or(MusicError::EmptyQueue)?;
            session.transition(SessionEvent::Skipped, collab).await?;
            Ok(SkipOutcome {
                skipped,
                next: session.current().cloned(),
            })
        })
        .await
    }

    /// Clear everything and leave the channel.
    pub async fn stop(&self, tenant: TenantId) -> MusicResult<()> {
        self.with_session(tenant, MusicError::NothingPlaying, async |session, collab| {
            session.transition(SessionEvent::StopRequested, collab).await
        })
        .await
    }

    /// Like `stop`, but succeeds when there is no session.
    pub async fn disconnect(&self, tenant: TenantId) -> MusicResult<()> {
        match self.stop(tenant).await {
            Err(MusicError::NothingPlaying) => {
                debug!("Disconnect for guild {} without a session", tenant);
                Ok(())
            }
            other => other,
        }
    }

    /// Validate, apply live and persist a new volume.
    pub async fn set_volume(&self, tenant: TenantId, value: i64) -> MusicResult<Volume> {
        let volume = Volume::new(value)?;

        let slot = self.slot(tenant);
        let mut guard = slot.lock().await;
        if let Some(session) = guard.session.as_mut() {
            session.set_volume(volume, &self.inner.collab).await?;
        }

        let mut settings = self.load_settings(tenant)?;
        settings.volume = volume;
        self.inner.collab.store.save(tenant, &settings)?;

        info!("Volume for guild {} set to {}", tenant, volume);
        Ok(volume)
    }

    /// Parse, apply and persist a loop mode. Takes effect at the next track end.
    pub async fn set_loop(&self, tenant: TenantId, mode: &str) -> MusicResult<LoopMode> {
        let mode: LoopMode = mode.parse()?;

        let slot = self.slot(tenant);
        let mut guard = slot.lock().await;
        if let Some(session) = guard.session.as_mut() {
            session.set_loop(mode);
        }

        let mut settings = self.load_settings(tenant)?;
        settings.loop_mode = mode;
        self.inner.collab.store.save(tenant, &settings)?;

        info!("Loop mode for guild {} set to {}", tenant, mode);
        Ok(mode)
    }

    /// Flip a filter. Returns the resulting chain.
    pub async fn toggle_filter(&self, tenant: TenantId, name: &str) -> MusicResult<FilterChain> {
        let name: FilterName = name.parse()?;
        self.with_session(tenant, MusicError::NothingPlaying, async |session, collab| {
            session.toggle_filter(name, collab).await
        })
        .await
    }

    /// Returns the new position.
    pub async fn seek_forward(&self, tenant: TenantId, seconds: u64) -> MusicResult<Duration> {
        self.seek(tenant, SeekDirection::Forward, seconds).await
    }

    /// Returns the new position.
    pub async fn seek_backward(&self, tenant: TenantId, seconds: u64) -> MusicResult<Duration> {
        self.seek(tenant, SeekDirection::Backward, seconds).await
    }

    async fn seek(
        &self,
        tenant: TenantId,
        direction: SeekDirection,
        seconds: u64,
    ) -> MusicResult<Duration> {
        self.with_session(tenant, MusicError::NothingPlaying, async |session, collab| {
            session.seek(direction, seconds, collab).await
        })
        .await
    }

    /// 1-based page of upcoming tracks. Never mutates.
    pub async fn show_queue(&self, tenant: TenantId, page: usize) -> QueuePage {
        let Some(slot) = self.existing_slot(tenant) else {
            return QueuePage::empty();
        };
        let guard = slot.lock().await;
        guard
            .session
            .as_ref()
            .map(|session| session.queue_page(page))
            .unwrap_or_else(QueuePage::empty)
    }

    pub async fn now_playing(&self, tenant: TenantId) -> MusicResult<NowPlaying> {
        let slot = self.existing_slot(tenant).ok_or(MusicError::NothingPlaying)?;
        let guard = slot.lock().await;
        guard
            .session
            .as_ref()
            .ok_or(MusicError::NothingPlaying)?
            .now_playing()
    }

    /// Persisted settings, written with defaults on first access.
    pub async fn get_server_config(&self, tenant: TenantId) -> MusicResult<TenantSettings> {
        let slot = self.slot(tenant);
        let _guard = slot.lock().await;

        let store = &self.inner.collab.store;
        if let Some(settings) = store.load(tenant)? {
            return Ok(settings);
        }

        let settings = self.default_settings();
        store.save(tenant, &settings)?;
        info!("Created default music settings for guild {}", tenant);
        Ok(settings)
    }

    /// Remove a queued track by 1-based position.
    pub async fn remove(&self, tenant: TenantId, position: usize) -> MusicResult<Track> {
        self.with_session(tenant, MusicError::EmptyQueue, async |session, _| {
            session.remove(position)
        })
        .await
    }

    /// Drop all upcoming tracks. Returns how many were removed.
    pub async fn clear_queue(&self, tenant: TenantId) -> MusicResult<usize> {
        self.with_session(tenant, MusicError::EmptyQueue, async |session, _| {
            Ok(session.clear_queue())
        })
        .await
    }

    pub async fn session_state(&self, tenant: TenantId) -> Option<SessionSnapshot> {
        let slot = self.existing_slot(tenant)?;
        let guard = slot.lock().await;
        guard.session.as_ref().map(Session::snapshot)
    }

    /// Nobody but the bot is left in the guild's voice channel.
    pub async fn channel_emptied(&self, tenant: TenantId) {
        self.notify(tenant, SessionEvent::ChannelEmptied).await;
    }

    /// Someone joined the bot's voice channel again.
    pub async fn channel_occupied(&self, tenant: TenantId) {
        self.notify(tenant, SessionEvent::ChannelOccupied).await;
    }

    async fn notify(&self, tenant: TenantId, event: SessionEvent) {
        let Some(slot) = self.existing_slot(tenant) else {
            return;
        };
        let mut guard = slot.lock().await;
        if let Some(session) = guard.session.as_mut() {
            if let Err(err) = session.transition(event, &self.inner.collab).await {
                warn!("Event for guild {} failed: {}", tenant, err);
            }
        }
        Self::settle(tenant, &mut guard);
    }

    /// Apply an event reported by a connection or timer.
    async fn apply(&self, envelope: SessionEnvelope) {
        let SessionEnvelope {
            tenant,
            session: id,
            event,
        } = envelope;
        let Some(slot) = self.existing_slot(tenant) else {
            return;
        };
        let mut guard = slot.lock().await;

        match guard.session.as_mut() {
            Some(session) if session.id() == id => {
                if let Err(err) = session.transition(event, &self.inner.collab).await {
                    warn!("Event for guild {} failed: {}", tenant, err);
                }
            }
            _ => {
                debug!("Dropping {:?} for a finished session of guild {}", event, tenant);
                return;
            }
        }
        Self::settle(tenant, &mut guard);
    }

    /// Number of guilds with a live session.
    pub fn active_sessions(&self) -> usize {
        self.inner
            .slots
            .iter()
            .filter(|slot| {
                slot.value()
                    .try_lock()
                    .map(|guard| guard.session.is_some())
                    .unwrap_or(true)
            })
            .count()
    }

    /// Disconnect every session.
    pub async fn shutdown(&self) {
        let tenants: Vec<TenantId> = self.inner.slots.iter().map(|slot| *slot.key()).collect();
        info!("Shutting down {} music slot(s)", tenants.len());

        let results = join_all(tenants.iter().map(|tenant| self.disconnect(*tenant))).await;
        for (tenant, result) in tenants.iter().zip(results) {
            if let Err(err) = result {
                warn!("Failed to disconnect guild {}: {}", tenant, err);
            }
        }
    }
}

/// Fan events out to one lane per guild. A lane applies its guild's events in
/// the order they were reported; lanes run independently of each other.
async fn dispatch_events(inner: Weak<Inner>, mut rx: mpsc::UnboundedReceiver<SessionEnvelope>) {
    let mut lanes: HashMap<TenantId, mpsc::UnboundedSender<SessionEnvelope>> = HashMap::new();

    while let Some(envelope) = rx.recv().await {
        if inner.strong_count() == 0 {
            break;
        }
        let tenant = envelope.tenant;
        let lane = lanes.entry(tenant).or_insert_with(|| {
            let (tx, lane_rx) = mpsc::unbounded_channel();
            tokio::spawn(apply_in_order(inner.clone(), tenant, lane_rx));
            tx
        });
        if lane.send(envelope).is_err() {
            lanes.remove(&tenant);
        }
    }
    debug!("Session event dispatcher stopped");
}

async fn apply_in_order(
    inner: Weak<Inner>,
    tenant: TenantId,
    mut rx: mpsc::UnboundedReceiver<SessionEnvelope>,
) {
    while let Some(envelope) = rx.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        SessionManager { inner }.apply(envelope).await;
    }
    debug!("Event lane for guild {} stopped", tenant);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::music::audio_sources::{MockTrackSource, StreamHandle};
    use crate::commands::music::utils::guild_settings::{MemorySettingsStore, MockSettingsStore};
    use crate::commands::music::utils::session::PlaybackState;
    use crate::commands::music::utils::transport::{Connection, TransportError};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use rstest::rstest;

    struct SilentConnection;

    #[async_trait]
    impl Connection for SilentConnection {
        async fn push(&mut self, _: StreamHandle, _: u64) -> Result<(), TransportError> {
            Ok(())
        }
        async fn pause(&mut self) -> Result<(), TransportError> {
            Ok(())
        }
        async fn resume(&mut self) -> Result<(), TransportError> {
            Ok(())
        }
        async fn set_volume(&mut self, _: Volume) -> Result<(), TransportError> {
            Ok(())
        }
        async fn close(&mut self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    struct SilentTransport;

    #[async_trait]
    impl Transport for SilentTransport {
        async fn connect(
            &self,
            _: TenantId,
            _: ChannelRef,
            _: EventSink,
        ) -> Result<Box<dyn Connection>, TransportError> {
            Ok(Box::new(SilentConnection))
        }
    }

    fn track() -> Track {
        Track::new("abc", "Song", "https://youtu.be/abc").with_duration(Duration::from_secs(200))
    }

    fn manager(source: MockTrackSource) -> SessionManager {
        SessionManager::new(Collaborators {
            source: Arc::new(source),
            transport: Arc::new(SilentTransport),
            store: Arc::new(MemorySettingsStore::default()),
            config: MusicConfig::default(),
        })
    }

    fn playable_source() -> MockTrackSource {
        let mut source = MockTrackSource::new();
        source.expect_search().returning(|_, _| Ok(vec![track()]));
        source
            .expect_open_stream()
            .returning(|track, offset, filters| {
                Ok(StreamHandle::new(track, offset).with_filters(filters.clone()))
            });
        source.expect_supports_seek().return_const(false);
        source
    }

    #[rstest]
    #[case(0)]
    #[case(101)]
    #[case(-5)]
    fn volume_outside_range_is_rejected(#[case] value: i64) {
        assert_matches!(Volume::new(value), Err(MusicError::OutOfRange(v)) if v == value);
    }

    #[test]
    fn volume_bounds_are_inclusive() {
        assert_eq!(Volume::new(1).unwrap().get(), 1);
        assert_eq!(Volume::new(100).unwrap().get(), 100);
        assert_eq!(Volume::default().to_string(), "50%");
    }

    #[tokio::test]
    async fn play_without_channel_fails_before_searching() {
        let mut source = MockTrackSource::new();
        source.expect_search().never();
        let manager = manager(source);

        let result = manager.play(TenantId(1), None, "song", "user").await;

        assert_matches!(result, Err(MusicError::NoChannel));
        assert!(manager.session_state(TenantId(1)).await.is_none());
    }

    #[tokio::test]
    async fn empty_search_result_is_search_failed() {
        let mut source = MockTrackSource::new();
        source.expect_search().returning(|_, _| Ok(Vec::new()));
        let manager = manager(source);

        let result = manager
            .play(TenantId(1), Some(ChannelRef(2)), "nothing", "user")
            .await;

        assert_matches!(result, Err(MusicError::SearchFailed(_)));
        assert!(manager.session_state(TenantId(1)).await.is_none());
    }

    #[tokio::test]
    async fn seek_on_provider_without_random_access_is_unsupported() {
        let manager = manager(playable_source());
        manager
            .play(TenantId(1), Some(ChannelRef(2)), "song", "user")
            .await
            .unwrap();

        let result = manager.seek_forward(TenantId(1), 10).await;

        assert_matches!(result, Err(MusicError::SeekUnsupported));
        let state = manager.session_state(TenantId(1)).await.unwrap();
        assert_eq!(state.state, PlaybackState::Playing);
    }

    #[tokio::test]
    async fn unknown_filter_is_rejected_before_touching_the_session() {
        let manager = manager(playable_source());

        let result = manager.toggle_filter(TenantId(1), "reverb").await;

        assert_matches!(result, Err(MusicError::UnknownFilter(_)));
    }

    #[tokio::test]
    async fn failing_settings_store_is_a_config_error() {
        let mut store = MockSettingsStore::new();
        store.expect_load().returning(|_| Ok(None));
        store
            .expect_save()
            .returning(|_, _| Err(MusicError::ConfigError("database is locked".to_string())));
        let manager = SessionManager::new(Collaborators {
            source: Arc::new(MockTrackSource::new()),
            transport: Arc::new(SilentTransport),
            store: Arc::new(store),
            config: MusicConfig::default(),
        });

        let result = manager.set_volume(TenantId(3), 70).await;

        assert_matches!(result, Err(MusicError::ConfigError(msg)) if msg == "database is locked");
    }

    #[tokio::test]
    async fn server_config_is_created_with_defaults() {
        let manager = manager(MockTrackSource::new());

        let settings = manager.get_server_config(TenantId(9)).await.unwrap();

        assert_eq!(settings.volume, Volume::default());
        assert_eq!(settings.loop_mode, LoopMode::Off);
    }
}
