//! Fake collaborators for the session manager
//! Both record every call and can be told to fail or stall.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusty_jukebox::commands::music::audio_sources::{
    AudioSourceResult, SourceError, StreamHandle, Track, TrackSource,
};
use rusty_jukebox::commands::music::utils::filters::FilterChain;
use rusty_jukebox::commands::music::utils::music_manager::{ChannelRef, TenantId, Volume};
use rusty_jukebox::commands::music::utils::transport::{
    Connection, EventSink, Transport, TransportError, TransportEvent,
};

use super::fixtures;

/// Resolves every query to a fixture track with the query as its id.
#[derive(Default)]
pub struct FakeTrackSource {
    no_seek: bool,
    missing: Mutex<HashSet<String>>,
    unplayable: Mutex<HashSet<String>>,
    live: Mutex<HashSet<String>>,
    search_delay: Mutex<Option<Duration>>,
    stalled: Mutex<HashMap<String, Duration>>,
    opens: Mutex<Vec<(String, Duration)>>,
    searches: AtomicUsize,
}

impl FakeTrackSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider that cannot open streams at an offset.
    pub fn without_seek() -> Self {
        Self {
            no_seek: true,
            ..Self::default()
        }
    }

    /// Searches for `query` find nothing.
    pub fn not_found(&self, query: &str) {
        self.missing.lock().unwrap().insert(query.to_string());
    }

    /// Opening the track with `id` fails.
    pub fn fail_open(&self, id: &str) {
        self.unplayable.lock().unwrap().insert(id.to_string());
    }

    /// Searches for `query` find a track without a known duration.
    pub fn live(&self, query: &str) {
        self.live.lock().unwrap().insert(query.to_string());
    }

    pub fn delay_search(&self, delay: Duration) {
        *self.search_delay.lock().unwrap() = Some(delay);
    }

    /// Only searches for `query` take `delay`.
    pub fn stall_search(&self, query: &str, delay: Duration) {
        self.stalled.lock().unwrap().insert(query.to_string(), delay);
    }

    /// Every `open_stream` call so far, as (track id, offset).
    pub fn opens(&self) -> Vec<(String, Duration)> {
        self.opens.lock().unwrap().clone()
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrackSource for FakeTrackSource {
    async fn search(&self, query: &str, requested_by: &str) -> AudioSourceResult<Vec<Track>> {
        self.searches.fetch_add(1, Ordering::SeqCst);

        let delay = self
            .stalled
            .lock()
            .unwrap()
            .get(query)
            .copied()
            .or(*self.search_delay.lock().unwrap());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.missing.lock().unwrap().contains(query) {
            return Ok(Vec::new());
        }
        let track = if self.live.lock().unwrap().contains(query) {
            fixtures::live_track(query)
        } else {
            fixtures::track(query)
        };
        Ok(vec![track.with_requester(requested_by)])
    }

    async fn open_stream(
        &self,
        track: &Track,
        offset: Duration,
        filters: &FilterChain,
    ) -> AudioSourceResult<StreamHandle> {
        self.opens
            .lock()
            .unwrap()
            .push((track.id.clone(), offset));

        if self.unplayable.lock().unwrap().contains(&track.id) {
            return Err(SourceError::Provider(format!("{} is unavailable", track.id)));
        }
        Ok(StreamHandle::new(track, offset)
            .with_filters(filters.clone())
            .with_media_url(format!("https://media.test/{}", track.id)))
    }

    fn supports_seek(&self) -> bool {
        !self.no_seek
    }
}

/// One stream handed to a connection.
#[derive(Debug, Clone)]
pub struct Push {
    pub tenant: TenantId,
    pub stream: StreamHandle,
    pub generation: u64,
}

/// Everything the fake transport was asked to do.
#[derive(Debug, Default, Clone)]
pub struct TransportLog {
    pub connects: Vec<(TenantId, ChannelRef)>,
    pub pushes: Vec<Push>,
    pub pauses: usize,
    pub resumes: usize,
    pub volumes: Vec<Volume>,
    pub closes: usize,
}

#[derive(Default)]
struct Shared {
    log: Mutex<TransportLog>,
    sinks: Mutex<HashMap<TenantId, EventSink>>,
    deny: AtomicBool,
    fail_push: AtomicBool,
    connect_delay: Mutex<Option<Duration>>,
}

/// In-process voice transport. Clones share their state.
#[derive(Clone, Default)]
pub struct FakeTransport {
    shared: Arc<Shared>,
}

impl FakeTransport {
    pub fn log(&self) -> TransportLog {
        self.shared.log.lock().unwrap().clone()
    }

    pub fn deny_connections(&self) {
        self.shared.deny.store(true, Ordering::SeqCst);
    }

    pub fn fail_pushes(&self, fail: bool) {
        self.shared.fail_push.store(fail, Ordering::SeqCst);
    }

    pub fn delay_connect(&self, delay: Duration) {
        *self.shared.connect_delay.lock().unwrap() = Some(delay);
    }

    /// Event sink handed to the most recent connection of `tenant`.
    pub fn sink(&self, tenant: TenantId) -> Option<EventSink> {
        self.shared.sinks.lock().unwrap().get(&tenant).cloned()
    }

    pub fn last_push(&self, tenant: TenantId) -> Option<Push> {
        self.log()
            .pushes
            .into_iter()
            .rev()
            .find(|push| push.tenant == tenant)
    }

    /// Report the end of the latest stream pushed for `tenant`.
    pub fn finish_current(&self, tenant: TenantId) {
        if let Some(push) = self.last_push(tenant) {
            self.report(tenant, TransportEvent::TrackFinished {
                generation: push.generation,
            });
        }
    }

    pub fn report(&self, tenant: TenantId, event: TransportEvent) {
        if let Some(sink) = self.sink(tenant) {
            sink.report(event);
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(
        &self,
        tenant: TenantId,
        channel: ChannelRef,
        events: EventSink,
    ) -> Result<Box<dyn Connection>, TransportError> {
        let delay = *self.shared.connect_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.shared.deny.load(Ordering::SeqCst) {
            return Err(TransportError::Denied("Missing Connect permission".to_string()));
        }

        self.shared.log.lock().unwrap().connects.push((tenant, channel));
        self.shared
            .sinks
            .lock()
            .unwrap()
            .insert(tenant, events.clone());
        events.report(TransportEvent::Ready);

        Ok(Box::new(FakeConnection {
            tenant,
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct FakeConnection {
    tenant: TenantId,
    shared: Arc<Shared>,
}

#[async_trait]
impl Connection for FakeConnection {
    async fn push(&mut self, stream: StreamHandle, generation: u64) -> Result<(), TransportError> {
        if self.shared.fail_push.load(Ordering::SeqCst) {
            return Err(TransportError::Failed("Voice driver crashed".to_string()));
        }
        self.shared.log.lock().unwrap().pushes.push(Push {
            tenant: self.tenant,
            stream,
            generation,
        });
        Ok(())
    }

    async fn pause(&mut self) -> Result<(), TransportError> {
        self.shared.log.lock().unwrap().pauses += 1;
        Ok(())
    }

    async fn resume(&mut self) -> Result<(), TransportError> {
        self.shared.log.lock().unwrap().resumes += 1;
        Ok(())
    }

    async fn set_volume(&mut self, volume: Volume) -> Result<(), TransportError> {
        self.shared.log.lock().unwrap().volumes.push(volume);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.shared.log.lock().unwrap().closes += 1;
        Ok(())
    }
}
