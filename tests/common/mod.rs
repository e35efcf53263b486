//! Common test utilities, fixtures, and mocks
//! Shared by the integration tests; each test file only uses part of it.
#![allow(dead_code)]

pub mod fixtures;
pub mod mocks;

use std::sync::{Arc, Once};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use rusty_jukebox::commands::music::utils::guild_settings::MemorySettingsStore;
use rusty_jukebox::commands::music::utils::music_manager::{
    ChannelRef, Collaborators, MusicResult, PlayOutcome, SessionManager, TenantId,
};
use rusty_jukebox::utils::config::MusicConfig;

use mocks::{FakeTrackSource, FakeTransport};

pub const GUILD: TenantId = TenantId(111_222_333);
pub const OTHER_GUILD: TenantId = TenantId(444_555_666);
pub const VOICE: ChannelRef = ChannelRef(987_654_321);
pub const REQUESTER: &str = "tester";

static INIT: Once = Once::new();

/// Initialize test logging once per test binary
pub fn init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("rusty_jukebox=debug"))
            .with_test_writer()
            .try_init();
    });
}

/// Configuration with the stock cooldowns and an in-memory database path.
pub fn test_config() -> MusicConfig {
    MusicConfig {
        database_path: ":memory:".into(),
        ..MusicConfig::default()
    }
}

/// A session manager wired to fakes the test can inspect and steer.
pub struct Harness {
    pub music: SessionManager,
    pub source: Arc<FakeTrackSource>,
    pub transport: FakeTransport,
    pub store: Arc<MemorySettingsStore>,
    pub config: MusicConfig,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(FakeTrackSource::new(), test_config())
    }

    pub fn with_source(source: FakeTrackSource) -> Self {
        Self::build(source, test_config())
    }

    pub fn with_config(config: MusicConfig) -> Self {
        Self::build(FakeTrackSource::new(), config)
    }

    fn build(source: FakeTrackSource, config: MusicConfig) -> Self {
        init();
        let source = Arc::new(source);
        let transport = FakeTransport::default();
        let store = Arc::new(MemorySettingsStore::default());

        let music = SessionManager::new(Collaborators {
            source: source.clone(),
            transport: Arc::new(transport.clone()),
            store: store.clone(),
            config: config.clone(),
        });

        Self {
            music,
            source,
            transport,
            store,
            config,
        }
    }

    /// Play `query` in `GUILD` from `VOICE`.
    pub async fn play(&self, query: &str) -> MusicResult<PlayOutcome> {
        self.music.play(GUILD, Some(VOICE), query, REQUESTER).await
    }

    /// Report the natural end of the stream currently playing in `tenant` and
    /// wait for the session to react.
    pub async fn finish(&self, tenant: TenantId) {
        self.transport.finish_current(tenant);
        drain().await;
    }

    /// Titles of the current track followed by the queue.
    pub async fn lineup(&self, tenant: TenantId) -> Vec<String> {
        let Some(snapshot) = self.music.session_state(tenant).await else {
            return Vec::new();
        };
        snapshot
            .current
            .iter()
            .chain(snapshot.queue.iter())
            .map(|track| track.id.clone())
            .collect()
    }
}

/// Let spawned event and timer tasks run to completion.
pub async fn drain() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
