//! Durable per-guild music settings (volume and loop mode).

use dashmap::DashMap;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, warn};

use super::music_manager::{MusicError, MusicResult, TenantId, Volume};
use super::queue_manager::LoopMode;
use crate::utils::database;

/// Settings that survive session teardown and restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TenantSettings {
    pub volume: Volume,
    pub loop_mode: LoopMode,
}

impl TenantSettings {
    pub fn new(volume: Volume, loop_mode: LoopMode) -> Self {
        Self { volume, loop_mode }
    }
}

/// Storage for `TenantSettings`.
#[cfg_attr(test, mockall::automock)]
pub trait SettingsStore: Send + Sync {
    /// `None` if nothing was stored for `tenant` yet.
    fn load(&self, tenant: TenantId) -> MusicResult<Option<TenantSettings>>;

    fn save(&self, tenant: TenantId, settings: &TenantSettings) -> MusicResult<()>;
}

/// SQLite backed store using the `guild_music_settings` table.
pub struct SqliteSettingsStore {
    conn: Mutex<Connection>,
}

impl SqliteSettingsStore {
    pub fn open(path: impl AsRef<Path>) -> MusicResult<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> MusicResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> MusicResult<Self> {
        database::create_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MusicResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| MusicError::ConfigError("settings database lock poisoned".to_string()))
    }
}

impl SettingsStore for SqliteSettingsStore {
    fn load(&self, tenant: TenantId) -> MusicResult<Option<TenantSettings>> {
        let conn = self.conn()?;
        let Some((volume, loop_mode)) = database::load_music_settings(&conn, tenant.0)? else {
            return Ok(None);
        };

        // Hand-edited rows fall back to defaults.
        let volume = Volume::new(volume).unwrap_or_else(|e| {
            warn!("Stored volume for guild {} is invalid: {}", tenant, e);
            Volume::default()
        });
        let loop_mode = loop_mode.parse().unwrap_or_else(|e| {
            warn!("Stored loop mode for guild {} is invalid: {}", tenant, e);
            LoopMode::default()
        });

        Ok(Some(TenantSettings::new(volume, loop_mode)))
    }

    fn save(&self, tenant: TenantId, settings: &TenantSettings) -> MusicResult<()> {
        let conn = self.conn()?;
        database::store_music_settings(
            &conn,
            tenant.0,
            i64::from(settings.volume),
            settings.loop_mode.as_str(),
        )?;
        debug!("Saved music settings for guild {}: {:?}", tenant, settings);
        Ok(())
    }
}

/// Process-local store, used when no database is wanted.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: DashMap<TenantId, TenantSettings>,
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self, tenant: TenantId) -> MusicResult<Option<TenantSettings>> {
        Ok(self.settings.get(&tenant).map(|entry| *entry))
    }

    fn save(&self, tenant: TenantId, settings: &TenantSettings) -> MusicResult<()> {
        self.settings.insert(tenant, *settings);
        Ok(())
    }
}
