//! Provides functions for interacting with the application's SQLite database.
//! Handles initialization, table creation, and the per-guild music settings rows.

use rusqlite::{Connection, OptionalExtension, Result as SqlResult, params};
use std::path::Path;
use std::sync::Once;
use tracing::error;

/// The default filename for the SQLite database.
pub const APPDATA_DB: &str = "application_data.db";
/// Ensures that database table creation logic runs only once.
static DB_INIT: Once = Once::new();

/// Initializes the database file at `path` by ensuring the necessary tables are created.
/// Uses `std::sync::Once` to guarantee table creation happens only once per application run.
pub fn init_db(path: &Path) -> SqlResult<()> {
    let mut result = Ok(());
    DB_INIT.call_once(|| {
        result = Connection::open(path).and_then(|conn| create_tables(&conn));
        if let Err(e) = &result {
            error!("Failed to create database tables: {}", e);
        }
    });
    result
}

/// Creates the `guild_music_settings` table if it doesn't exist.
pub fn create_tables(conn: &Connection) -> SqlResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS guild_music_settings (
            guild_id INTEGER PRIMARY KEY,
            volume INTEGER NOT NULL,
            loop_mode TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

/// Retrieves the raw `(volume, loop_mode)` row for a guild, if any.
pub fn load_music_settings(conn: &Connection, guild_id: u64) -> SqlResult<Option<(i64, String)>> {
    conn.query_row(
        "SELECT volume, loop_mode FROM guild_music_settings WHERE guild_id = ?1",
        params![guild_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .optional()
}

/// Inserts or replaces the music settings for a guild.
pub fn store_music_settings(
    conn: &Connection,
    guild_id: u64,
    volume: i64,
    loop_mode: &str,
) -> SqlResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO guild_music_settings (guild_id, volume, loop_mode) VALUES (?1, ?2, ?3)",
        params![guild_id, volume, loop_mode],
    )?;
    Ok(())
}
