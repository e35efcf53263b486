//! Process configuration for the music feature, read from the environment
//! (after `dotenv` has loaded `.env`).

use humantime_serde::re::humantime;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use super::database::APPDATA_DB;

const DEFAULT_VOLUME: u8 = 50;
const DEFAULT_COOLDOWN: Duration = Duration::from_secs(5 * 60);
const DEFAULT_COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, PartialEq)]
pub struct MusicConfig {
    /// SQLite file holding per-guild settings.
    pub database_path: PathBuf,
    /// Volume (1-100) for guilds without stored settings.
    pub default_volume: u8,
    /// How long to stay in a voice channel nobody listens in.
    pub leave_on_empty_cooldown: Duration,
    /// How long to stay connected after the queue ran out.
    pub leave_on_end_cooldown: Duration,
    /// Upper bound on every search, stream and voice call.
    pub collaborator_timeout: Duration,
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(APPDATA_DB),
            default_volume: DEFAULT_VOLUME,
            leave_on_empty_cooldown: DEFAULT_COOLDOWN,
            leave_on_end_cooldown: DEFAULT_COOLDOWN,
            collaborator_timeout: DEFAULT_COLLABORATOR_TIMEOUT,
        }
    }
}

impl MusicConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Invalid values fall back to
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let default_volume = match lookup("MUSIC_DEFAULT_VOLUME") {
            Some(raw) => match raw.trim().parse::<u8>() {
                Ok(volume) if (1..=100).contains(&volume) => volume,
                _ => {
                    warn!("Ignoring MUSIC_DEFAULT_VOLUME={:?}, expected 1-100", raw);
                    defaults.default_volume
                }
            },
            None => defaults.default_volume,
        };

        Self {
            database_path: lookup("MUSIC_DATABASE")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            default_volume,
            leave_on_empty_cooldown: duration_var(
                &lookup,
                "MUSIC_LEAVE_ON_EMPTY_COOLDOWN",
                defaults.leave_on_empty_cooldown,
            ),
            leave_on_end_cooldown: duration_var(
                &lookup,
                "MUSIC_LEAVE_ON_END_COOLDOWN",
                defaults.leave_on_end_cooldown,
            ),
            collaborator_timeout: duration_var(
                &lookup,
                "MUSIC_COLLABORATOR_TIMEOUT",
                defaults.collaborator_timeout,
            ),
        }
    }
}

fn duration_var(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: Duration) -> Duration {
    let Some(raw) = lookup(key) else {
        return default;
    };
    humantime::parse_duration(raw.trim()).unwrap_or_else(|e| {
        warn!("Ignoring {}={:?}: {}", key, raw, e);
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(MusicConfig::from_lookup(lookup(&[])), MusicConfig::default());
    }

    #[test]
    fn reads_humantime_durations() {
        let config = MusicConfig::from_lookup(lookup(&[
            ("MUSIC_LEAVE_ON_EMPTY_COOLDOWN", "90s"),
            ("MUSIC_LEAVE_ON_END_COOLDOWN", "2m 30s"),
            ("MUSIC_COLLABORATOR_TIMEOUT", "5s"),
            ("MUSIC_DEFAULT_VOLUME", "30"),
            ("MUSIC_DATABASE", "/tmp/music.db"),
        ]));

        assert_eq!(config.leave_on_empty_cooldown, Duration::from_secs(90));
        assert_eq!(config.leave_on_end_cooldown, Duration::from_secs(150));
        assert_eq!(config.collaborator_timeout, Duration::from_secs(5));
        assert_eq!(config.default_volume, 30);
        assert_eq!(config.database_path, PathBuf::from("/tmp/music.db"));
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = MusicConfig::from_lookup(lookup(&[
            ("MUSIC_LEAVE_ON_EMPTY_COOLDOWN", "soon"),
            ("MUSIC_DEFAULT_VOLUME", "250"),
        ]));

        assert_eq!(config.leave_on_empty_cooldown, DEFAULT_COOLDOWN);
        assert_eq!(config.default_volume, DEFAULT_VOLUME);
    }
}
