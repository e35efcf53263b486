//! Sample tracks used across the tests

use fake::Fake;
use fake::faker::name::en::Name;
use std::time::Duration;

use rusty_jukebox::commands::music::audio_sources::Track;

/// Length of every fixture track.
pub const TRACK_LENGTH: Duration = Duration::from_secs(180);

/// A three minute track whose id is `id`.
pub fn track(id: &str) -> Track {
    Track::new(
        id,
        format!("Track {}", id),
        format!("https://www.youtube.com/watch?v={}", id),
    )
    .with_duration(TRACK_LENGTH)
}

/// A track of unknown length, like a live stream.
pub fn live_track(id: &str) -> Track {
    Track::new(
        id,
        format!("Live {}", id),
        format!("https://www.youtube.com/watch?v={}", id),
    )
}

/// A random display name for a requester.
pub fn requester() -> String {
    Name().fake()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_tracks_have_a_duration() {
        let track = track("abc");
        assert_eq!(track.id, "abc");
        assert_eq!(track.duration, Some(TRACK_LENGTH));
        assert!(!requester().is_empty());
        assert_eq!(live_track("xyz").duration, None);
    }
}
