//! Defines the `Track` struct, the unified representation of a resolved, playable
//! unit of audio, and the conversion from `yt-dlp` JSON output.

use crate::commands::music::audio_sources::SourceError;
use serde::{Deserialize, Serialize};
use std::process::Output;
use std::time::Duration;

/// A resolved track. Immutable once created; the session queue owns it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    /// Provider-specific identifier (e.g. the YouTube video id).
    pub id: String,
    /// The title of the track.
    pub title: String,
    /// Reference the provider can reopen the track from (e.g. the watch page URL).
    pub source_ref: String,
    /// The duration of the track, if the provider reported one.
    #[serde(with = "humantime_serde")]
    pub duration: Option<Duration>,
    /// URL to a thumbnail image for the track, if available.
    pub thumbnail: Option<String>,
    /// The name of the user who requested the track.
    pub requested_by: Option<String>,
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>, source_ref: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            source_ref: source_ref.into(),
            duration: None,
            thumbnail: None,
            requested_by: None,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_requester(mut self, requested_by: impl Into<String>) -> Self {
        self.requested_by = Some(requested_by.into());
        self
    }

    /// Creates a `Track` from `yt-dlp -j` output, adding the requestor's name.
    pub fn from_youtube(output: Output, requested_by: &str) -> Result<Track, SourceError> {
        let track = Self::try_from(output)?;
        Ok(track.with_requester(requested_by))
    }
}

/// Converts one `yt-dlp --dump-json` document into a `Track`.
impl TryFrom<&serde_json::Value> for Track {
    type Error = SourceError;

    fn try_from(json: &serde_json::Value) -> Result<Self, Self::Error> {
        let id = json["id"]
            .as_str()
            .ok_or_else(|| SourceError::Malformed("missing video id".to_string()))?
            .to_string();

        let title = json["title"]
            .as_str()
            .unwrap_or("Unknown Title")
            .to_string();

        let source_ref = json["webpage_url"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", id));

        // Live streams report no duration; yt-dlp uses a float for the rest.
        let duration = json["duration"]
            .as_f64()
            .filter(|secs| *secs > 0.0)
            .map(Duration::from_secs_f64);

        let thumbnail = json["thumbnail"].as_str().map(str::to_string);

        Ok(Track {
            id,
            title,
            source_ref,
            duration,
            thumbnail,
            requested_by: None,
        })
    }
}

/// Converts the raw output of a `yt-dlp -j` invocation into a `Track`.
impl TryFrom<Output> for Track {
    type Error = SourceError;

    fn try_from(value: Output) -> Result<Self, Self::Error> {
        if !value.status.success() {
            let stderr = String::from_utf8_lossy(&value.stderr);
            return Err(SourceError::Provider(stderr.trim().to_string()));
        }

        // `ytsearch1:` prints one JSON document per line; take the first.
        let stdout = String::from_utf8_lossy(&value.stdout);
        let first = stdout
            .lines()
            .find(|line| !line.trim().is_empty())
            .ok_or(SourceError::NoMatches)?;

        let json: serde_json::Value = serde_json::from_str(first)
            .map_err(|e| SourceError::Malformed(format!("Failed to parse video metadata: {}", e)))?;

        Track::try_from(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_yt_dlp_document() {
        let doc = json!({
            "id": "dQw4w9WgXcQ",
            "title": "Never Gonna Give You Up",
            "webpage_url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "duration": 213.0,
            "thumbnail": "https://i.ytimg.com/vi/dQw4w9WgXcQ/hq.jpg"
        });

        let track = Track::try_from(&doc).unwrap();

        assert_eq!(track.id, "dQw4w9WgXcQ");
        assert_eq!(track.title, "Never Gonna Give You Up");
        assert_eq!(track.duration, Some(Duration::from_secs(213)));
        assert_eq!(track.requested_by, None);
    }

    #[test]
    fn live_stream_has_no_duration_and_fallback_url() {
        let doc = json!({ "id": "abc", "title": "lofi radio", "duration": null });

        let track = Track::try_from(&doc).unwrap();

        assert_eq!(track.duration, None);
        assert_eq!(track.source_ref, "https://www.youtube.com/watch?v=abc");
    }

    #[test]
    fn missing_id_is_malformed() {
        let doc = json!({ "title": "no id" });
        assert_matches!(Track::try_from(&doc), Err(SourceError::Malformed(_)));
    }

    #[test]
    fn serializes_duration_as_humantime() {
        let track = Track::new("a", "A", "https://example.com/a")
            .with_duration(Duration::from_secs(90));

        let value = serde_json::to_value(&track).unwrap();

        assert_eq!(value["duration"], "1m 30s");
    }
}
