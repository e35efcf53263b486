//! Implements the `TrackSource` trait for YouTube.
//! Uses the `yt-dlp` command-line tool for search, metadata and stream URLs.

use serenity::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};
use url::Url;

use crate::commands::music::utils::filters::FilterChain;

use super::{AudioSource, AudioSourceResult, SourceError, StreamHandle, Track, TrackSource};

/// The main struct implementing YouTube lookups (via `yt-dlp`).
#[derive(Debug, Clone)]
pub struct YoutubeApi {
    program: String,
}

impl Default for YoutubeApi {
    fn default() -> Self {
        Self {
            program: "yt-dlp".to_string(),
        }
    }
}

#[async_trait]
impl TrackSource for YoutubeApi {
    async fn search(&self, query: &str, requested_by: &str) -> AudioSourceResult<Vec<Track>> {
        let target = if AudioSource::is_url(query) {
            if Self::is_youtube_url(query) {
                info!("Resolving YouTube URL: {}", query);
            } else {
                info!("Resolving URL through yt-dlp extractors: {}", query);
            }
            query.to_string()
        } else {
            info!("Searching YouTube for: {}", query);
            format!("ytsearch1:{}", query)
        };

        let output = Command::new(&self.program)
            .args(["-j", "--no-playlist", &target])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SourceError::Provider(format!("Failed to run {}: {}", self.program, e)))?;

        let track = Track::from_youtube(output, requested_by)?;
        debug!("Resolved '{}' to '{}' ({})", query, track.title, track.id);

        Ok(vec![track])
    }

    async fn open_stream(
        &self,
        track: &Track,
        offset: Duration,
        filters: &FilterChain,
    ) -> AudioSourceResult<StreamHandle> {
        let stream = StreamHandle::new(track, offset).with_filters(filters.clone());
        if stream.is_plain() {
            debug!("Streaming '{}' straight from {}", track.title, track.source_ref);
            return Ok(stream);
        }

        // Offset or filtered playback goes through ffmpeg, which needs the direct media URL.
        let output = Command::new(&self.program)
            .args(["-f", "bestaudio", "-g", "--no-playlist", &track.source_ref])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SourceError::Provider(format!("Failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SourceError::Provider(stderr.trim().to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let media_url = stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or_else(|| SourceError::Malformed("yt-dlp returned no stream URL".to_string()))?;

        Ok(stream.with_media_url(media_url))
    }
}

impl YoutubeApi {
    /// Uses a custom `yt-dlp` compatible executable.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Checks if the input string is a valid YouTube URL (watch page or youtu.be).
    pub fn is_youtube_url(query: &str) -> bool {
        match Url::parse(query) {
            Ok(url) => {
                url.host_str().is_some_and(|host| {
                    host == "www.youtube.com" || host == "youtube.com" || host == "m.youtube.com"
                }) && url.path().starts_with("/watch")
                    || url.host_str() == Some("youtu.be")
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("https://www.youtube.com/watch?v=dQw4w9WgXcQ", true ; "watch page")]
    #[test_case("https://youtu.be/dQw4w9WgXcQ", true ; "short link")]
    #[test_case("https://m.youtube.com/watch?v=dQw4w9WgXcQ", true ; "mobile")]
    #[test_case("https://www.youtube.com/channel/xyz", false ; "channel page")]
    #[test_case("never gonna give you up", false ; "plain query")]
    fn recognises_youtube_urls(input: &str, expected: bool) {
        assert_eq!(YoutubeApi::is_youtube_url(input), expected);
    }

    #[tokio::test]
    async fn missing_program_is_a_provider_error() {
        let api = YoutubeApi::with_program("definitely-not-yt-dlp-binary");

        let result = api.search("anything", "tester").await;

        assert!(matches!(result, Err(SourceError::Provider(_))));
    }

    #[tokio::test]
    async fn plain_stream_skips_media_url_lookup() {
        let api = YoutubeApi::with_program("definitely-not-yt-dlp-binary");
        let track = Track::new("abc", "Song", "https://youtu.be/abc");

        let stream = api
            .open_stream(&track, Duration::ZERO, &FilterChain::default())
            .await
            .unwrap();

        assert_eq!(stream.media_url, None);
        assert!(stream.is_plain());
    }

    #[tokio::test]
    async fn offset_stream_needs_a_media_url() {
        let api = YoutubeApi::with_program("definitely-not-yt-dlp-binary");
        let track = Track::new("abc", "Song", "https://youtu.be/abc");

        let result = api
            .open_stream(&track, Duration::from_secs(30), &FilterChain::default())
            .await;

        assert!(matches!(result, Err(SourceError::Provider(_))));
    }
}
