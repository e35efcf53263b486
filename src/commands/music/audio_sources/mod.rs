//! This module defines the `TrackSource` capability the session manager uses to
//! resolve queries into tracks and to (re)open playable streams, plus the
//! yt-dlp backed implementation.

/// Submodule defining the `Track` struct used across audio sources.
pub mod track_metadata;
/// Submodule implementing `TrackSource` for YouTube through `yt-dlp`.
pub mod youtube;

use serenity::async_trait;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::commands::music::utils::filters::FilterChain;
use crate::commands::music::utils::music_manager::Volume;
pub use track_metadata::Track;

/// Errors reported by a `TrackSource` implementation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("No results found")]
    NoMatches,

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Malformed provider output: {0}")]
    Malformed(String),
}

/// A specialized `Result` type for operations within the `audio_sources` module.
pub type AudioSourceResult<T> = Result<T, SourceError>;

/// Descriptor of an audio stream ready to be pushed to a transport connection.
///
/// The source fills in where the audio comes from, the start offset and the
/// filter chain; the session stamps the volume before handing it over.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamHandle {
    pub track_id: String,
    pub source_ref: String,
    /// Direct media URL, when the provider resolved one. Needed for offset and
    /// filtered playback.
    pub media_url: Option<String>,
    /// Media-time offset the stream starts at.
    pub offset: Duration,
    pub filters: FilterChain,
    pub volume: Volume,
}

impl StreamHandle {
    pub fn new(track: &Track, offset: Duration) -> Self {
        Self {
            track_id: track.id.clone(),
            source_ref: track.source_ref.clone(),
            media_url: None,
            offset,
            filters: FilterChain::default(),
            volume: Volume::default(),
        }
    }

    pub fn with_media_url(mut self, media_url: impl Into<String>) -> Self {
        self.media_url = Some(media_url.into());
        self
    }

    pub fn with_filters(mut self, filters: FilterChain) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_volume(mut self, volume: Volume) -> Self {
        self.volume = volume;
        self
    }

    /// True when the stream can be played straight from its source reference.
    pub fn is_plain(&self) -> bool {
        self.offset.is_zero() && self.filters.is_empty()
    }
}

/// Capability that resolves queries to tracks and opens playable streams.
///
/// Requires `Send + Sync` to be shared by every tenant's session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrackSource: Send + Sync {
    /// Resolves a URL or free-text query. An empty result is reported as
    /// `SourceError::NoMatches` by well-behaved implementations, but callers
    /// treat an empty `Vec` the same way.
    async fn search(&self, query: &str, requested_by: &str) -> AudioSourceResult<Vec<Track>>;

    /// Opens `track` starting at `offset` (media time) with `filters` applied.
    async fn open_stream(
        &self,
        track: &Track,
        offset: Duration,
        filters: &FilterChain,
    ) -> AudioSourceResult<StreamHandle>;

    /// Whether `open_stream` honours non-zero offsets.
    fn supports_seek(&self) -> bool {
        true
    }
}

/// A utility struct providing general helper functions related to audio sources.
pub struct AudioSource;

impl AudioSource {
    /// Performs a basic check if the input string can be parsed as a URL.
    /// Does not validate if the URL is actually reachable or supported by any specific API.
    pub fn is_url(input: &str) -> bool {
        Url::parse(input).is_ok()
    }
}
