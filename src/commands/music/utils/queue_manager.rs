use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::music_manager::MusicError;
use crate::commands::music::audio_sources::Track;

/// Fixed number of upcoming tracks shown per queue page.
pub const QUEUE_PAGE_SIZE: usize = 10;

/// How a finished track affects the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    #[default]
    Off,
    Track,
    Queue,
}

impl LoopMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopMode::Off => "off",
            LoopMode::Track => "track",
            LoopMode::Queue => "queue",
        }
    }
}

impl fmt::Display for LoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoopMode {
    type Err = MusicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" | "disabled" => Ok(LoopMode::Off),
            "track" | "song" | "one" => Ok(LoopMode::Track),
            "queue" | "all" => Ok(LoopMode::Queue),
            _ => Err(MusicError::InvalidMode(s.to_string())),
        }
    }
}

/// Why the current track ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// Played to the end.
    Natural,
    /// Ended early by `skip`; loop modes are bypassed.
    Skipped,
}

/// One page of the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuePage {
    pub current: Option<Track>,
    pub items: Vec<Track>,
    /// 1-based page number actually returned.
    pub page: usize,
    pub total_pages: usize,
    /// Total number of upcoming tracks, across all pages.
    pub total_tracks: usize,
    pub total_duration: Duration,
}

impl QueuePage {
    pub fn empty() -> Self {
        Self {
            current: None,
            items: Vec::new(),
            page: 1,
            total_pages: 1,
            total_tracks: 0,
            total_duration: Duration::ZERO,
        }
    }
}

/// Ordered upcoming tracks for one session.
#[derive(Debug, Default, Clone)]
pub struct TrackQueue {
    tracks: VecDeque<Track>,
}

impl TrackQueue {
    /// Create a new, empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a track. Returns its 1-based position.
    pub fn add(&mut self, track: Track) -> usize {
        self.tracks.push_back(track);
        self.tracks.len()
    }

    /// Pop the head of the queue
    pub fn next(&mut self) -> Option<Track> {
        self.tracks.pop_front()
    }

    /// Applies loop semantics to a finished track and returns what plays next.
    ///
    /// `Skipped` bypasses both re-queueing and replay.
    pub fn advance(&mut self, finished: Track, mode: LoopMode, reason: FinishReason) -> Option<Track> {
        match (reason, mode) {
            (FinishReason::Natural, LoopMode::Track) => Some(finished),
            (FinishReason::Natural, LoopMode::Queue) => {
                self.tracks.push_back(finished);
                self.next()
            }
            _ => self.next(),
        }
    }

    /// Drop every queued track. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.tracks.len();
        self.tracks.clear();
        removed
    }

    /// Remove a track at a 1-based position
    pub fn remove_track(&mut self, position: usize) -> Option<Track> {
        if position == 0 {
            return None;
        }
        self.tracks.remove(position - 1)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    /// Sum of all known durations.
    pub fn total_duration(&self) -> Duration {
        self.tracks.iter().filter_map(|track| track.duration).sum()
    }

    /// Snapshot of a 1-based page. Pages past the end clamp to the last page.
    pub fn page(&self, page: usize, current: Option<Track>) -> QueuePage {
        let total_tracks = self.tracks.len();
        let total_pages = total_tracks.div_ceil(QUEUE_PAGE_SIZE).max(1);
        let page = page.clamp(1, total_pages);

        let items = self
            .tracks
            .iter()
            .skip((page - 1) * QUEUE_PAGE_SIZE)
            .take(QUEUE_PAGE_SIZE)
            .cloned()
            .collect();

        QueuePage {
            current,
            items,
            page,
            total_pages,
            total_tracks,
            total_duration: self.total_duration(),
        }
    }
}
