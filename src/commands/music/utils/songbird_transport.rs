//! `Transport` backed by songbird voice connections.
//!
//! Plain streams go through songbird's own `YoutubeDl` input. Streams with an
//! offset or active filters are decoded by an `ffmpeg` child that seeks the
//! resolved media URL and applies the filter chain.

use poise::serenity_prelude as serenity;
use serenity::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use songbird::error::JoinError;
use songbird::input::{ChildContainer, Input, YoutubeDl};
use songbird::tracks::TrackHandle;
use songbird::{Call, CoreEvent, Event, Songbird, TrackEvent};
use std::process::{Command, Stdio};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::event_handlers::{DriverNotifier, TrackEndNotifier};
use super::music_manager::{ChannelRef, TenantId, Volume};
use super::transport::{Connection, EventSink, Transport, TransportError, TransportEvent};
use crate::commands::music::audio_sources::StreamHandle;

pub struct SongbirdTransport {
    manager: Arc<Songbird>,
    http: reqwest::Client,
    ffmpeg: String,
}

impl SongbirdTransport {
    pub fn new(manager: Arc<Songbird>) -> Self {
        Self {
            manager,
            http: reqwest::Client::new(),
            ffmpeg: "ffmpeg".to_string(),
        }
    }
}

#[async_trait]
impl Transport for SongbirdTransport {
    async fn connect(
        &self,
        tenant: TenantId,
        channel: ChannelRef,
        events: EventSink,
    ) -> Result<Box<dyn Connection>, TransportError> {
        let guild_id = GuildId::new(tenant.0);
        let channel_id = ChannelId::new(channel.0);

        let call = self
            .manager
            .join(guild_id, channel_id)
            .await
            .map_err(|e| TransportError::Denied(e.to_string()))?;

        {
            let mut handler = call.lock().await;
            handler.remove_all_global_events();
            for event in [
                CoreEvent::DriverConnect,
                CoreEvent::DriverReconnect,
                CoreEvent::DriverDisconnect,
            ] {
                handler.add_global_event(
                    Event::Core(event),
                    DriverNotifier {
                        events: events.clone(),
                    },
                );
            }
        }

        info!("Joined voice channel {} in guild {}", channel, tenant);
        events.report(TransportEvent::Ready);

        Ok(Box::new(SongbirdConnection {
            manager: Arc::clone(&self.manager),
            guild_id,
            call,
            events,
            http: self.http.clone(),
            ffmpeg: self.ffmpeg.clone(),
            current: None,
        }))
    }
}

struct SongbirdConnection {
    manager: Arc<Songbird>,
    guild_id: GuildId,
    call: Arc<Mutex<Call>>,
    events: EventSink,
    http: reqwest::Client,
    ffmpeg: String,
    current: Option<TrackHandle>,
}

impl SongbirdConnection {
    fn input_for(&self, stream: &StreamHandle) -> Result<Input, TransportError> {
        let media_url = match (&stream.media_url, stream.is_plain()) {
            (Some(url), false) => url,
            (None, false) => {
                warn!(
                    "No media URL for {} in guild {}, playing from the start without filters",
                    stream.track_id, self.guild_id
                );
                return Ok(YoutubeDl::new(self.http.clone(), stream.source_ref.clone()).into());
            }
            (_, true) => {
                return Ok(YoutubeDl::new(self.http.clone(), stream.source_ref.clone()).into());
            }
        };

        let mut command = Command::new(&self.ffmpeg);
        command.args([
            "-hide_banner",
            "-loglevel",
            "error",
            "-reconnect",
            "1",
            "-reconnect_streamed",
            "1",
            "-reconnect_delay_max",
            "5",
        ]);
        if !stream.offset.is_zero() {
            command
                .arg("-ss")
                .arg(format!("{:.3}", stream.offset.as_secs_f64()));
        }
        command.arg("-i").arg(media_url);
        if let Some(filter) = stream.filters.ffmpeg_filter() {
            command.arg("-af").arg(filter);
        }
        command
            .args(["-vn", "-f", "mp3", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        debug!(
            "Spawning ffmpeg for {} at {:?} with filters [{}]",
            stream.track_id, stream.offset, stream.filters
        );
        let child = command
            .spawn()
            .map_err(|e| TransportError::Failed(format!("Failed to spawn {}: {}", self.ffmpeg, e)))?;

        Ok(ChildContainer::from(child).into())
    }

    fn track(&self) -> Result<&TrackHandle, TransportError> {
        self.current.as_ref().ok_or(TransportError::Closed)
    }
}

fn failed(err: impl std::fmt::Display) -> TransportError {
    TransportError::Failed(err.to_string())
}

#[async_trait]
impl Connection for SongbirdConnection {
    async fn push(&mut self, stream: StreamHandle, generation: u64) -> Result<(), TransportError> {
        let input = self.input_for(&stream)?;

        let handle = {
            let mut call = self.call.lock().await;
            call.play_only_input(input)
        };

        handle.set_volume(stream.volume.gain()).map_err(failed)?;
        for event in [TrackEvent::End, TrackEvent::Error] {
            handle
                .add_event(
                    Event::Track(event),
                    TrackEndNotifier {
                        events: self.events.clone(),
                        generation,
                    },
                )
                .map_err(failed)?;
        }

        self.current = Some(handle);
        Ok(())
    }

    async fn pause(&mut self) -> Result<(), TransportError> {
        self.track()?
            .pause()
            .map_err(failed)
    }

    async fn resume(&mut self) -> Result<(), TransportError> {
        self.track()?
            .play()
            .map_err(failed)
    }

    async fn set_volume(&mut self, volume: Volume) -> Result<(), TransportError> {
        match &self.current {
            Some(track) => track
                .set_volume(volume.gain())
                .map_err(failed),
            None => Ok(()),
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(track) = self.current.take() {
            let _ = track.stop();
        }
        self.call.lock().await.remove_all_global_events();

        match self.manager.remove(self.guild_id).await {
            Ok(()) | Err(JoinError::NoCall) => {
                info!("Left voice channel in guild {}", self.guild_id);
                Ok(())
            }
            Err(e) => Err(failed(e)),
        }
    }
}
