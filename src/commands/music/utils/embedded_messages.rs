use poise::CreateReply;
use poise::serenity_prelude::{CreateEmbed, CreateEmbedFooter};
use std::time::Duration;

use super::button_controls::player_buttons;
use super::filters::FilterChain;
use super::format_duration;
use super::guild_settings::TenantSettings;
use super::music_manager::{MusicError, SkipOutcome, Volume};
use super::queue_manager::{LoopMode, QUEUE_PAGE_SIZE, QueuePage};
use super::session::{NowPlaying, PlaybackState};
use crate::commands::music::audio_sources::Track;

const SUCCESS: u32 = 0x00ff00;
const FAILURE: u32 = 0xff0000;

/// Create a progress bar for the current track
fn format_progress_bar(position: Duration, total: Duration) -> String {
    const BAR_LENGTH: usize = 15;
    let progress = if total.as_secs() == 0 {
        0.0
    } else {
        (position.as_secs_f64() / total.as_secs_f64()).min(1.0)
    };

    let filled = (progress * BAR_LENGTH as f64).round() as usize;
    let empty = BAR_LENGTH - filled;

    format!("▬{}🔘{}▬", "▬".repeat(filled), "▬".repeat(empty))
}

fn link(track: &Track) -> String {
    format!("[{}]({})", track.title, track.source_ref)
}

fn duration_str(track: &Track) -> String {
    track
        .duration
        .map(format_duration)
        .unwrap_or_else(|| "Live".to_string())
}

fn success(title: &str, description: impl Into<String>) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title(title)
            .description(description)
            .color(SUCCESS),
    )
}

/// Create an embed for a track that started playing right away
pub fn started(track: &Track) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .title("🎵 Now Playing")
        .description(link(track))
        .field("Duration", format!("`{}`", duration_str(track)), true)
        .color(SUCCESS);
    if let Some(requester) = &track.requested_by {
        embed = embed.field("Requested by", requester, true);
    }
    if let Some(thumbnail) = &track.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }
    embed
}

/// Create an embed for when a song is added to the queue
pub fn added_to_queue(track: &Track, position: usize) -> CreateEmbed {
    CreateEmbed::new()
        .title("🎵 Added to Queue")
        .description(link(track))
        .field("Duration", format!("`{}`", duration_str(track)), true)
        .field("Position", format!("`#{}`", position), true)
        .color(SUCCESS)
}

/// The player message: current track, progress and session settings, with
/// control buttons.
pub fn player(now: &NowPlaying) -> CreateReply {
    let mut description = format!("**{}**\n", link(&now.track));
    if let Some(duration) = now.track.duration {
        description.push_str(&format!(
            "{} `{}/{}`",
            format_progress_bar(now.position, duration),
            format_duration(now.position),
            format_duration(duration)
        ));
    }

    let title = match now.state {
        PlaybackState::Paused => "⏸️ Paused",
        _ => "🎵 Now Playing",
    };

    let embed = CreateEmbed::new()
        .title(title)
        .description(description)
        .field("Volume", format!("`{}`", now.volume), true)
        .field("Loop", format!("`{}`", now.loop_mode), true)
        .field("Filters", format!("`{}`", now.filters), true)
        .field("Up next", format!("`{}` track(s)", now.upcoming), true)
        .color(SUCCESS);

    CreateReply::default()
        .embed(embed)
        .components(player_buttons(now.state == PlaybackState::Playing))
}

/// Create an embed for one page of the music queue
pub fn music_queue(page: &QueuePage) -> CreateEmbed {
    let mut description = String::new();

    match &page.current {
        Some(track) => {
            description.push_str("**🎵 Now Playing**\n");
            description.push_str(&format!("**{}** `{}`\n\n", link(track), duration_str(track)));
        }
        None => description.push_str("**🔇 Nothing playing**\n\n"),
    }

    if page.items.is_empty() {
        description.push_str("**📭 Queue is empty**");
    } else {
        description.push_str(&format!("**📋 Queue - {} tracks**\n", page.total_tracks));
        let first = (page.page - 1) * QUEUE_PAGE_SIZE + 1;
        for (offset, track) in page.items.iter().enumerate() {
            description.push_str(&format!(
                "`{}.` {} `{}`\n",
                first + offset,
                link(track),
                duration_str(track)
            ));
        }

        if !page.total_duration.is_zero() {
            description.push_str(&format!(
                "\n**⏱️ Total Duration:** `{}`",
                format_duration(page.total_duration)
            ));
        }
    }

    CreateEmbed::new()
        .title("🎵 Music Queue")
        .description(description)
        .footer(CreateEmbedFooter::new(format!(
            "Page {}/{}",
            page.page, page.total_pages
        )))
        .color(SUCCESS)
}

/// Create an embed for when a track is paused
pub fn paused(track: &Track) -> CreateReply {
    success("⏸️ Paused", format!("Paused {}", link(track)))
}

/// Create an embed for when a track is resumed
pub fn resumed(track: &Track) -> CreateReply {
    success("▶️ Resumed", format!("Resumed {}", link(track)))
}

pub fn skipped(outcome: &SkipOutcome) -> CreateReply {
    let description = match &outcome.next {
        Some(next) => format!("Skipped {}\nNow playing {}", link(&outcome.skipped), link(next)),
        None => format!(
            "Skipped {}\nThe queue is empty, leaving the voice channel",
            link(&outcome.skipped)
        ),
    };
    success("⏭️ Skipped", description)
}

pub fn stopped() -> CreateReply {
    success("⏹️ Stopped", "Cleared the queue and left the voice channel")
}

pub fn left() -> CreateReply {
    success("👋 Left", "Left the voice channel")
}

pub fn volume_set(volume: Volume) -> CreateReply {
    success("🔊 Volume", format!("Volume set to `{}`", volume))
}

pub fn loop_set(mode: LoopMode) -> CreateReply {
    let description = match mode {
        LoopMode::Off => "Looping is off".to_string(),
        LoopMode::Track => "Repeating the current track".to_string(),
        LoopMode::Queue => "Repeating the whole queue".to_string(),
    };
    success("🔁 Loop", description)
}

pub fn filters(chain: &FilterChain) -> CreateReply {
    success("🎛️ Filters", format!("Active filters: `{}`", chain))
}

pub fn seeked(position: Duration) -> CreateReply {
    success("⏩ Seek", format!("Jumped to `{}`", format_duration(position)))
}

pub fn removed(track: &Track) -> CreateReply {
    success("🗑️ Removed", format!("Removed {} from the queue", link(track)))
}

pub fn cleared(count: usize) -> CreateReply {
    success("🧹 Cleared", format!("Removed `{}` track(s) from the queue", count))
}

pub fn server_config(settings: &TenantSettings) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title("⚙️ Music Settings")
            .field("Volume", format!("`{}`", settings.volume), true)
            .field("Loop", format!("`{}`", settings.loop_mode), true)
            .color(SUCCESS),
    )
}

/// Create an error reply. Input and state errors are only shown to the caller.
pub fn music_error(err: &MusicError) -> CreateReply {
    let ephemeral = !matches!(
        err,
        MusicError::TransportDenied(_) | MusicError::CollaboratorTimeout(_)
    );

    CreateReply::default()
        .embed(
            CreateEmbed::new()
                .title("❌ Error")
                .description(err.to_string())
                .color(FAILURE),
        )
        .ephemeral(ephemeral)
}

/// Create an error reply from free text
pub fn generic_error(message: &str) -> CreateReply {
    CreateReply::default()
        .embed(
            CreateEmbed::new()
                .title("❌ Error")
                .description(message)
                .color(FAILURE),
        )
        .ephemeral(true)
}
