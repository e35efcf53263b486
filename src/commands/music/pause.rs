use super::*;
use crate::commands::music::utils::session::PlaybackState;

/// Pause the current track
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn pause(ctx: Context<'_>) -> CommandResult {
    pause_playback(&SlashContext::new(ctx)).await
}

/// Resume the paused track
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn resume(ctx: Context<'_>) -> CommandResult {
    resume_playback(&SlashContext::new(ctx)).await
}

pub(crate) async fn pause_playback(ctx: &dyn CommandContext) -> CommandResult {
    let tenant = ctx.tenant()?;
    let result = ctx.music().pause(tenant).await;
    respond(ctx, result, |track| embedded_messages::paused(&track)).await
}

pub(crate) async fn resume_playback(ctx: &dyn CommandContext) -> CommandResult {
    let tenant = ctx.tenant()?;
    let result = ctx.music().resume(tenant).await;
    respond(ctx, result, |track| embedded_messages::resumed(&track)).await
}

/// Pause when playing, resume when paused (player button).
pub(crate) async fn toggle_playback(ctx: &dyn CommandContext) -> CommandResult {
    let tenant = ctx.tenant()?;
    let paused = matches!(
        ctx.music().now_playing(tenant).await,
        Ok(now) if now.state == PlaybackState::Paused
    );

    if paused {
        resume_playback(ctx).await
    } else {
        pause_playback(ctx).await
    }
}
