use super::*;

/// Stop the music, clear the queue and leave the voice channel
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn stop(ctx: Context<'_>) -> CommandResult {
    stop_playback(&SlashContext::new(ctx)).await
}

pub(crate) async fn stop_playback(ctx: &dyn CommandContext) -> CommandResult {
    let tenant = ctx.tenant()?;
    let result = ctx.music().stop(tenant).await;
    respond(ctx, result, |()| embedded_messages::stopped()).await
}
