use super::*;

/// Show the current track with player controls
#[poise::command(slash_command, guild_only, rename = "nowplaying", category = "Music")]
pub async fn now_playing(ctx: Context<'_>) -> CommandResult {
    let ctx = SlashContext::new(ctx);
    let tenant = ctx.tenant()?;
    let result = ctx.music().now_playing(tenant).await;
    respond(&ctx, result, |now| embedded_messages::player(&now)).await
}
