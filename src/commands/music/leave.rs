use super::*;

/// Leave the voice channel
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn leave(ctx: Context<'_>) -> CommandResult {
    let ctx = SlashContext::new(ctx);
    let tenant = ctx.tenant()?;
    let result = ctx.music().disconnect(tenant).await;
    respond(&ctx, result, |()| embedded_messages::left()).await
}
