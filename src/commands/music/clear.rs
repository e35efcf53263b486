use super::*;

/// Remove every upcoming track from the queue
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn clear(ctx: Context<'_>) -> CommandResult {
    let ctx = SlashContext::new(ctx);
    let tenant = ctx.tenant()?;
    let result = ctx.music().clear_queue(tenant).await;
    respond(&ctx, result, embedded_messages::cleared).await
}
