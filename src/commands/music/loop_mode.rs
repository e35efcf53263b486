use super::*;

/// Repeat the current track, the whole queue, or nothing
#[poise::command(slash_command, guild_only, rename = "loop", category = "Music")]
pub async fn loop_mode(
    ctx: Context<'_>,
    #[description = "off, track or queue"] mode: String,
) -> CommandResult {
    let ctx = SlashContext::new(ctx);
    let tenant = ctx.tenant()?;
    let result = ctx.music().set_loop(tenant, &mode).await;
    respond(&ctx, result, embedded_messages::loop_set).await
}
