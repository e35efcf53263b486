use super::*;

/// Show this server's stored music settings
#[poise::command(slash_command, guild_only, rename = "musicconfig", category = "Music")]
pub async fn music_config(ctx: Context<'_>) -> CommandResult {
    let ctx = SlashContext::new(ctx);
    let tenant = ctx.tenant()?;
    let result = ctx.music().get_server_config(tenant).await;
    respond(&ctx, result, |settings| embedded_messages::server_config(&settings)).await
}
