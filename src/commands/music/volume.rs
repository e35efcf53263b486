use super::*;

/// Set the playback volume for this server
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn volume(
    ctx: Context<'_>,
    #[description = "Volume between 1 and 100"] level: i64,
) -> CommandResult {
    let ctx = SlashContext::new(ctx);
    let tenant = ctx.tenant()?;
    let result = ctx.music().set_volume(tenant, level).await;
    respond(&ctx, result, embedded_messages::volume_set).await
}
