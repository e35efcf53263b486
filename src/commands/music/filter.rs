use super::*;

/// Toggle an audio filter on the current track
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn filter(
    ctx: Context<'_>,
    #[description = "bassboost, nightcore or vaporwave"] name: String,
) -> CommandResult {
    let ctx = SlashContext::new(ctx);
    let tenant = ctx.tenant()?;
    ctx.defer().await?;
    let result = ctx.music().toggle_filter(tenant, &name).await;
    respond(&ctx, result, |chain| embedded_messages::filters(&chain)).await
}
