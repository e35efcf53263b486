use super::*;

/// Remove a track from the queue by its position
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Position of the track to remove (1-based)"] position: usize,
) -> CommandResult {
    let ctx = SlashContext::new(ctx);
    let tenant = ctx.tenant()?;
    let result = ctx.music().remove(tenant, position).await;
    respond(&ctx, result, |track| embedded_messages::removed(&track)).await
}
