use super::*;

/// Skip the currently playing song
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn skip(ctx: Context<'_>) -> CommandResult {
    skip_track(&SlashContext::new(ctx)).await
}

pub(crate) async fn skip_track(ctx: &dyn CommandContext) -> CommandResult {
    let tenant = ctx.tenant()?;
    let result = ctx.music().skip(tenant).await;
    respond(ctx, result, |outcome| embedded_messages::skipped(&outcome)).await
}
