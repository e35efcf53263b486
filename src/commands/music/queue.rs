use super::*;

/// Show the current music queue
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn queue(
    ctx: Context<'_>,
    #[description = "Page number (starts at 1)"] page: Option<usize>,
) -> CommandResult {
    let ctx = SlashContext::new(ctx);
    let tenant = ctx.tenant()?;
    let page = ctx.music().show_queue(tenant, page.unwrap_or(1)).await;

    ctx.reply(CreateReply::default().embed(embedded_messages::music_queue(&page)))
        .await
}
