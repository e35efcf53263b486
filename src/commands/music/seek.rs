use super::*;

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum SeekChoice {
    #[name = "forward"]
    Forward,
    #[name = "backward"]
    Backward,
}

/// Jump forward or backward in the current track
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn seek(
    ctx: Context<'_>,
    #[description = "Direction"] direction: SeekChoice,
    #[description = "Number of seconds"] seconds: u64,
) -> CommandResult {
    let ctx = SlashContext::new(ctx);
    let tenant = ctx.tenant()?;
    ctx.defer().await?;

    let music = ctx.music();
    let result = match direction {
        SeekChoice::Forward => music.seek_forward(tenant, seconds).await,
        SeekChoice::Backward => music.seek_backward(tenant, seconds).await,
    };
    respond(&ctx, result, embedded_messages::seeked).await
}
