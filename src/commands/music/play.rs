use super::*;
use crate::commands::music::utils::{
    button_controls::player_buttons,
    music_manager::{MusicError, PlayOutcome},
};
use tracing::info;

/// Play a song from YouTube or a direct URL
#[poise::command(slash_command, guild_only, category = "Music")]
pub async fn play(
    ctx: Context<'_>,
    #[description = "URL or search query"] query: String,
) -> CommandResult {
    play_query(&SlashContext::new(ctx), &query).await
}

pub(crate) async fn play_query(ctx: &dyn CommandContext, query: &str) -> CommandResult {
    info!("Received play command with query: {}", query);
    let tenant = ctx.tenant()?;

    let Some(channel) = ctx.channel_ref() else {
        return ctx
            .reply(embedded_messages::music_error(&MusicError::NoChannel))
            .await;
    };

    // Searching and joining might take time
    ctx.defer().await?;

    let result = ctx
        .music()
        .play(tenant, Some(channel), query, &ctx.requester_name())
        .await;

    respond(ctx, result, |outcome| match outcome {
        PlayOutcome::Started(track) => CreateReply::default()
            .embed(embedded_messages::started(&track))
            .components(player_buttons(true)),
        PlayOutcome::Queued { track, position } => {
            CreateReply::default().embed(embedded_messages::added_to_queue(&track, position))
        }
    })
    .await
}
