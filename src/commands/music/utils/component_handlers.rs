use ::serenity::all::ComponentInteraction;
use poise::serenity_prelude::{self as serenity, Context};
use tracing::{debug, error};

use super::button_controls::{PLAY_PAUSE, SKIP, STOP};
use super::command_context::ButtonContext;
use super::music_manager::SessionManager;
use crate::commands::music::{pause::toggle_playback, skip::skip_track, stop::stop_playback};

type ButtonInteractionResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Handle a click on one of the player buttons
pub async fn handle_interaction(
    ctx: &Context,
    interaction: &ComponentInteraction,
    music: &SessionManager,
) -> ButtonInteractionResult {
    // Defer the interaction response immediately
    interaction.defer(&ctx.http).await?;

    debug!(
        "Button {} pressed by {}",
        interaction.data.custom_id, interaction.user.name
    );

    let button = ButtonContext::new(ctx, interaction, music);
    match interaction.data.custom_id.as_str() {
        PLAY_PAUSE => toggle_playback(&button).await,
        SKIP => skip_track(&button).await,
        STOP => stop_playback(&button).await,
        _ => {
            error!("Unknown button ID: {}", interaction.data.custom_id);
            error_followup(ctx, interaction, "Unknown button action.").await
        }
    }
}

/// Send an ephemeral error followup message for failed interactions
async fn error_followup(
    ctx: &Context,
    interaction: &ComponentInteraction,
    content: &str,
) -> ButtonInteractionResult {
    interaction
        .create_followup(
            &ctx.http,
            serenity::CreateInteractionResponseFollowup::new()
                .content(content)
                .ephemeral(true),
        )
        .await?;
    Ok(())
}
