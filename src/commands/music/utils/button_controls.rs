use serenity::all::{ButtonStyle, CreateActionRow, CreateButton, ReactionType};

pub const PLAY_PAUSE: &str = "music_play_pause";
pub const STOP: &str = "music_stop";
pub const SKIP: &str = "music_skip";

/// Creates the player control row for the current playback state
pub fn player_buttons(is_playing: bool) -> Vec<CreateActionRow> {
    let play_pause = CreateButton::new(PLAY_PAUSE)
        .emoji(ReactionType::Unicode(
            if is_playing { "⏸️" } else { "▶️" }.to_string(),
        ))
        .style(ButtonStyle::Primary)
        .label(if is_playing { "Pause" } else { "Resume" });

    let stop = CreateButton::new(STOP)
        .emoji(ReactionType::Unicode("⏹️".to_string()))
        .style(ButtonStyle::Danger)
        .label("Stop");

    let skip = CreateButton::new(SKIP)
        .emoji(ReactionType::Unicode("⏭️".to_string()))
        .style(ButtonStyle::Secondary)
        .label("Skip");

    vec![CreateActionRow::Buttons(vec![play_pause, stop, skip])]
}
