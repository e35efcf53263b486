//! A Discord jukebox: one playback session per guild, driven by slash commands
//! and player buttons.

pub mod commands;
#[cfg(feature = "music")]
pub mod events;
pub mod utils;

#[cfg(feature = "music")]
use commands::music::utils::music_manager::SessionManager;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
pub type CommandResult = Result<(), Error>;

// User data, which is stored and accessible in all command invocations
pub struct Data {
    #[cfg(feature = "music")]
    pub music: SessionManager,
}
