//! Music slash commands. Each command adapts its invocation to a
//! `CommandContext` and calls one `SessionManager` operation.

pub mod clear;
pub mod filter;
pub mod leave;
pub mod loop_mode;
pub mod now_playing;
pub mod pause;
pub mod play;
pub mod queue;
pub mod remove;
pub mod seek;
pub mod settings;
pub mod skip;
pub mod stop;
pub mod volume;

pub mod audio_sources;
pub mod utils;

use poise::CreateReply;
use tracing::debug;

use crate::{CommandResult, Context};
use utils::command_context::{CommandContext, SlashContext};
use utils::embedded_messages;
use utils::music_manager::MusicResult;

/// Render `result` with `render`, or as an error embed.
async fn respond<T>(
    ctx: &dyn CommandContext,
    result: MusicResult<T>,
    render: impl FnOnce(T) -> CreateReply + Send,
) -> CommandResult {
    let reply = match result {
        Ok(value) => render(value),
        Err(err) => {
            debug!("Music request from {} failed: {}", ctx.requester_name(), err);
            embedded_messages::music_error(&err)
        }
    };
    ctx.reply(reply).await
}
