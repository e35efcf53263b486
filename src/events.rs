use serenity::all::{ChannelId, ComponentInteraction, GuildId, UserId, VoiceState};
use serenity::async_trait;
use serenity::model::application::Interaction;
use serenity::prelude::*;
use tracing::{debug, error};

use crate::commands::music::utils::component_handlers;
use crate::commands::music::utils::music_manager::{SessionManager, TenantId};

/// Gateway events the framework does not route: player buttons and voice
/// state changes.
pub struct Handler {
    pub music: SessionManager,
}

#[async_trait]
impl serenity::prelude::EventHandler for Handler {
    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Component(component) = interaction {
            if component.data.custom_id.starts_with("music_") {
                self.music_component_interaction(&ctx, &component).await;
            }
        }
    }

    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let Some(guild_id) = new.guild_id else {
            return;
        };

        let bot_id = ctx.cache.current_user().id;
        let Some(bot_channel) = bot_channel(&ctx, guild_id, bot_id) else {
            return;
        };

        // Only changes that touch the bot's channel matter
        let left = old.as_ref().and_then(|state| state.channel_id) == Some(bot_channel);
        let joined = new.channel_id == Some(bot_channel);
        if !left && !joined {
            return;
        }

        let tenant = TenantId::from(guild_id);
        match listeners(&ctx, guild_id, bot_channel) {
            0 => {
                debug!("Voice channel {} in guild {} is empty", bot_channel, guild_id);
                self.music.channel_emptied(tenant).await;
            }
            _ if joined => self.music.channel_occupied(tenant).await,
            _ => {}
        }
    }
}

impl Handler {
    /// Handle component interactions for components with identities starting with "music_"
    async fn music_component_interaction(&self, ctx: &Context, component: &ComponentInteraction) {
        if let Err(e) = component_handlers::handle_interaction(ctx, component, &self.music).await {
            error!("Error handling component interaction: {}", e);
        }
    }
}

fn bot_channel(ctx: &Context, guild_id: GuildId, bot_id: UserId) -> Option<ChannelId> {
    let guild = ctx.cache.guild(guild_id)?;
    let channel = guild.voice_states.get(&bot_id)?.channel_id;
    channel
}

/// Number of non-bot users in `channel`.
fn listeners(ctx: &Context, guild_id: GuildId, channel: ChannelId) -> usize {
    let Some(guild) = ctx.cache.guild(guild_id) else {
        return 0;
    };

    let count = guild
        .voice_states
        .values()
        .filter(|state| state.channel_id == Some(channel))
        .filter(|state| {
            let is_bot = state
                .member
                .as_ref()
                .map(|member| member.user.bot)
                .or_else(|| ctx.cache.user(state.user_id).map(|user| user.bot))
                .unwrap_or(false);
            !is_bot
        })
        .count();
    count
}
