//! One request shape for slash commands and player buttons, so every music
//! action has a single implementation.

use ::serenity::all::{ComponentInteraction, CreateInteractionResponseFollowup, UserId};
use poise::{CreateReply, serenity_prelude as serenity};
use serenity::async_trait;
use serenity::model::id::GuildId;

use super::music_manager::{ChannelRef, MusicError, MusicResult, SessionManager, TenantId};
use crate::{Context, Error};

#[async_trait]
pub trait CommandContext: Send + Sync {
    /// The guild the request came from.
    fn tenant(&self) -> MusicResult<TenantId>;

    fn requester_name(&self) -> String;

    /// Voice channel the requester is currently in.
    fn channel_ref(&self) -> Option<ChannelRef>;

    fn music(&self) -> &SessionManager;

    /// Acknowledge a request that may take a while.
    async fn defer(&self) -> Result<(), Error>;

    async fn reply(&self, reply: CreateReply) -> Result<(), Error>;
}

/// Look up the voice channel `user_id` is in from the cache.
fn voice_channel(ctx: &serenity::Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelRef> {
    let guild = ctx.cache.guild(guild_id)?;
    let channel = guild.voice_states.get(&user_id)?.channel_id?;
    Some(ChannelRef::from(channel))
}

/// A poise slash command invocation.
pub struct SlashContext<'a> {
    ctx: Context<'a>,
}

impl<'a> SlashContext<'a> {
    pub fn new(ctx: Context<'a>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl CommandContext for SlashContext<'_> {
    fn tenant(&self) -> MusicResult<TenantId> {
        self.ctx
            .guild_id()
            .map(TenantId::from)
            .ok_or(MusicError::NotInGuild)
    }

    fn requester_name(&self) -> String {
        self.ctx.author().name.clone()
    }

    fn channel_ref(&self) -> Option<ChannelRef> {
        let guild_id = self.ctx.guild_id()?;
        voice_channel(self.ctx.serenity_context(), guild_id, self.ctx.author().id)
    }

    fn music(&self) -> &SessionManager {
        &self.ctx.data().music
    }

    async fn defer(&self) -> Result<(), Error> {
        self.ctx.defer().await?;
        Ok(())
    }

    async fn reply(&self, reply: CreateReply) -> Result<(), Error> {
        self.ctx.send(reply).await?;
        Ok(())
    }
}

/// A click on one of the player message buttons. Replies are sent as
/// follow-ups, so the interaction must be deferred first.
pub struct ButtonContext<'a> {
    ctx: &'a serenity::Context,
    interaction: &'a ComponentInteraction,
    music: &'a SessionManager,
}

impl<'a> ButtonContext<'a> {
    pub fn new(
        ctx: &'a serenity::Context,
        interaction: &'a ComponentInteraction,
        music: &'a SessionManager,
    ) -> Self {
        Self {
            ctx,
            interaction,
            music,
        }
    }
}

#[async_trait]
impl CommandContext for ButtonContext<'_> {
    fn tenant(&self) -> MusicResult<TenantId> {
        self.interaction
            .guild_id
            .map(TenantId::from)
            .ok_or(MusicError::NotInGuild)
    }

    fn requester_name(&self) -> String {
        self.interaction.user.name.clone()
    }

    fn channel_ref(&self) -> Option<ChannelRef> {
        let guild_id = self.interaction.guild_id?;
        voice_channel(self.ctx, guild_id, self.interaction.user.id)
    }

    fn music(&self) -> &SessionManager {
        self.music
    }

    async fn defer(&self) -> Result<(), Error> {
        self.interaction.defer(&self.ctx.http).await?;
        Ok(())
    }

    async fn reply(&self, reply: CreateReply) -> Result<(), Error> {
        let mut followup = CreateInteractionResponseFollowup::new()
            .embeds(reply.embeds)
            .ephemeral(reply.ephemeral.unwrap_or(false));
        if let Some(content) = reply.content {
            followup = followup.content(content);
        }
        if let Some(components) = reply.components {
            followup = followup.components(components);
        }
        self.interaction
            .create_followup(&self.ctx.http, followup)
            .await?;
        Ok(())
    }
}
