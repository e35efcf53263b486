use ::serenity::all::ClientBuilder;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::env;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rusty_jukebox::{CommandResult, Context, Data, Error, utils};

#[poise::command(slash_command, category = "General")]
async fn help(
    ctx: Context<'_>,
    #[description = "Specific command to show help about"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> CommandResult {
    poise::builtins::help(
        ctx,
        command.as_deref(),
        poise::builtins::HelpConfiguration {
            show_context_menu_commands: true,
            ..Default::default()
        },
    )
    .await
    .map_err(|e| e.into())
}

#[poise::command(prefix_command, hide_in_help)]
async fn register(ctx: Context<'_>) -> Result<(), Error> {
    poise::builtins::register_application_commands_buttons(ctx)
        .await
        .map_err(|e| e.into())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize logging with debug level for our crate
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rusty_jukebox=debug,warn")),
        )
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true)
        .with_ansi(true)
        .pretty()
        .init();

    dotenv().ok();

    let config = utils::config::MusicConfig::from_env();

    // Initialize the SQLite database
    if let Err(e) = utils::database::init_db(&config.database_path) {
        error!("Failed to initialize database: {}", e);
    }

    let token = env::var("DISCORD_TOKEN").map_err(|_| "Missing DISCORD_TOKEN")?;

    let intents = serenity::GatewayIntents::non_privileged()
        | serenity::GatewayIntents::GUILD_VOICE_STATES;

    // Create a vector to hold our commands
    let mut commands = vec![
        // Default commands
        register(),
        help(),
    ];

    // Handle Music feature
    #[cfg(feature = "music")]
    let (songbird, music) = {
        use rusty_jukebox::commands::music::{
            audio_sources::youtube::YoutubeApi,
            clear::*,
            filter::*,
            leave::*,
            loop_mode::*,
            now_playing::*,
            pause::*,
            play::*,
            queue::*,
            remove::*,
            seek::*,
            settings::*,
            skip::*,
            stop::*,
            utils::{
                guild_settings::SqliteSettingsStore,
                music_manager::{Collaborators, SessionManager},
                songbird_transport::SongbirdTransport,
            },
            volume::*,
        };
        use std::sync::Arc;

        // Add music commands
        commands.extend(vec![
            play(),
            pause(),
            resume(),
            skip(),
            stop(),
            leave(),
            queue(),
            remove(),
            clear(),
            now_playing(),
            volume(),
            loop_mode(),
            filter(),
            seek(),
            music_config(),
        ]);

        let songbird = songbird::Songbird::serenity();
        let music = SessionManager::new(Collaborators {
            source: Arc::new(YoutubeApi::default()),
            transport: Arc::new(SongbirdTransport::new(Arc::clone(&songbird))),
            store: Arc::new(SqliteSettingsStore::open(&config.database_path)?),
            config,
        });

        (songbird, music)
    };

    #[cfg(feature = "music")]
    let data_music = music.clone();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands,
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(Data {
                    #[cfg(feature = "music")]
                    music: data_music,
                })
            })
        });

    let client_builder = ClientBuilder::new(token, intents).framework(framework.build());

    // Create and run client
    #[cfg(feature = "music")]
    {
        use rusty_jukebox::events::Handler;
        use songbird::SerenityInit;

        let client_builder = client_builder
            .event_handler(Handler {
                music: music.clone(),
            })
            .register_songbird_with(songbird);
        build_and_start_client(client_builder, move || async move { music.shutdown().await })
            .await
    }

    #[cfg(not(feature = "music"))]
    {
        let _ = config;
        build_and_start_client(client_builder, || async {}).await
    }
}

/// Run the client until it stops or Ctrl-C is pressed. `cleanup` runs before
/// the shards are shut down.
async fn build_and_start_client<F, Fut>(client_builder: ClientBuilder, cleanup: F) -> Result<(), Error>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    let mut client = client_builder.await?;
    let shard_manager = client.shard_manager.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C, shutting down");
            cleanup().await;
            shard_manager.shutdown_all().await;
        }
    });

    client.start().await.map_err(Into::into)
}
