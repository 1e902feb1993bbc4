//! # Bot Module
//!
//! Discord-facing glue for KazeBeats.
//!
//! The bot owns the [`SessionRegistry`] and keeps it in step with the
//! gateway: a session is dropped as soon as the bot leaves voice in that
//! guild, and a background task closes sessions that have sat idle for
//! longer than the configured auto-disconnect timeout.
//!
//! Command parsing and audio transport live outside this crate; they reach
//! the queue through [`SessionRegistry::get_or_create`] and
//! [`crate::audio::driver::PlaybackDriver`].

use serenity::{
    all::{ChannelId, Context, EventHandler, GuildId, Ready, UserId, VoiceState},
    async_trait,
};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tracing::info;

use crate::{audio::session::SessionRegistry, config::Config};

/// Main Discord event handler.
///
/// ## Fields
///
/// - `config`: Bot configuration (limits, timeouts)
/// - `sessions`: Active playback sessions, one per guild
pub struct KazeBeatsBot {
    config: Arc<Config>,
    sessions: Arc<SessionRegistry>,
    maintenance_started: AtomicBool,
}

impl KazeBeatsBot {
    pub fn new(config: Config, sessions: Arc<SessionRegistry>) -> Self {
        Self {
            config: Arc::new(config),
            sessions,
            maintenance_started: AtomicBool::new(false),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }
}

#[async_trait]
impl EventHandler for KazeBeatsBot {
    /// Logs the connection and starts the maintenance task once.
    ///
    /// `ready` fires again after every gateway reconnect, so the task is
    /// guarded by a flag.
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if self.maintenance_started.swap(true, Ordering::SeqCst) {
            return;
        }

        let sessions = Arc::clone(&self.sessions);
        let timeout = self.config.auto_disconnect_timeout();
        tokio::spawn(async move {
            maintenance_tasks(sessions, timeout).await;
        });
    }

    /// Cierra la sesión cuando el bot sale del canal de voz
    async fn voice_state_update(&self, ctx: Context, _old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;

        if let Some(guild_id) = bot_left_voice(current_user_id, new.user_id, new.guild_id, new.channel_id) {
            info!("🔌 Bot desconectado en guild {}", guild_id);
            self.sessions.destroy(guild_id);
        }
    }
}

/// The guild whose session must end, if this voice update is the bot
/// leaving its channel.
fn bot_left_voice(
    bot_id: UserId,
    user_id: UserId,
    guild_id: Option<GuildId>,
    channel_id: Option<ChannelId>,
) -> Option<GuildId> {
    if user_id == bot_id && channel_id.is_none() {
        guild_id
    } else {
        None
    }
}

/// Closes idle sessions.
///
/// Checks every `timeout / 4` (at least once a second) so a session is
/// dropped at most a quarter of the timeout after it became eligible.
async fn maintenance_tasks(sessions: Arc<SessionRegistry>, timeout: Duration) {
    let period = (timeout / 4).max(Duration::from_secs(1));
    let mut interval = tokio::time::interval(period);

    loop {
        interval.tick().await;

        let reaped = sessions.reap_idle(timeout);
        if !reaped.is_empty() {
            info!("🧹 {} sesiones inactivas cerradas", reaped.len());
        }
    }
}
