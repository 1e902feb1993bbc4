use anyhow::Result;
use async_trait::async_trait;
use serenity::model::id::GuildId;
use tracing::{debug, info};

use super::{
    session::{LoopMode, Session},
    track::Track,
};
use crate::error::QueueError;

/// Servicio externo que realmente reproduce el audio (Lavalink, songbird...).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioBackend: Send + Sync {
    async fn play(&self, guild_id: GuildId, track: &Track) -> Result<()>;
    async fn stop(&self, guild_id: GuildId) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackOutcome {
    /// A new track was taken from the queue.
    Playing(Track),
    /// Loop `Track` replayed the track that just ended.
    Repeating(Track),
    /// `start` found something already playing.
    AlreadyPlaying(Track),
    /// Nothing left to play.
    Idle,
}

/// Consumidor de la cola: decide qué suena después de cada track.
pub struct PlaybackDriver<B> {
    backend: B,
}

impl<B: AudioBackend> PlaybackDriver<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Inicia la reproducción si no hay nada sonando
    pub async fn start(&self, session: &Session) -> Result<PlaybackOutcome> {
        if let Some(current) = session.now_playing() {
            return Ok(PlaybackOutcome::AlreadyPlaying(current));
        }
        self.advance(session).await
    }

    /// Called by the backend's "track ended" event.
    pub async fn on_track_end(&self, session: &Session) -> Result<PlaybackOutcome> {
        let finished = session.finish_track();

        if session.loop_mode() == LoopMode::Track {
            if let Some(track) = finished {
                info!("🔂 Repitiendo track: {}", track.title);
                self.backend.play(session.guild_id(), &track).await?;
                session.start_track(track.clone());
                return Ok(PlaybackOutcome::Repeating(track));
            }
        }

        self.advance(session).await
    }

    /// Salta al siguiente track, ignorando el loop de canción
    pub async fn skip(&self, session: &Session) -> Result<Track> {
        self.backend.stop(session.guild_id()).await?;
        if let Some(skipped) = session.finish_track() {
            debug!("⏭️ Saltado: {}", skipped.title);
        }

        match self.advance(session).await? {
            PlaybackOutcome::Playing(track) => Ok(track),
            _ => Err(QueueError::Empty.into()),
        }
    }

    /// Detiene la reproducción y limpia la cola
    pub async fn stop(&self, session: &Session) -> Result<usize> {
        self.backend.stop(session.guild_id()).await?;
        session.finish_track();
        let cleared = session.queue().clear().await;
        info!("⏹️ Reproducción detenida en guild {}", session.guild_id());
        Ok(cleared)
    }

    async fn advance(&self, session: &Session) -> Result<PlaybackOutcome> {
        let queue = session.queue();

        let looping = session.loop_mode() == LoopMode::Queue;
        if looping && queue.is_empty().await {
            queue.replay_snapshot().await;
        }

        match queue.dequeue().await {
            Some(track) => {
                info!("🎵 Reproduciendo: {} en guild {}", track.title, session.guild_id());
                self.backend.play(session.guild_id(), &track).await?;
                if looping {
                    queue.extend_snapshot(track.clone()).await;
                }
                session.start_track(track.clone());
                Ok(PlaybackOutcome::Playing(track))
            }
            None => {
                info!("📭 Cola vacía en guild {}", session.guild_id());
                Ok(PlaybackOutcome::Idle)
            }
        }
    }
}
