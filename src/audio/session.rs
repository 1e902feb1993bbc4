use anyhow::Result;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serenity::model::id::{GuildId, UserId};
use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
    time::Duration,
};
use tracing::info;

use super::{queue::QueueManager, track::Track};
use crate::{config::Config, error::QueueError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    #[default]
    Off,
    Track,
    Queue,
}

impl LoopMode {
    /// Off -> Track -> Queue -> Off
    pub fn next(self) -> Self {
        match self {
            LoopMode::Off => LoopMode::Track,
            LoopMode::Track => LoopMode::Queue,
            LoopMode::Queue => LoopMode::Off,
        }
    }
}

impl fmt::Display for LoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopMode::Off => "Off",
            LoopMode::Track => "Track",
            LoopMode::Queue => "Queue",
        };
        f.write_str(name)
    }
}

/// Contadores de la sesión actual
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStats {
    pub songs_played: u64,
    pub total_played: Duration,
    pub most_played: HashMap<String, u32>,
}

impl SessionStats {
    fn record(&mut self, track: &Track) {
        self.songs_played += 1;
        self.total_played += track.duration;
        *self.most_played.entry(track.title.clone()).or_insert(0) += 1;
    }

    /// Most played title; ties go to the alphabetically first title.
    pub fn top_track(&self) -> Option<(&str, u32)> {
        self.most_played
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(title, count)| (title.as_str(), *count))
    }
}

/// Límites aplicados a cada sesión nueva
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_queue_size: usize,
    pub max_playlist_size: usize,
    pub max_song_duration: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for SessionLimits {
    fn from(config: &Config) -> Self {
        Self {
            max_queue_size: config.max_queue_size,
            max_playlist_size: config.max_playlist_size,
            max_song_duration: config.max_song_duration(),
        }
    }
}

/// Resultado de un voto para saltar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipVote {
    /// The vote passed (or came from the requester); skip now.
    Skip,
    /// Still waiting for more votes.
    Pending { votes: usize, required: usize },
}

/// Estado de reproducción de una guild.
///
/// One session exists per active voice connection and owns exactly one
/// [`QueueManager`]. The small mutable fields live behind `parking_lot`
/// locks that are never held across an `.await`.
#[derive(Debug)]
pub struct Session {
    guild_id: GuildId,
    queue: QueueManager,
    limits: SessionLimits,
    loop_mode: RwLock<LoopMode>,
    now_playing: Mutex<Option<Track>>,
    stats: Mutex<SessionStats>,
    skip_votes: Mutex<HashSet<UserId>>,
    started_at: DateTime<Utc>,
    last_activity: Mutex<DateTime<Utc>>,
}

impl Session {
    pub fn new(guild_id: GuildId, limits: SessionLimits) -> Self {
        let now = Utc::now();
        Self {
            guild_id,
            queue: QueueManager::new(limits.max_queue_size),
            limits,
            loop_mode: RwLock::new(LoopMode::Off),
            now_playing: Mutex::new(None),
            stats: Mutex::new(SessionStats::default()),
            skip_votes: Mutex::new(HashSet::new()),
            started_at: now,
            last_activity: Mutex::new(now),
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn queue(&self) -> &QueueManager {
        &self.queue
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    fn touch(&self) {
        *self.last_activity.lock() = Utc::now();
    }

    /// Nothing playing, nothing queued, and no activity for `timeout`.
    ///
    /// Never blocks: a queue that is busy with another operation counts as
    /// active.
    pub fn is_idle(&self, timeout: Duration) -> bool {
        let playing = self.now_playing.lock().is_some();
        if playing {
            return false;
        }
        let last_activity = *self.last_activity.lock();
        let inactive = (Utc::now() - last_activity).to_std().unwrap_or_default();
        inactive >= timeout && self.queue.try_is_empty().unwrap_or(false)
    }

    pub fn loop_mode(&self) -> LoopMode {
        *self.loop_mode.read()
    }

    /// Cambia el modo de loop.
    ///
    /// Entering `Queue` starts a loop pass seeded with the current track.
    /// Every track played while looping joins the pass, so the cycle covers
    /// the current track, the queue, and anything added later. Any other
    /// mode drops the snapshot.
    pub async fn set_loop_mode(&self, mode: LoopMode) {
        if mode == LoopMode::Queue {
            if self.loop_mode() != LoopMode::Queue {
                let seed: Vec<Track> = self.now_playing().into_iter().collect();
                self.queue.begin_loop_snapshot(seed).await;
            }
        } else {
            self.queue.clear_snapshot().await;
        }

        *self.loop_mode.write() = mode;
        match mode {
            LoopMode::Off => info!("➡️ Repetición desactivada en guild {}", self.guild_id),
            LoopMode::Track => info!("🔂 Repetir canción activado en guild {}", self.guild_id),
            LoopMode::Queue => info!("🔁 Repetir cola activado en guild {}", self.guild_id),
        }
    }

    pub async fn cycle_loop_mode(&self) -> LoopMode {
        let next = self.loop_mode().next();
        self.set_loop_mode(next).await;
        next
    }

    pub fn now_playing(&self) -> Option<Track> {
        self.now_playing.lock().clone()
    }

    pub(crate) fn start_track(&self, track: Track) {
        self.stats.lock().record(&track);
        self.skip_votes.lock().clear();
        *self.now_playing.lock() = Some(track);
        self.touch();
    }

    pub(crate) fn finish_track(&self) -> Option<Track> {
        self.touch();
        self.skip_votes.lock().clear();
        self.now_playing.lock().take()
    }

    /// Registra un voto para saltar el track actual.
    ///
    /// The requester of the current track skips right away. Anyone else
    /// adds a vote; the skip passes at `max(2, listeners / 2)` distinct
    /// votes. `listeners` counts the non-bot members in the voice channel.
    /// Votes reset whenever the track changes. Moderators bypass this and
    /// call [`PlaybackDriver::skip`](crate::audio::driver::PlaybackDriver::skip)
    /// directly.
    pub fn vote_skip(&self, user_id: UserId, listeners: usize) -> Result<SkipVote, QueueError> {
        let requester = match self.now_playing.lock().as_ref() {
            Some(track) => track.requester,
            None => return Err(QueueError::NothingPlaying),
        };

        let mut votes = self.skip_votes.lock();
        if requester == Some(user_id) {
            votes.clear();
            return Ok(SkipVote::Skip);
        }

        votes.insert(user_id);
        let required = (listeners / 2).max(2);
        if votes.len() >= required {
            info!("🗳️ Voto para saltar aprobado en guild {} ({}/{})", self.guild_id, votes.len(), required);
            votes.clear();
            Ok(SkipVote::Skip)
        } else {
            Ok(SkipVote::Pending {
                votes: votes.len(),
                required,
            })
        }
    }

    pub fn stats(&self) -> SessionStats {
        self.stats.lock().clone()
    }

    fn check_duration(&self, track: &Track) -> Result<(), QueueError> {
        if track.duration > self.limits.max_song_duration {
            return Err(QueueError::TrackTooLong {
                limit: self.limits.max_song_duration,
            });
        }
        Ok(())
    }

    /// Agrega un track y devuelve su posición (1-based)
    pub async fn add(&self, track: Track) -> Result<usize, QueueError> {
        self.check_duration(&track)?;
        self.touch();
        self.queue
            .enqueue_position(track)
            .await
            .ok_or(QueueError::CapacityExceeded {
                max: self.queue.max_size(),
            })
    }

    /// Agrega un track para que suene a continuación
    pub async fn add_next(&self, track: Track) -> Result<(), QueueError> {
        self.check_duration(&track)?;
        self.touch();
        if self.queue.enqueue_front(track).await {
            Ok(())
        } else {
            Err(QueueError::CapacityExceeded {
                max: self.queue.max_size(),
            })
        }
    }

    /// Agrega una playlist.
    ///
    /// Tracks longer than the song limit are skipped, at most
    /// `max_playlist_size` tracks are taken, and the queue keeps whatever
    /// fits. Returns how many were queued.
    pub async fn add_playlist(&self, tracks: Vec<Track>) -> usize {
        let max_duration = self.limits.max_song_duration;
        let accepted: Vec<Track> = tracks
            .into_iter()
            .filter(|track| track.duration <= max_duration)
            .take(self.limits.max_playlist_size)
            .collect();

        self.touch();
        self.queue.enqueue_many(accepted).await
    }

    pub async fn remove(&self, index: usize) -> Result<Track, QueueError> {
        match self.queue.remove(index).await {
            Some(track) => Ok(track),
            None => Err(self.out_of_range(index).await),
        }
    }

    pub async fn move_track(&self, from: usize, to: usize) -> Result<(), QueueError> {
        if self.queue.move_track(from, to).await {
            Ok(())
        } else {
            Err(self.out_of_range(from.max(to)).await)
        }
    }

    pub async fn swap(&self, first: usize, second: usize) -> Result<(), QueueError> {
        if self.queue.swap(first, second).await {
            Ok(())
        } else {
            Err(self.out_of_range(first.max(second)).await)
        }
    }

    async fn out_of_range(&self, index: usize) -> QueueError {
        QueueError::IndexOutOfRange {
            index,
            len: self.queue.len().await,
        }
    }

    /// Vista serializable para el dashboard
    pub async fn view(&self) -> QueueView {
        QueueView {
            guild_id: self.guild_id.get(),
            loop_mode: self.loop_mode(),
            now_playing: self.now_playing().as_ref().map(TrackView::from),
            tracks: self.queue.to_vec().await.iter().map(TrackView::from).collect(),
        }
    }

    pub async fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.view().await)?)
    }

    /// Resumen para logs al cerrar la sesión
    pub fn summary(&self) -> String {
        let stats = self.stats();
        let uptime = (Utc::now() - self.started_at).to_std().unwrap_or_default();
        format!(
            "guild {}: {} canciones reproducidas ({}) en {}",
            self.guild_id,
            stats.songs_played,
            humantime::format_duration(stats.total_played),
            humantime::format_duration(Duration::from_secs(uptime.as_secs()))
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackView {
    pub title: String,
    pub author: String,
    pub duration: u64,
    pub requester: Option<u64>,
}

impl From<&Track> for TrackView {
    fn from(track: &Track) -> Self {
        Self {
            title: track.title.clone(),
            author: track.author.clone(),
            duration: track.duration.as_secs(),
            requester: track.requester.map(UserId::get),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueView {
    pub guild_id: u64,
    pub loop_mode: LoopMode,
    pub now_playing: Option<TrackView>,
    pub tracks: Vec<TrackView>,
}

/// Sesiones activas por guild
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: DashMap<GuildId, Arc<Session>>,
    limits: SessionLimits,
}

impl SessionRegistry {
    pub fn new(limits: SessionLimits) -> Self {
        Self {
            sessions: DashMap::new(),
            limits,
        }
    }

    /// Returns the guild's session, creating it if needed.
    ///
    /// Counts as activity: the session is touched while the map entry is
    /// locked, so [`reap_idle`](Self::reap_idle) cannot remove it before the
    /// caller gets to use it.
    pub fn get_or_create(&self, guild_id: GuildId) -> Arc<Session> {
        let entry = self.sessions.entry(guild_id).or_insert_with(|| {
            info!("🎧 Nueva sesión de reproducción para guild {}", guild_id);
            Arc::new(Session::new(guild_id, self.limits))
        });
        entry.value().touch();
        Arc::clone(entry.value())
    }

    pub fn get(&self, guild_id: GuildId) -> Option<Arc<Session>> {
        self.sessions.get(&guild_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Removes the session; its queue is dropped with the last reference.
    pub fn destroy(&self, guild_id: GuildId) -> Option<Arc<Session>> {
        let removed = self.sessions.remove(&guild_id).map(|(_, session)| session);
        if let Some(session) = &removed {
            info!("👋 Sesión cerrada: {}", session.summary());
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn guild_ids(&self) -> Vec<GuildId> {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }

    /// Cierra las sesiones inactivas durante más de `timeout`.
    ///
    /// Idleness is checked while the map entry is locked, so a session that
    /// was handed out or used since the last tick survives.
    pub fn reap_idle(&self, timeout: Duration) -> Vec<GuildId> {
        let mut reaped = Vec::new();
        for guild_id in self.guild_ids() {
            let removed = self
                .sessions
                .remove_if(&guild_id, |_, session| session.is_idle(timeout));
            if let Some((_, session)) = removed {
                info!("👋 Sesión inactiva cerrada: {}", session.summary());
                reaped.push(guild_id);
            }
        }
        reaped
    }
}
