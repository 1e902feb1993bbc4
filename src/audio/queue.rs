use rand::seq::SliceRandom;
use serde::Serialize;
use serenity::model::id::UserId;
use std::{
    collections::{BTreeMap, HashSet, VecDeque},
    time::Duration,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::track::{Platform, Track};

pub const DEFAULT_MAX_SIZE: usize = 1000;
pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<Track>,
    history: VecDeque<Track>,
    snapshot: Option<Vec<Track>>,
}

impl QueueState {
    fn add_to_history(&mut self, track: Track) {
        self.history.push_back(track);

        // Mantener solo los últimos N items
        while self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
    }

    fn total_duration(&self) -> Duration {
        self.items.iter().map(|track| track.duration).sum()
    }
}

/// Cola de reproducción de una sesión de voz.
///
/// Every operation takes the same `tokio::sync::Mutex` for its whole
/// duration, so concurrent callers observe operations in lock acquisition
/// order and never a half-applied mutation. The lock is FIFO-fair and is
/// never held across I/O.
///
/// Failures are reported as values: `false`, `None`, an empty `Vec` or a
/// zero count. See [`crate::audio::session::Session`] for the
/// `Result`-returning wrappers used by command handlers.
#[derive(Debug)]
pub struct QueueManager {
    state: Mutex<QueueState>,
    max_size: usize,
}

impl Default for QueueManager {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE)
    }
}

impl QueueManager {
    pub fn new(max_size: usize) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            max_size,
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.items.is_empty()
    }

    /// `None` while another operation holds the lock.
    pub fn try_is_empty(&self) -> Option<bool> {
        self.state.try_lock().ok().map(|state| state.items.is_empty())
    }

    /// Agrega un track al final de la cola
    pub async fn enqueue(&self, track: Track) -> bool {
        self.enqueue_position(track).await.is_some()
    }

    /// Like [`enqueue`](Self::enqueue), but returns the 1-based position the
    /// track landed at, read under the same lock as the insert.
    pub async fn enqueue_position(&self, track: Track) -> Option<usize> {
        let mut state = self.state.lock().await;
        if state.items.len() >= self.max_size {
            warn!("🚫 Cola llena (máximo {} canciones), descartado: {}", self.max_size, track.title);
            return None;
        }

        debug!("➕ Agregado a la cola: {}", track.title);
        state.items.push_back(track);
        Some(state.items.len())
    }

    /// Agrega un track al inicio de la cola (prioridad)
    pub async fn enqueue_front(&self, track: Track) -> bool {
        let mut state = self.state.lock().await;
        if state.items.len() >= self.max_size {
            warn!("🚫 Cola llena (máximo {} canciones), descartado: {}", self.max_size, track.title);
            return false;
        }

        debug!("⏫ Agregado al inicio de la cola: {}", track.title);
        state.items.push_front(track);
        true
    }

    /// Agrega múltiples tracks (playlist). Returns how many fit.
    pub async fn enqueue_many(&self, tracks: impl IntoIterator<Item = Track>) -> usize {
        let mut state = self.state.lock().await;
        let available_space = self.max_size.saturating_sub(state.items.len());

        let before = state.items.len();
        state.items.extend(tracks.into_iter().take(available_space));
        let added = state.items.len() - before;

        info!("➕ Agregadas {} canciones a la cola", added);
        added
    }

    /// Obtiene el siguiente track (FIFO) y lo registra en el historial
    pub async fn dequeue(&self) -> Option<Track> {
        let mut state = self.state.lock().await;
        let track = state.items.pop_front()?;
        state.add_to_history(track.clone());
        debug!("➡️ Siguiente en cola: {}", track.title);
        Some(track)
    }

    pub async fn peek(&self, index: usize) -> Option<Track> {
        self.state.lock().await.items.get(index).cloned()
    }

    pub async fn remove(&self, index: usize) -> Option<Track> {
        let removed = self.state.lock().await.items.remove(index);
        if let Some(track) = &removed {
            debug!("❌ Track eliminado en posición {}: {}", index, track.title);
        }
        removed
    }

    /// Limpia la cola
    pub async fn clear(&self) -> usize {
        let mut state = self.state.lock().await;
        let cleared = state.items.len();
        state.items.clear();
        info!("🗑️ Cola limpiada: {} tracks removidos", cleared);
        cleared
    }

    /// Mezcla la cola (Fisher-Yates uniforme)
    pub async fn shuffle(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.items.len() < 2 {
            return false;
        }

        state.items.make_contiguous().shuffle(&mut rand::thread_rng());
        info!("🔀 Cola mezclada");
        true
    }

    pub async fn reverse(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.items.len() < 2 {
            return false;
        }

        state.items.make_contiguous().reverse();
        info!("🔃 Cola invertida");
        true
    }

    /// Mueve un track a una nueva posición, conservando el orden del resto
    pub async fn move_track(&self, from: usize, to: usize) -> bool {
        let mut state = self.state.lock().await;
        let len = state.items.len();
        if from >= len || to >= len {
            return false;
        }

        if from != to {
            if let Some(track) = state.items.remove(from) {
                state.items.insert(to, track);
            }
            debug!("📍 Track movido de posición {} a {}", from, to);
        }
        true
    }

    pub async fn swap(&self, first: usize, second: usize) -> bool {
        let mut state = self.state.lock().await;
        let len = state.items.len();
        if first >= len || second >= len {
            return false;
        }

        state.items.swap(first, second);
        debug!("🔄 Tracks intercambiados: {} <-> {}", first, second);
        true
    }

    /// Guarda una copia de la cola para el modo loop
    pub async fn save_snapshot(&self) {
        let mut state = self.state.lock().await;
        let snapshot: Vec<Track> = state.items.iter().cloned().collect();
        debug!("💾 Snapshot de loop guardado ({} tracks)", snapshot.len());
        state.snapshot = Some(snapshot);
    }

    /// Re-agrega el snapshot al final de la cola.
    ///
    /// Appends the longest prefix of the snapshot that fits under
    /// `max_size` and returns how many tracks were appended. The snapshot is
    /// kept so a looping queue can be refilled again.
    pub async fn restore_snapshot(&self) -> usize {
        let mut state = self.state.lock().await;
        let available_space = self.max_size.saturating_sub(state.items.len());

        let restored: Vec<Track> = match &state.snapshot {
            Some(snapshot) => snapshot.iter().take(available_space).cloned().collect(),
            None => return 0,
        };

        let count = restored.len();
        state.items.extend(restored);
        info!("🔁 Cola repoblada desde snapshot: {} tracks", count);
        count
    }

    /// Empieza una vuelta de loop con `seed` como snapshot
    pub async fn begin_loop_snapshot(&self, seed: Vec<Track>) {
        let mut state = self.state.lock().await;
        debug!("💾 Loop de cola iniciado ({} tracks)", seed.len());
        state.snapshot = Some(seed);
    }

    /// Appends a played track to the active snapshot. No-op without one.
    pub async fn extend_snapshot(&self, track: Track) {
        if let Some(snapshot) = self.state.lock().await.snapshot.as_mut() {
            snapshot.push(track);
        }
    }

    /// Re-agrega el snapshot y empieza una vuelta nueva.
    ///
    /// Appends what fits under `max_size`, then leaves an empty snapshot so
    /// the tracks played during the next pass can be collected again.
    /// Returns how many tracks were appended.
    pub async fn replay_snapshot(&self) -> usize {
        let mut state = self.state.lock().await;
        let available_space = self.max_size.saturating_sub(state.items.len());

        let snapshot = match state.snapshot.as_mut() {
            Some(snapshot) => std::mem::take(snapshot),
            None => return 0,
        };

        let count = snapshot.len().min(available_space);
        state.items.extend(snapshot.into_iter().take(count));
        info!("🔁 Nueva vuelta del loop: {} tracks", count);
        count
    }

    pub async fn has_snapshot(&self) -> bool {
        self.state.lock().await.snapshot.is_some()
    }

    pub async fn clear_snapshot(&self) {
        self.state.lock().await.snapshot = None;
    }

    /// Limpia duplicados por (título, autor), conservando la primera aparición
    pub async fn deduplicate(&self) -> usize {
        let mut state = self.state.lock().await;
        let mut seen = HashSet::new();
        let original_len = state.items.len();

        state
            .items
            .retain(|track| seen.insert((track.title.clone(), track.author.clone())));

        let removed = original_len - state.items.len();
        if removed > 0 {
            info!("🗑️ Eliminados {} duplicados", removed);
        }
        removed
    }

    /// Remove every track longer than `limit`.
    pub async fn filter_by_max_duration(&self, limit: Duration) -> usize {
        let mut state = self.state.lock().await;
        let original_len = state.items.len();

        state.items.retain(|track| track.duration <= limit);

        let removed = original_len - state.items.len();
        if removed > 0 {
            info!("✂️ Eliminados {} tracks más largos que {:?}", removed, limit);
        }
        removed
    }

    /// Limpia tracks de un usuario específico
    pub async fn remove_by_requester(&self, user_id: UserId) -> usize {
        let mut state = self.state.lock().await;
        let original_len = state.items.len();

        state.items.retain(|track| !track.is_requested_by(user_id));

        let removed = original_len - state.items.len();
        if removed > 0 {
            info!("🗑️ Eliminadas {} canciones del usuario {}", removed, user_id);
        }
        removed
    }

    pub async fn find(&self, query: &str) -> Vec<(usize, Track)> {
        let needle = query.to_lowercase();
        let state = self.state.lock().await;

        state
            .items
            .iter()
            .enumerate()
            .filter(|(_, track)| track.matches(&needle))
            .map(|(index, track)| (index, track.clone()))
            .collect()
    }

    /// Mueve todos los tracks de un usuario al frente.
    ///
    /// Stable partition: the user's tracks first, then everyone else's, each
    /// group in its original relative order. Returns the number of tracks
    /// belonging to the user.
    pub async fn prioritize(&self, user_id: UserId) -> usize {
        let mut state = self.state.lock().await;

        let (mine, others): (Vec<Track>, Vec<Track>) = state
            .items
            .drain(..)
            .partition(|track| track.is_requested_by(user_id));

        let moved = mine.len();
        state.items.extend(mine);
        state.items.extend(others);

        if moved > 0 {
            info!("⏫ {} tracks del usuario {} priorizados", moved, user_id);
        }
        moved
    }

    pub async fn upcoming(&self, count: usize) -> Vec<Track> {
        let state = self.state.lock().await;
        state.items.iter().take(count).cloned().collect()
    }

    /// The `count` most recently played tracks, oldest first.
    pub async fn history(&self, count: usize) -> Vec<Track> {
        let state = self.state.lock().await;
        let skip = state.history.len().saturating_sub(count);
        state.history.iter().skip(skip).cloned().collect()
    }

    pub async fn to_vec(&self) -> Vec<Track> {
        self.state.lock().await.items.iter().cloned().collect()
    }

    pub async fn total_duration(&self) -> Duration {
        self.state.lock().await.total_duration()
    }

    /// Obtiene estadísticas de la cola
    pub async fn stats(&self) -> QueueStats {
        let state = self.state.lock().await;

        let total_tracks = state.items.len();
        let total_duration = state.total_duration();
        let mut requesters = HashSet::new();
        let mut platforms = BTreeMap::new();

        for track in &state.items {
            if let Some(user_id) = track.requester {
                requesters.insert(user_id);
            }
            *platforms.entry(track.platform()).or_insert(0) += 1;
        }

        let average_duration = match u32::try_from(total_tracks) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(count) => total_duration / count,
        };

        QueueStats {
            total_tracks,
            total_duration,
            unique_requesters: requesters.len(),
            platforms,
            average_duration,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueStats {
    pub total_tracks: usize,
    pub total_duration: Duration,
    pub unique_requesters: usize,
    pub platforms: BTreeMap<Platform, usize>,
    pub average_duration: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
    };

    fn track(title: &str, author: &str) -> Track {
        Track::new(title, author, format!("https://youtube.com/watch?v={}", title))
    }

    fn titles(tracks: &[Track]) -> Vec<&str> {
        tracks.iter().map(|t| t.title.as_str()).collect()
    }

    async fn queue_of(names: &[&str]) -> QueueManager {
        let queue = QueueManager::default();
        for name in names {
            assert!(queue.enqueue(track(name, "artist")).await);
        }
        queue
    }

    #[tokio::test]
    async fn test_enqueue_respects_max_size() {
        let queue = QueueManager::new(5);
        for i in 0..5 {
            assert!(queue.enqueue(track(&format!("t{}", i), "a")).await);
        }
        assert_eq!(queue.len().await, 5);

        assert!(!queue.enqueue(track("overflow", "a")).await);
        assert!(!queue.enqueue_front(track("overflow", "a")).await);
        assert_eq!(queue.len().await, 5);
    }

    #[tokio::test]
    async fn test_enqueue_position() {
        let queue = QueueManager::new(2);
        assert_eq!(queue.enqueue_position(track("A", "a")).await, Some(1));
        assert_eq!(queue.enqueue_position(track("B", "a")).await, Some(2));
        assert_eq!(queue.enqueue_position(track("C", "a")).await, None);

        queue.dequeue().await;
        assert_eq!(queue.enqueue_position(track("C", "a")).await, Some(2));
    }

    #[tokio::test]
    async fn test_try_is_empty_backs_off_while_locked() {
        let queue = queue_of(&["A"]).await;
        assert_eq!(queue.try_is_empty(), Some(false));

        let guard = queue.state.lock().await;
        assert_eq!(queue.try_is_empty(), None);
        drop(guard);

        queue.clear().await;
        assert_eq!(queue.try_is_empty(), Some(true));
    }

    #[tokio::test]
    async fn test_enqueue_front_and_fifo_dequeue() {
        let queue = queue_of(&["A", "B"]).await;
        assert!(queue.enqueue_front(track("Z", "artist")).await);

        assert_eq!(queue.dequeue().await.map(|t| t.title), Some("Z".to_string()));
        assert_eq!(queue.dequeue().await.map(|t| t.title), Some("A".to_string()));
        assert_eq!(queue.dequeue().await.map(|t| t.title), Some("B".to_string()));
        assert!(queue.dequeue().await.is_none());
    }

    #[tokio::test]
    async fn test_enqueue_many_takes_what_fits() {
        let queue = QueueManager::new(3);
        queue.enqueue(track("A", "a")).await;

        let added = queue
            .enqueue_many(vec![track("B", "a"), track("C", "a"), track("D", "a")])
            .await;

        assert_eq!(added, 2);
        assert_eq!(titles(&queue.to_vec().await), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_dequeue_records_history() {
        let queue = queue_of(&["A", "B"]).await;
        let played = queue.dequeue().await.unwrap();

        let history = queue.history(10).await;
        assert_eq!(history.last(), Some(&played));
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let queue = QueueManager::default();
        for i in 0..120 {
            queue.enqueue(track(&format!("t{}", i), "a")).await;
            queue.dequeue().await;
        }

        let history = queue.history(usize::MAX).await;
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history.first().map(|t| t.title.as_str()), Some("t70"));
        assert_eq!(history.last().map(|t| t.title.as_str()), Some("t119"));
        assert_eq!(titles(&queue.history(2).await), vec!["t118", "t119"]);
    }

    #[tokio::test]
    async fn test_peek_and_remove_out_of_range() {
        let queue = queue_of(&["A", "B", "C"]).await;

        assert_eq!(queue.peek(1).await.map(|t| t.title), Some("B".to_string()));
        assert!(queue.peek(3).await.is_none());
        assert!(queue.remove(3).await.is_none());

        assert_eq!(queue.remove(1).await.map(|t| t.title), Some("B".to_string()));
        assert_eq!(titles(&queue.to_vec().await), vec!["A", "C"]);
    }

    #[tokio::test]
    async fn test_clear_returns_count() {
        let queue = queue_of(&["A", "B", "C"]).await;
        assert_eq!(queue.clear().await, 3);
        assert!(queue.is_empty().await);
        assert_eq!(queue.clear().await, 0);
    }

    #[tokio::test]
    async fn test_move_track() {
        let queue = queue_of(&["A", "B", "C", "D"]).await;
        assert!(queue.move_track(0, 2).await);
        assert_eq!(titles(&queue.to_vec().await), vec!["B", "C", "A", "D"]);

        assert!(queue.move_track(3, 0).await);
        assert_eq!(titles(&queue.to_vec().await), vec!["D", "B", "C", "A"]);

        assert!(!queue.move_track(0, 4).await);
        assert!(!queue.move_track(4, 0).await);
        assert_eq!(titles(&queue.to_vec().await), vec!["D", "B", "C", "A"]);
    }

    #[tokio::test]
    async fn test_swap() {
        let queue = queue_of(&["A", "B", "C"]).await;
        assert!(queue.swap(0, 2).await);
        assert_eq!(titles(&queue.to_vec().await), vec!["C", "B", "A"]);
        assert!(!queue.swap(0, 3).await);
    }

    #[tokio::test]
    async fn test_reverse() {
        let queue = queue_of(&["A"]).await;
        assert!(!queue.reverse().await);

        let queue = queue_of(&["A", "B", "C"]).await;
        assert!(queue.reverse().await);
        assert_eq!(titles(&queue.to_vec().await), vec!["C", "B", "A"]);
    }

    #[tokio::test]
    async fn test_shuffle_small_queue_is_noop() {
        assert!(!QueueManager::default().shuffle().await);
        let queue = queue_of(&["A"]).await;
        assert!(!queue.shuffle().await);
        assert_eq!(titles(&queue.to_vec().await), vec!["A"]);
    }

    #[tokio::test]
    async fn test_shuffle_is_uniform() {
        let queue = queue_of(&["A", "B", "C"]).await;
        let rounds = 6000;
        let mut counts: HashMap<Vec<String>, usize> = HashMap::new();

        for _ in 0..rounds {
            assert!(queue.shuffle().await);
            let order = queue.to_vec().await.into_iter().map(|t| t.title).collect();
            *counts.entry(order).or_insert(0) += 1;
        }

        // 3! permutaciones, ~1000 cada una
        assert_eq!(counts.len(), 6);
        for (order, count) in &counts {
            assert!(
                (750..=1250).contains(count),
                "permutation {:?} appeared {} times",
                order,
                count
            );
        }
    }

    #[tokio::test]
    async fn test_snapshot_restore() {
        let queue = queue_of(&["A", "B"]).await;
        assert_eq!(queue.restore_snapshot().await, 0);
        assert!(!queue.has_snapshot().await);

        queue.save_snapshot().await;
        queue.clear().await;
        queue.enqueue(track("C", "artist")).await;

        assert_eq!(queue.restore_snapshot().await, 2);
        assert_eq!(titles(&queue.to_vec().await), vec!["C", "A", "B"]);

        // El snapshot se conserva para la siguiente vuelta
        assert!(queue.has_snapshot().await);
        queue.clear_snapshot().await;
        assert!(!queue.has_snapshot().await);
    }

    #[tokio::test]
    async fn test_restore_snapshot_respects_max_size() {
        let queue = QueueManager::new(3);
        queue.enqueue(track("A", "a")).await;
        queue.enqueue(track("B", "a")).await;
        queue.save_snapshot().await;

        assert_eq!(queue.restore_snapshot().await, 1);
        assert_eq!(titles(&queue.to_vec().await), vec!["A", "B", "A"]);
    }

    #[tokio::test]
    async fn test_loop_snapshot_passes() {
        let queue = QueueManager::new(10);
        assert_eq!(queue.replay_snapshot().await, 0);
        queue.extend_snapshot(track("ignored", "a")).await;
        assert!(!queue.has_snapshot().await);

        queue.begin_loop_snapshot(vec![track("A", "a")]).await;
        queue.extend_snapshot(track("B", "a")).await;
        queue.enqueue(track("C", "a")).await;

        assert_eq!(queue.replay_snapshot().await, 2);
        assert_eq!(titles(&queue.to_vec().await), vec!["C", "A", "B"]);

        // La vuelta siguiente empieza vacía
        assert!(queue.has_snapshot().await);
        assert_eq!(queue.replay_snapshot().await, 0);
    }

    #[tokio::test]
    async fn test_replay_snapshot_respects_max_size() {
        let queue = QueueManager::new(2);
        queue.enqueue(track("X", "a")).await;
        queue
            .begin_loop_snapshot(vec![track("A", "a"), track("B", "a")])
            .await;

        assert_eq!(queue.replay_snapshot().await, 1);
        assert_eq!(titles(&queue.to_vec().await), vec!["X", "A"]);
    }

    #[tokio::test]
    async fn test_deduplicate() {
        let queue = queue_of(&["A", "B", "A", "C", "B"]).await;
        assert_eq!(queue.deduplicate().await, 2);
        assert_eq!(titles(&queue.to_vec().await), vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_deduplicate_keys_on_title_and_author() {
        let queue = QueueManager::default();
        queue.enqueue(track("Song", "One")).await;
        queue.enqueue(track("Song", "Two")).await;
        queue.enqueue(track("Song", "One")).await;

        assert_eq!(queue.deduplicate().await, 1);
        let authors: Vec<String> = queue.to_vec().await.into_iter().map(|t| t.author).collect();
        assert_eq!(authors, vec!["One", "Two"]);
    }

    #[tokio::test]
    async fn test_filter_by_max_duration() {
        let queue = QueueManager::default();
        for (name, secs) in [("A", 200), ("B", 301), ("C", 300), ("D", 900)] {
            queue
                .enqueue(track(name, "a").with_duration(Duration::from_secs(secs)))
                .await;
        }

        assert_eq!(queue.filter_by_max_duration(Duration::from_secs(300)).await, 2);
        assert_eq!(titles(&queue.to_vec().await), vec!["A", "C"]);
    }

    #[tokio::test]
    async fn test_find_is_case_insensitive() {
        let queue = QueueManager::default();
        queue.enqueue(track("Bohemian Rhapsody", "Queen")).await;
        queue.enqueue(track("Yesterday", "The Beatles")).await;
        queue.enqueue(track("Killer Queen", "Queen")).await;

        let found = queue.find("QUEEN").await;
        let indices: Vec<usize> = found.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 2]);

        assert!(queue.find("metallica").await.is_empty());
    }

    #[tokio::test]
    async fn test_prioritize() {
        let u = UserId::new(1);
        let v = UserId::new(2);
        let queue = QueueManager::default();
        queue.enqueue(track("A", "a").with_requester(u)).await;
        queue.enqueue(track("B", "a").with_requester(v)).await;
        queue.enqueue(track("C", "a").with_requester(u)).await;

        assert_eq!(queue.prioritize(u).await, 2);
        assert_eq!(titles(&queue.to_vec().await), vec!["A", "C", "B"]);

        assert_eq!(queue.prioritize(UserId::new(99)).await, 0);
        assert_eq!(titles(&queue.to_vec().await), vec!["A", "C", "B"]);
    }

    #[tokio::test]
    async fn test_remove_by_requester() {
        let u = UserId::new(1);
        let queue = QueueManager::default();
        queue.enqueue(track("A", "a").with_requester(u)).await;
        queue.enqueue(track("B", "a")).await;
        queue.enqueue(track("C", "a").with_requester(u)).await;

        assert_eq!(queue.remove_by_requester(u).await, 2);
        assert_eq!(titles(&queue.to_vec().await), vec!["B"]);
    }

    #[tokio::test]
    async fn test_upcoming() {
        let queue = queue_of(&["A", "B", "C"]).await;
        assert_eq!(titles(&queue.upcoming(2).await), vec!["A", "B"]);
        assert_eq!(queue.upcoming(10).await.len(), 3);
        assert_eq!(queue.len().await, 3);
    }

    #[tokio::test]
    async fn test_total_duration_and_stats() {
        let queue = QueueManager::default();
        assert_eq!(queue.total_duration().await, Duration::ZERO);
        assert_eq!(queue.stats().await.average_duration, Duration::ZERO);

        queue
            .enqueue(
                Track::new("A", "a", "https://youtube.com/watch?v=1")
                    .with_duration(Duration::from_secs(100))
                    .with_requester(UserId::new(1)),
            )
            .await;
        queue
            .enqueue(
                Track::new("B", "b", "https://open.spotify.com/track/2")
                    .with_duration(Duration::from_secs(200))
                    .with_requester(UserId::new(1)),
            )
            .await;
        queue
            .enqueue(
                Track::new("C", "c", "https://cdn.example.com/c.mp3")
                    .with_duration(Duration::from_secs(300))
                    .with_requester(UserId::new(2)),
            )
            .await;

        assert_eq!(queue.total_duration().await, Duration::from_secs(600));

        let stats = queue.stats().await;
        assert_eq!(stats.total_tracks, 3);
        assert_eq!(stats.total_duration, Duration::from_secs(600));
        assert_eq!(stats.unique_requesters, 2);
        assert_eq!(stats.average_duration, Duration::from_secs(200));
        assert_eq!(stats.platforms.get(&Platform::YouTube), Some(&1));
        assert_eq!(stats.platforms.get(&Platform::Spotify), Some(&1));
        assert_eq!(stats.platforms.get(&Platform::Other), Some(&1));
        assert_eq!(stats.platforms.get(&Platform::SoundCloud), None);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["platforms"]["Spotify"], 1);
        assert_eq!(json["unique_requesters"], 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_producers_and_consumers() {
        let queue = Arc::new(QueueManager::default());
        let producers_done = Arc::new(AtomicBool::new(false));

        let consumers: Vec<_> = (0..2)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let done = Arc::clone(&producers_done);
                tokio::spawn(async move {
                    let mut consumed = Vec::new();
                    loop {
                        match queue.dequeue().await {
                            Some(track) => consumed.push(track.title),
                            None if done.load(Ordering::SeqCst) => break,
                            None => tokio::task::yield_now().await,
                        }
                    }
                    consumed
                })
            })
            .collect();

        let producers: Vec<_> = (0..4)
            .map(|p| {
                let queue = Arc::clone(&queue);
                tokio::spawn(async move {
                    let mut accepted = 0;
                    for i in 0..100 {
                        if queue.enqueue(track(&format!("p{}-{}", p, i), "a")).await {
                            accepted += 1;
                        }
                    }
                    accepted
                })
            })
            .collect();

        let accepted: usize = futures::future::join_all(producers)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .sum();
        producers_done.store(true, Ordering::SeqCst);

        let mut consumed: Vec<String> = futures::future::join_all(consumers)
            .await
            .into_iter()
            .flat_map(|r| r.unwrap())
            .collect();
        let resident = queue.len().await;

        assert_eq!(accepted, 400);
        assert_eq!(consumed.len() + resident, accepted);

        let total = consumed.len();
        consumed.sort();
        consumed.dedup();
        assert_eq!(consumed.len(), total, "a track was dequeued twice");
    }
}
