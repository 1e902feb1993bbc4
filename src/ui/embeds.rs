use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};
use std::fmt::Write;

use super::format::{format_duration, truncate};
use crate::{
    audio::{
        queue::QueueStats,
        session::{LoopMode, Session, SessionStats},
        track::Track,
    },
    error::QueueError,
};

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const ERROR_RED: Colour = Colour::from_rgb(220, 53, 69);
    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const NEON_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
    pub const NEUTRAL_GRAY: Colour = Colour::from_rgb(108, 117, 125);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎮 KazeBeats";

pub const ITEMS_PER_PAGE: usize = 10;

const TITLE_WIDTH: usize = 40;
const AUTHOR_WIDTH: usize = 30;

fn track_line(position: usize, track: &Track) -> String {
    format!(
        "`#{:02}` **{}** - {} `[{}]`",
        position,
        truncate(&track.title, TITLE_WIDTH),
        truncate(&track.author, AUTHOR_WIDTH),
        format_duration(track.duration)
    )
}

/// Lista numerada; `offset` es la posición (0-based) del primer track
pub fn queue_lines(tracks: &[Track], offset: usize) -> String {
    tracks
        .iter()
        .enumerate()
        .map(|(i, track)| track_line(offset + i + 1, track))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Resultados de `find`, con posiciones 1-based
pub fn search_results_lines(results: &[(usize, Track)]) -> String {
    results
        .iter()
        .map(|(index, track)| track_line(index + 1, track))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn stats_text(stats: &QueueStats, loop_mode: LoopMode) -> String {
    let mut text = format!(
        "**Tracks:** {}\n**Duration:** {}\n**Average:** {}\n**Requesters:** {}\n**Loop:** {}",
        stats.total_tracks,
        format_duration(stats.total_duration),
        format_duration(stats.average_duration),
        stats.unique_requesters,
        loop_mode
    );

    if !stats.platforms.is_empty() {
        let platforms = stats
            .platforms
            .iter()
            .map(|(platform, count)| format!("{} {}", platform, count))
            .collect::<Vec<_>>()
            .join(" • ");
        let _ = write!(text, "\n**Sources:** {}", platforms);
    }

    text
}

pub fn session_stats_text(stats: &SessionStats) -> String {
    let mut text = format!(
        "**Songs played:** {}\n**Time played:** {}",
        stats.songs_played,
        format_duration(stats.total_played)
    );
    if let Some((title, count)) = stats.top_track() {
        let _ = write!(text, "\n**Most played:** {} ({}x)", truncate(title, TITLE_WIDTH), count);
    }
    text
}

/// Crea un embed para mostrar la cola de reproducción
pub fn create_queue_embed(
    now_playing: Option<&Track>,
    upcoming: &[Track],
    stats: &QueueStats,
    loop_mode: LoopMode,
) -> CreateEmbed {
    let mut embed = CreateEmbed::new()
        .title("📋 Music Queue")
        .color(colors::NEON_PURPLE);

    if let Some(current) = now_playing {
        let status = match loop_mode {
            LoopMode::Track => "🔂",
            LoopMode::Queue => "🔁",
            LoopMode::Off => "▶️",
        };
        embed = embed.field(
            format!("{} Now Playing", status),
            format!(
                "**{}**\nBy {} • {}",
                truncate(&current.title, TITLE_WIDTH),
                truncate(&current.author, AUTHOR_WIDTH),
                format_duration(current.duration)
            ),
            false,
        );
    }

    if upcoming.is_empty() {
        embed = embed
            .description("😴 **The queue is empty**\n\n💡 Add some music with `/play`")
            .color(colors::NEUTRAL_GRAY);
    } else {
        embed = embed.field("🔥 Up Next", queue_lines(upcoming, 0), false);
    }

    let total_pages = stats.total_tracks.div_ceil(ITEMS_PER_PAGE).max(1);
    embed
        .field("ℹ️ Queue Stats", stats_text(stats, loop_mode), true)
        .footer(CreateEmbedFooter::new(format!(
            "{} • Page 1/{}",
            STANDARD_FOOTER, total_pages
        )))
        .timestamp(Timestamp::now())
}

/// Arma el embed de la cola leyendo el estado actual de la sesión
pub async fn render_queue(session: &Session) -> CreateEmbed {
    let upcoming = session.queue().upcoming(ITEMS_PER_PAGE).await;
    let stats = session.queue().stats().await;
    let now_playing = session.now_playing();

    create_queue_embed(now_playing.as_ref(), &upcoming, &stats, session.loop_mode())
}

pub fn create_search_results_embed(query: &str, results: &[(usize, Track)]) -> CreateEmbed {
    let embed = CreateEmbed::new().title(format!("🔎 Queue search: {}", truncate(query, TITLE_WIDTH)));

    let embed = if results.is_empty() {
        embed
            .description(format!("No tracks in the queue match **{}**", truncate(query, TITLE_WIDTH)))
            .color(colors::NEUTRAL_GRAY)
    } else {
        let shown = &results[..results.len().min(ITEMS_PER_PAGE)];
        embed
            .description(search_results_lines(shown))
            .color(colors::INFO_BLUE)
    };

    embed
        .footer(CreateEmbedFooter::new(format!(
            "{} • {} matches",
            STANDARD_FOOTER,
            results.len()
        )))
        .timestamp(Timestamp::now())
}

pub fn create_history_embed(history: &[Track]) -> CreateEmbed {
    let description = if history.is_empty() {
        "Nothing has been played yet".to_string()
    } else {
        // El más reciente primero
        let newest_first: Vec<Track> = history.iter().rev().cloned().collect();
        queue_lines(&newest_first, 0)
    };

    CreateEmbed::new()
        .title("🕘 Recently Played")
        .description(description)
        .color(colors::INFO_BLUE)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
        .timestamp(Timestamp::now())
}

pub fn create_stats_embed(stats: &QueueStats, session_stats: &SessionStats, loop_mode: LoopMode) -> CreateEmbed {
    CreateEmbed::new()
        .title("📊 Session Stats")
        .color(colors::SUCCESS_GREEN)
        .field("Queue", stats_text(stats, loop_mode), true)
        .field("Session", session_stats_text(session_stats), true)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
        .timestamp(Timestamp::now())
}

/// Embed de error para una operación de cola rechazada
pub fn create_queue_error_embed(error: &QueueError) -> CreateEmbed {
    let title = match error {
        QueueError::CapacityExceeded { .. } => "❌ Queue Full",
        QueueError::IndexOutOfRange { .. } => "❌ Invalid Position",
        QueueError::Empty => "📭 Queue Empty",
        QueueError::TrackTooLong { .. } => "❌ Track Too Long",
        QueueError::NothingPlaying => "🔇 Nothing Playing",
    };

    CreateEmbed::new()
        .title(title)
        .description(error.to_string())
        .color(colors::ERROR_RED)
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
        .timestamp(Timestamp::now())
}
