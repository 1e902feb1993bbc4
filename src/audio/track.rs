use chrono::{DateTime, Utc};
use serde::Serialize;
use serenity::model::id::UserId;
use std::{fmt, time::Duration};

/// Plataforma de origen de un track, deducida de su URI
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Platform {
    YouTube,
    Spotify,
    SoundCloud,
    Other,
}

impl Platform {
    pub fn from_uri(uri: &str) -> Self {
        let uri = uri.to_lowercase();
        if uri.contains("youtube") || uri.contains("youtu.be") {
            Platform::YouTube
        } else if uri.contains("spotify") {
            Platform::Spotify
        } else if uri.contains("soundcloud") {
            Platform::SoundCloud
        } else {
            Platform::Other
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::YouTube => "YouTube",
            Platform::Spotify => "Spotify",
            Platform::SoundCloud => "SoundCloud",
            Platform::Other => "Other",
        };
        f.write_str(name)
    }
}

/// A fully resolved, playable track as handed over by the search layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub title: String,
    pub author: String,
    pub duration: Duration,
    pub uri: String,
    pub requester: Option<UserId>,
    pub added_at: DateTime<Utc>,
}

impl Track {
    pub fn new(title: impl Into<String>, author: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            duration: Duration::ZERO,
            uri: uri.into(),
            requester: None,
            added_at: Utc::now(),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_requester(mut self, user_id: UserId) -> Self {
        self.requester = Some(user_id);
        self
    }

    /// Clave usada para detectar duplicados
    pub fn dedup_key(&self) -> (&str, &str) {
        (&self.title, &self.author)
    }

    pub fn platform(&self) -> Platform {
        Platform::from_uri(&self.uri)
    }

    pub fn is_requested_by(&self, user_id: UserId) -> bool {
        self.requester == Some(user_id)
    }

    /// Búsqueda sin distinguir mayúsculas en título o autor.
    /// `needle` must already be lowercase.
    pub(crate) fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle) || self.author.to_lowercase().contains(needle)
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.author.is_empty() {
            write!(f, "{}", self.title)
        } else {
            write!(f, "{} - {}", self.title, self.author)
        }
    }
}
