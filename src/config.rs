use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,

    // Cola
    pub max_queue_size: usize,
    pub max_playlist_size: usize,

    // Límites
    pub max_song_duration: u64,       // En segundos
    pub auto_disconnect_timeout: u64, // En segundos
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            discord_token: std::env::var("DISCORD_TOKEN")?,

            max_queue_size: std::env::var("MAX_QUEUE_SIZE")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()?,
            max_playlist_size: std::env::var("MAX_PLAYLIST_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,

            max_song_duration: std::env::var("MAX_SONG_DURATION")
                .unwrap_or_else(|_| "3600".to_string()) // 1 hora
                .parse()?,
            auto_disconnect_timeout: std::env::var("AUTO_DISCONNECT_TIMEOUT")
                .unwrap_or_else(|_| "300".to_string())
                .parse()?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Queue and playlist sizes must be greater than 0
    /// - A playlist import can never exceed the queue capacity
    /// - Durations must be greater than 0
    pub fn validate(&self) -> Result<()> {
        if self.max_queue_size == 0 {
            anyhow::bail!("Max queue size must be greater than 0");
        }

        if self.max_playlist_size == 0 {
            anyhow::bail!("Max playlist size must be greater than 0");
        }

        if self.max_playlist_size > self.max_queue_size {
            anyhow::bail!(
                "Max playlist size ({}) cannot exceed max queue size ({})",
                self.max_playlist_size,
                self.max_queue_size
            );
        }

        if self.max_song_duration == 0 {
            anyhow::bail!("Max song duration must be greater than 0");
        }

        if self.auto_disconnect_timeout == 0 {
            anyhow::bail!("Auto disconnect timeout must be greater than 0");
        }

        Ok(())
    }

    pub fn max_song_duration(&self) -> Duration {
        Duration::from_secs(self.max_song_duration)
    }

    pub fn auto_disconnect_timeout(&self) -> Duration {
        Duration::from_secs(self.auto_disconnect_timeout)
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// The Discord token is never included.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Queue: {} tracks, {} per playlist\n  \
            Limits: {} max duration, auto-disconnect after {}",
            self.max_queue_size,
            self.max_playlist_size,
            humantime::format_duration(self.max_song_duration()),
            humantime::format_duration(self.auto_disconnect_timeout()),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: String::new(),
            max_queue_size: 1000,
            max_playlist_size: 100,
            max_song_duration: 3600,
            auto_disconnect_timeout: 300,
        }
    }
}
