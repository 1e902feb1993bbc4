//! # Audio Module
//!
//! Per-guild playback state for KazeBeats.
//!
//! ## Architecture
//!
//! ### [`track`] - Track model
//! - Structured record handed over by the search layer
//! - Platform detection from the source URI
//!
//! ### [`queue`] - Queue Management
//! - Lock-guarded FIFO of pending tracks, bounded by `max_size`
//! - Reordering, dedupe, filtering, search and statistics
//! - Bounded play history and the loop-queue snapshot
//!
//! ### [`session`] - Session context
//! - One [`session::Session`] per voice connection, owning its queue
//! - Loop mode, now playing and per-session counters
//! - [`session::SessionRegistry`] keyed by guild
//!
//! ### [`driver`] - Playback driver
//! - Consumes the queue whenever a track ends
//! - Applies loop modes and hands tracks to an [`driver::AudioBackend`]
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use kazebeats::audio::{session::{SessionLimits, SessionRegistry}, track::Track};
//! use serenity::all::GuildId;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let sessions = SessionRegistry::new(SessionLimits::default());
//! let session = sessions.get_or_create(GuildId::new(123456789));
//!
//! let position = session
//!     .add(Track::new("Song", "Artist", "https://youtu.be/dQw4w9WgXcQ"))
//!     .await?;
//! println!("queued at #{}", position);
//!
//! session.queue().shuffle().await;
//! # Ok(())
//! # }
//! ```

pub mod driver;
pub mod queue;
pub mod session;
pub mod track;
