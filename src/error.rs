use std::time::Duration;
use thiserror::Error;

/// Local, recoverable failures of a queue operation.
///
/// The queue itself reports these as plain `bool`/`Option` results; the
/// session layer turns them into this type so command handlers can render
/// a message without inspecting the queue again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("the queue is full (max {max} tracks)")]
    CapacityExceeded { max: usize },

    #[error("position {index} is out of range (queue has {len} tracks)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("the queue is empty")]
    Empty,

    #[error("the track is longer than the {limit:?} limit")]
    TrackTooLong { limit: Duration },

    #[error("nothing is playing")]
    NothingPlaying,
}
