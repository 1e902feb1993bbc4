//! Rendering helpers for the display layer: duration formatting and the
//! Discord embeds for queue, search, history and statistics views.

pub mod embeds;
pub mod format;
