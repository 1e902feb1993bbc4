use regex::Regex;
use std::{sync::LazyLock, time::Duration};

static CLOCK_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(\d+):)?(\d+):(\d+)$").expect("valid clock regex"));

static HUMAN_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?$").expect("valid human duration regex")
});

/// Formatea una duración en formato legible (`3:45`, `1:02:30`)
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Interpreta una duración escrita por el usuario.
///
/// Accepts plain seconds (`330`), clock notation (`5:30`, `1:02:30`) and
/// unit notation (`1h30m`, `90m`, `5m30s`). Zero or unparseable input gives
/// `None`.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let input = input.trim().to_lowercase();
    if input.is_empty() {
        return None;
    }

    let seconds = if input.bytes().all(|b| b.is_ascii_digit()) {
        input.parse::<u64>().ok()?
    } else if let Some(caps) = CLOCK_FORMAT.captures(&input) {
        let hours = group(&caps, 1)?;
        let minutes = group(&caps, 2)?;
        let seconds = group(&caps, 3)?;
        hours * 3600 + minutes * 60 + seconds
    } else if let Some(caps) = HUMAN_FORMAT.captures(&input) {
        let hours = group(&caps, 1)?;
        let minutes = group(&caps, 2)?;
        let seconds = group(&caps, 3)?;
        hours * 3600 + minutes * 60 + seconds
    } else {
        return None;
    };

    (seconds > 0).then(|| Duration::from_secs(seconds))
}

/// Missing groups count as zero; numbers too large to parse reject the input.
fn group(caps: &regex::Captures<'_>, index: usize) -> Option<u64> {
    match caps.get(index) {
        Some(m) => m.as_str().parse().ok(),
        None => Some(0),
    }
}

/// Corta un texto a `max_chars` caracteres, agregando `...` si se cortó
pub fn truncate(text: &str, max_chars: usize) -> String {
    const SUFFIX: &str = "...";

    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    // Sin espacio para el sufijo
    if max_chars <= SUFFIX.len() {
        return text.chars().take(max_chars).collect();
    }

    let keep = max_chars - SUFFIX.len();
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(SUFFIX);
    truncated
}
