use std::borrow::Cow;
use std::env;
use std::sync::LazyLock;

use anstyle::{Reset, RgbColor, Style};
use regex::Regex;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const FALLBACK_TERMINAL_WIDTH: usize = 80;

static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]").expect("ANSI escape pattern is valid")
});

pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    ANSI_ESCAPE.replace_all(text, "")
}

/// Display columns taken by `text` once escape sequences are removed.
pub fn visible_width(text: &str) -> usize {
    strip_ansi(text).width()
}

pub fn background_escape(rgb: (u8, u8, u8)) -> String {
    let (r, g, b) = rgb;
    Style::new()
        .bg_color(Some(RgbColor(r, g, b).into()))
        .render()
        .to_string()
}

fn is_reset(sequence: &str) -> bool {
    matches!(sequence, "\x1b[0m" | "\x1b[m")
}

/// Splits `text` into chunks of at most `width` visible columns. Colour
/// sequences active at a break are replayed at the start of the next chunk.
pub fn wrap_visible(text: &str, width: usize) -> Vec<String> {
    if width == 0 || visible_width(text) <= width {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;
    let mut active_sgr = String::new();
    let mut cursor = 0;

    let escapes = ANSI_ESCAPE.find_iter(text).map(Some).chain([None]);
    for escape in escapes {
        let end = escape.map_or(text.len(), |found| found.start());
        for ch in text[cursor..end].chars() {
            let ch_width = ch.width().unwrap_or(0);
            if current_width > 0 && current_width + ch_width > width {
                chunks.push(std::mem::take(&mut current));
                current.push_str(&active_sgr);
                current_width = 0;
            }
            current.push(ch);
            current_width += ch_width;
        }

        if let Some(found) = escape {
            let sequence = found.as_str();
            current.push_str(sequence);
            if is_reset(sequence) {
                active_sgr.clear();
            } else if sequence.ends_with('m') {
                active_sgr.push_str(sequence);
            }
            cursor = found.end();
        }
    }

    chunks.push(current);
    chunks
}

/// Wraps `content` in a background band that ends exactly at `width` columns.
/// `content` must already fit; see [`band_lines`].
pub fn band_line(content: &str, width: usize, background: &str) -> String {
    let pad = width.saturating_sub(visible_width(content));
    format!(
        "{background}{content}{background}{}{}",
        " ".repeat(pad),
        Reset.render()
    )
}

/// One band per `width`-sized chunk of `content`.
pub fn band_lines(content: &str, width: usize, background: &str) -> Vec<String> {
    wrap_visible(content, width)
        .iter()
        .map(|chunk| band_line(chunk, width, background))
        .collect()
}

pub fn terminal_width() -> usize {
    if let Some((terminal_size::Width(cols), _)) = terminal_size::terminal_size()
        && cols > 0
    {
        return usize::from(cols);
    }

    env::var("COLUMNS")
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|cols| *cols > 0)
        .unwrap_or(FALLBACK_TERMINAL_WIDTH)
}
