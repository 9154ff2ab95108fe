use std::sync::LazyLock;

use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::{LinesWithEndings, as_24_bit_terminal_escaped};
use tracing::trace;

const THEME_NAME: &str = "base16-ocean.dark";
const FALLBACK_BACKGROUND: (u8, u8, u8) = (43, 48, 59);

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

fn theme() -> Option<&'static Theme> {
    THEME_SET
        .themes
        .get(THEME_NAME)
        .or_else(|| THEME_SET.themes.values().next())
}

/// Panel background taken from the highlighting theme.
pub fn panel_background() -> (u8, u8, u8) {
    theme()
        .and_then(|theme| theme.settings.background)
        .map(|color| (color.r, color.g, color.b))
        .unwrap_or(FALLBACK_BACKGROUND)
}

fn normalize_lang_hint(hint: &str) -> String {
    let lowered = hint.trim().trim_start_matches('.').to_ascii_lowercase();
    match lowered.as_str() {
        "py" | "python" | "python3" => "py".into(),
        "bash" | "sh" | "zsh" | "shell" | "console" | "shellscript" => "sh".into(),
        "js" | "javascript" | "jsx" | "node" | "ts" | "typescript" | "tsx" => "js".into(),
        "rust" | "rs" => "rs".into(),
        "c" | "h" => "c".into(),
        "cpp" | "c++" | "cc" | "cxx" | "hpp" => "cpp".into(),
        "csharp" | "c#" | "cs" => "cs".into(),
        "golang" | "go" => "go".into(),
        "yaml" | "yml" => "yaml".into(),
        "ruby" | "rb" => "rb".into(),
        "markdown" | "md" => "md".into(),
        "html" | "xml" | "sql" | "json" | "java" | "css" | "php" | "lua" | "perl" => lowered,
        other => other.into(),
    }
}

fn is_plain(syntax: &SyntaxReference) -> bool {
    syntax.name == SYNTAX_SET.find_syntax_plain_text().name
}

/// Content markers used when no usable language tag was declared.
const LANGUAGE_MARKERS: &[(&str, &[&str])] = &[
    ("rs", &["fn main", "let mut ", "println!(", "impl ", "pub fn ", "use std::"]),
    ("py", &["def ", "print(", "import ", "elif ", "self.", "__name__"]),
    ("js", &["console.log", "function ", "=> {", "const ", "let ", "require("]),
    ("java", &["public static void", "System.out", "public class "]),
    ("go", &["package main", "func ", "fmt."]),
    ("cpp", &["#include", "std::", "int main("]),
    ("php", &["<?php"]),
    ("html", &["<html", "<div", "<body", "</"]),
    ("sql", &["SELECT ", "INSERT INTO", "CREATE TABLE", "UPDATE "]),
    ("sh", &["echo ", "sudo ", "apt ", "cd ", "export ", "$ "]),
];

fn guess_token(code: &str) -> Option<&'static str> {
    let trimmed = code.trim_start();
    if (trimmed.starts_with('{') || trimmed.starts_with('[')) && trimmed.contains("\":") {
        return Some("json");
    }

    let mut best: Option<(&'static str, usize)> = None;
    for (token, markers) in LANGUAGE_MARKERS {
        let hits = markers.iter().filter(|marker| code.contains(**marker)).count();
        if hits > 0 && best.is_none_or(|(_, top)| hits > top) {
            best = Some((*token, hits));
        }
    }
    best.map(|(token, _)| token)
}

fn guess_syntax(code: &str) -> Option<&'static SyntaxReference> {
    let first_line = code.lines().next().unwrap_or_default();
    SYNTAX_SET
        .find_syntax_by_first_line(first_line)
        .or_else(|| guess_token(code).and_then(|token| SYNTAX_SET.find_syntax_by_token(token)))
        .filter(|syntax| !is_plain(syntax))
}

/// Declared language first, then a content guess; `None` means render plain.
pub fn select_syntax(language: Option<&str>, code: &str) -> Option<&'static SyntaxReference> {
    let declared = language
        .map(normalize_lang_hint)
        .filter(|token| !token.is_empty())
        .and_then(|token| SYNTAX_SET.find_syntax_by_token(&token))
        .filter(|syntax| !is_plain(syntax));

    let selected = declared.or_else(|| guess_syntax(code));
    trace!(
        declared = language.unwrap_or_default(),
        selected = selected.map(|syntax| syntax.name.as_str()).unwrap_or("plain"),
        "selected code block syntax"
    );
    selected
}

/// One foreground-coloured ANSI string per source line, newline stripped.
pub fn highlight_lines(code: &str, syntax: Option<&SyntaxReference>) -> Vec<String> {
    let (Some(syntax), Some(theme)) = (syntax, theme()) else {
        return code.lines().map(str::to_string).collect();
    };

    let mut highlighter = HighlightLines::new(syntax, theme);
    LinesWithEndings::from(code)
        .map(|line| match highlighter.highlight_line(line, &SYNTAX_SET) {
            Ok(ranges) => as_24_bit_terminal_escaped(&ranges, false)
                .trim_end_matches(['\n', '\r'])
                .to_string(),
            Err(_) => line.trim_end_matches(['\n', '\r']).to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{guess_token, highlight_lines, normalize_lang_hint, select_syntax};
    use crate::format::ansi::strip_ansi;

    #[test]
    fn declared_language_selects_syntax() {
        let syntax = select_syntax(Some("python"), "x = 1").expect("python should be known");
        assert_eq!(syntax.name, "Python");
        let syntax = select_syntax(Some("rs"), "").expect("rust should be known");
        assert_eq!(syntax.name, "Rust");
    }

    #[test]
    fn unknown_language_falls_back_to_guess() {
        let syntax = select_syntax(Some("notalanguage"), "def main():\n    print('x')\n")
            .expect("python should be guessed");
        assert_eq!(syntax.name, "Python");
    }

    #[test]
    fn shebang_is_detected_from_first_line() {
        let syntax =
            select_syntax(None, "#!/bin/bash\nls -la\n").expect("shell should be detected");
        assert!(
            syntax.name.to_ascii_lowercase().contains("bash"),
            "unexpected syntax: {}",
            syntax.name
        );
    }

    #[test]
    fn unguessable_content_renders_plain() {
        assert!(select_syntax(None, "lorem ipsum dolor").is_none());
        assert!(select_syntax(Some("text"), "lorem ipsum").is_none());
    }

    #[test]
    fn guess_token_prefers_most_markers() {
        assert_eq!(guess_token("fn main() {\n    println!(\"hi\");\n}"), Some("rs"));
        assert_eq!(guess_token("{\"a\": 1}"), Some("json"));
        assert_eq!(guess_token("plain words"), None);
    }

    #[test]
    fn normalize_lang_hint_maps_aliases() {
        assert_eq!(normalize_lang_hint(" Python3 "), "py");
        assert_eq!(normalize_lang_hint("zsh"), "sh");
        assert_eq!(normalize_lang_hint("JSON"), "json");
    }

    #[test]
    fn highlighting_keeps_visible_text() {
        let syntax = select_syntax(Some("python"), "");
        let lines = highlight_lines("print(1)\nx = 2", syntax);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains('\x1b'));
        assert_eq!(strip_ansi(&lines[0]), "print(1)");
        assert_eq!(strip_ansi(&lines[1]), "x = 2");
    }

    #[test]
    fn plain_highlighting_returns_raw_lines() {
        assert_eq!(highlight_lines("a\nb", None), ["a", "b"]);
    }
}
