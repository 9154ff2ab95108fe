//! Turns raw model output into terminal-ready text.
//!
//! Fenced code blocks are pulled out, highlighted and drawn as full-width
//! background panels; everything else passes through untouched and doubles as
//! the speakable part of the answer.

pub mod ansi;
pub mod highlight;

const FENCE: &str = "```";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub language: Option<String>,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedResponse {
    pub code_blocks: Vec<CodeBlock>,
    pub text_paragraphs: Vec<String>,
    pub display_text: String,
}

impl FormattedResponse {
    /// Prose with code removed, ready for speech synthesis.
    pub fn speakable_text(&self) -> String {
        self.text_paragraphs
            .iter()
            .map(|paragraph| paragraph.trim())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Text(&'a str),
    Code(CodeBlock),
}

struct OpenFence {
    fence_start: usize,
    body_start: usize,
    language: Option<String>,
}

fn opening_fence_language(line: &str) -> Option<Option<String>> {
    let rest = line.trim_start().strip_prefix(FENCE)?;
    if rest.starts_with('`') || rest.contains(FENCE) {
        return None;
    }
    Some(rest.split_whitespace().next().map(str::to_string))
}

fn is_closing_fence(line: &str) -> bool {
    line.trim() == FENCE
}

/// Splits `text` into prose and fenced code, in order. An unterminated fence
/// stays part of the surrounding prose.
fn split_segments(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut offset = 0;
    let mut open: Option<OpenFence> = None;

    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();

        match open.take() {
            None => {
                if let Some(language) = opening_fence_language(line) {
                    open = Some(OpenFence {
                        fence_start: line_start,
                        body_start: offset,
                        language,
                    });
                }
            }
            Some(fence) if is_closing_fence(line) => {
                if text_start < fence.fence_start {
                    segments.push(Segment::Text(&text[text_start..fence.fence_start]));
                }
                let body = &text[fence.body_start..line_start];
                let code = body
                    .strip_suffix('\n')
                    .map(|body| body.strip_suffix('\r').unwrap_or(body))
                    .unwrap_or(body);
                segments.push(Segment::Code(CodeBlock {
                    language: fence.language,
                    code: code.to_string(),
                }));
                text_start = offset;
            }
            still_open => open = still_open,
        }
    }

    if text_start < text.len() {
        segments.push(Segment::Text(&text[text_start..]));
    }
    segments
}

pub fn extract_code_blocks(text: &str) -> Vec<CodeBlock> {
    split_segments(text)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Code(block) => Some(block),
            Segment::Text(_) => None,
        })
        .collect()
}

fn detab(line: &str) -> String {
    line.replace('\t', "    ")
}

/// Renders one block as a highlighted panel whose every line, including a
/// blank frame line above and below, spans exactly `width` columns. Lines
/// longer than `width` continue on the next band.
pub fn render_code_block(block: &CodeBlock, width: usize) -> String {
    let code = detab(&block.code);
    let syntax = highlight::select_syntax(block.language.as_deref(), &code);
    let background = ansi::background_escape(highlight::panel_background());

    let mut rendered = ansi::band_line("", width, &background);
    rendered.push('\n');
    for line in highlight::highlight_lines(&code, syntax) {
        for band in ansi::band_lines(&line, width, &background) {
            rendered.push_str(&band);
            rendered.push('\n');
        }
    }
    rendered.push_str(&ansi::band_line("", width, &background));
    rendered.push('\n');
    rendered
}

pub fn format_response(raw: &str) -> FormattedResponse {
    format_response_with_width(raw, ansi::terminal_width())
}

pub fn format_response_with_width(raw: &str, width: usize) -> FormattedResponse {
    let mut code_blocks = Vec::new();
    let mut text_paragraphs = Vec::new();
    let mut display_text = String::with_capacity(raw.len());

    for segment in split_segments(raw) {
        match segment {
            Segment::Text(text) => {
                display_text.push_str(text);
                if !text.trim().is_empty() {
                    text_paragraphs.push(text.to_string());
                }
            }
            Segment::Code(block) => {
                display_text.push_str(&render_code_block(&block, width));
                code_blocks.push(block);
            }
        }
    }

    FormattedResponse {
        code_blocks,
        text_paragraphs,
        display_text,
    }
}
