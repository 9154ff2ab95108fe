use anyhow::{Context, Result};
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::format::CodeBlock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    NothingToSave,
    Cancelled,
    Saved(PathBuf),
}

fn comment_prefix(language: &str) -> &'static str {
    match language.trim().to_ascii_lowercase().as_str() {
        "python" | "py" | "bash" | "sh" | "zsh" | "shell" | "ruby" | "rb" | "perl" | "r"
        | "yaml" | "yml" | "toml" | "dockerfile" | "makefile" | "powershell" | "ps1" => "#",
        "sql" | "lua" | "haskell" | "hs" => "--",
        _ => "//",
    }
}

/// Concatenates blocks with a language comment before each tagged block and a
/// blank line between blocks.
pub fn render_code_file(blocks: &[CodeBlock]) -> String {
    let mut out = String::new();
    for (idx, block) in blocks.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        if let Some(language) = block.language.as_deref().filter(|lang| !lang.is_empty()) {
            out.push_str(&format!("{} Language: {}\n", comment_prefix(language), language));
        }
        out.push_str(&block.code);
        out.push('\n');
    }
    out
}

fn resolve_destination(working_directory: &Path, file_name: &str) -> PathBuf {
    let path = Path::new(file_name);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_directory.join(path)
    }
}

/// Asks for a file name and writes every block to it, overwriting any
/// existing file. An empty answer cancels.
pub fn save_code<R: BufRead, W: Write>(
    blocks: &[CodeBlock],
    working_directory: &Path,
    input: &mut R,
    output: &mut W,
) -> Result<SaveOutcome> {
    if blocks.is_empty() {
        writeln!(output, "No code blocks found in the response; nothing to save.")?;
        return Ok(SaveOutcome::NothingToSave);
    }

    write!(
        output,
        "Save {} code block(s) to file (relative to {}; empty to skip): ",
        blocks.len(),
        working_directory.display()
    )?;
    output.flush().context("Failed to flush stdout")?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("Failed to read file name")?;
    let file_name = answer.trim();
    if file_name.is_empty() {
        writeln!(output, "Not saving code.")?;
        return Ok(SaveOutcome::Cancelled);
    }

    let destination = resolve_destination(working_directory, file_name);
    fs::write(&destination, render_code_file(blocks))
        .with_context(|| format!("Failed to write code to '{}'", destination.display()))?;
    info!(path = %destination.display(), blocks = blocks.len(), "saved code blocks");
    writeln!(output, "Code saved to {}", destination.display())?;
    Ok(SaveOutcome::Saved(destination))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::{Cursor, Read};
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::{SaveOutcome, comment_prefix, render_code_file, resolve_destination, save_code};
    use crate::format::CodeBlock;

    fn unique_temp_dir(suffix: &str) -> PathBuf {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock should be after unix epoch")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "aiask-code-{suffix}-{stamp}-{}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).expect("failed to create temp directory");
        dir
    }

    fn block(language: Option<&str>, code: &str) -> CodeBlock {
        CodeBlock {
            language: language.map(str::to_string),
            code: code.to_string(),
        }
    }

    #[test]
    fn empty_block_list_prints_notice_without_prompting() {
        let mut input = Cursor::new(b"should-not-be-read\n".to_vec());
        let mut output = Vec::new();

        let outcome = save_code(&[], Path::new("."), &mut input, &mut output)
            .expect("save should succeed");

        assert_eq!(outcome, SaveOutcome::NothingToSave);
        let printed = String::from_utf8(output).expect("utf8 output");
        assert!(printed.contains("No code blocks"), "unexpected output: {printed}");
        assert!(!printed.contains("Save"), "should not prompt: {printed}");
        let mut unread = String::new();
        input.read_to_string(&mut unread).expect("read rest");
        assert_eq!(unread, "should-not-be-read\n");
    }

    #[test]
    fn empty_file_name_cancels() {
        let dir = unique_temp_dir("cancel");
        let mut input = Cursor::new(b"   \n".to_vec());
        let mut output = Vec::new();

        let outcome = save_code(&[block(None, "x")], &dir, &mut input, &mut output)
            .expect("save should succeed");

        assert_eq!(outcome, SaveOutcome::Cancelled);
        assert_eq!(fs::read_dir(&dir).expect("read dir").count(), 0);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn writes_blocks_relative_to_working_directory_and_overwrites() {
        let dir = unique_temp_dir("write");
        fs::write(dir.join("out.py"), "old contents").expect("seed file");
        let blocks = [
            block(Some("python"), "print('hello')"),
            block(None, "plain"),
            block(Some("rust"), "fn main() {}"),
        ];
        let mut input = Cursor::new(b"out.py\n".to_vec());
        let mut output = Vec::new();

        let outcome =
            save_code(&blocks, &dir, &mut input, &mut output).expect("save should succeed");

        assert_eq!(outcome, SaveOutcome::Saved(dir.join("out.py")));
        let written = fs::read_to_string(dir.join("out.py")).expect("read saved file");
        assert_eq!(
            written,
            "# Language: python\nprint('hello')\n\nplain\n\n// Language: rust\nfn main() {}\n"
        );
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn absolute_destination_is_kept() {
        let absolute = std::env::temp_dir().join("aiask-abs.txt");
        assert_eq!(
            resolve_destination(Path::new("/somewhere/else"), absolute.to_str().expect("utf8")),
            absolute
        );
        assert_eq!(
            resolve_destination(Path::new("/work"), "a/b.rs"),
            PathBuf::from("/work/a/b.rs")
        );
    }

    #[test]
    fn comment_prefix_follows_language_family() {
        assert_eq!(comment_prefix("Python"), "#");
        assert_eq!(comment_prefix("sql"), "--");
        assert_eq!(comment_prefix("javascript"), "//");
    }

    #[test]
    fn single_block_has_no_separator() {
        assert_eq!(render_code_file(&[block(None, "x")]), "x\n");
    }
}
