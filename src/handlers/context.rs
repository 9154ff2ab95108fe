use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::model::Message;

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn context_error(path: &Path, reason: impl ToString) -> ConfigError {
    ConfigError::ContextFile {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Reads a document to seed the conversation: PDFs are text-extracted, every
/// other file is read as UTF-8.
pub fn load_context_text(path: &Path) -> Result<String, ConfigError> {
    if !path.is_file() {
        return Err(context_error(path, "file does not exist"));
    }

    let text = if is_pdf(path) {
        debug!(path = %path.display(), "extracting text from pdf");
        pdf_extract::extract_text(path).map_err(|err| context_error(path, err))?
    } else {
        fs::read_to_string(path).map_err(|err| context_error(path, err))?
    };

    if text.trim().is_empty() {
        return Err(context_error(path, "no readable text found"));
    }
    info!(path = %path.display(), chars = text.chars().count(), "loaded context file");
    Ok(text)
}

pub fn context_message(path: &Path, text: &str) -> Message {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Message::system(format!(
        "The user has provided the document '{name}' as context. \
         Use it to answer their questions.\n\n{}",
        text.trim()
    ))
}

pub fn load_context_message(path: &Path) -> Result<Message, ConfigError> {
    let text = load_context_text(path)?;
    Ok(context_message(path, &text))
}
