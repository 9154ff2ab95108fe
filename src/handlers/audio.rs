use anyhow::{Context, Result, anyhow, bail};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

use crate::model_gateway::SpeechSynthesizer;

/// Players tried in order when `AUDIO_PLAYER` is unset.
const PLAYER_CANDIDATES: &[(&str, &[&str])] = &[
    ("afplay", &[]),
    ("mpg123", &["-q"]),
    ("ffplay", &["-nodisp", "-autoexit", "-loglevel", "quiet"]),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioOutcome {
    MissingCredential,
    NothingToSay,
    Failed(String),
    Saved { path: PathBuf, played: bool },
}

pub fn backup_path(destination: &Path) -> PathBuf {
    let mut name = OsString::from(destination.as_os_str());
    name.push(".bak");
    PathBuf::from(name)
}

/// Moves an existing file at `destination` to `<destination>.bak`, deleting
/// any older backup first.
pub fn rotate_backup(destination: &Path) -> io::Result<()> {
    if !destination.exists() {
        return Ok(());
    }
    let backup = backup_path(destination);
    if backup.exists() {
        fs::remove_file(&backup)?;
    }
    fs::rename(destination, &backup)?;
    debug!(backup = %backup.display(), "rotated previous audio file");
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PlayerCommand {
    program: String,
    args: Vec<String>,
}

fn parse_player(raw: &str) -> Option<PlayerCommand> {
    let mut parts = raw.split_whitespace().map(str::to_string);
    let program = parts.next()?;
    Some(PlayerCommand {
        program,
        args: parts.collect(),
    })
}

fn detect_player(configured: Option<&str>) -> Option<PlayerCommand> {
    if let Some(raw) = configured {
        return parse_player(raw);
    }
    PLAYER_CANDIDATES
        .iter()
        .find(|(program, _)| which::which(program).is_ok())
        .map(|(program, args)| PlayerCommand {
            program: (*program).to_string(),
            args: args.iter().map(|arg| (*arg).to_string()).collect(),
        })
}

/// Plays `path` to completion with an external player.
pub fn play_file(path: &Path, configured_player: Option<&str>) -> Result<()> {
    let player = detect_player(configured_player).ok_or_else(|| {
        anyhow!("No audio player found; set AUDIO_PLAYER or install afplay, mpg123 or ffplay")
    })?;
    debug!(player = %player.program, path = %path.display(), "playing audio");

    let status = Command::new(&player.program)
        .args(&player.args)
        .arg(path)
        .status()
        .with_context(|| format!("Failed to start audio player '{}'", player.program))?;
    if !status.success() {
        bail!("Audio player '{}' exited with {}", player.program, status);
    }
    Ok(())
}

/// Speaks `text` into `destination`, optionally playing it. Never fails the
/// caller: every problem is logged and reported through the outcome.
pub async fn synthesize_and_maybe_play<S>(
    speech: &S,
    text: &str,
    credential: Option<&str>,
    destination: &Path,
    play: bool,
    configured_player: Option<&str>,
) -> AudioOutcome
where
    S: SpeechSynthesizer + ?Sized,
{
    let Some(credential) = credential.filter(|key| !key.trim().is_empty()) else {
        warn!("audio requested but OPENAI_API_KEY is not set; skipping speech");
        return AudioOutcome::MissingCredential;
    };
    if text.trim().is_empty() {
        info!("response has no speakable text; skipping speech");
        return AudioOutcome::NothingToSay;
    }

    let audio = match speech.synthesize(text, credential).await {
        Ok(audio) => audio,
        Err(err) => {
            warn!(error = %err, "speech synthesis failed");
            return AudioOutcome::Failed(format!("{err:#}"));
        }
    };

    if let Err(err) = rotate_backup(destination) {
        warn!(error = %err, path = %destination.display(), "failed to back up previous audio");
    }
    if let Err(err) = fs::write(destination, &audio) {
        warn!(error = %err, path = %destination.display(), "failed to write audio file");
        return AudioOutcome::Failed(err.to_string());
    }
    info!(path = %destination.display(), bytes = audio.len(), "saved synthesized audio");

    let played = play
        && match play_file(destination, configured_player) {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "audio playback failed");
                eprintln!("Could not play audio: {err:#}");
                false
            }
        };

    AudioOutcome::Saved {
        path: destination.to_path_buf(),
        played,
    }
}
