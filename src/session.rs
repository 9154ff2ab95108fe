use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use tracing::{debug, info, warn};

use crate::config::{Config, RuntimeSettings};
use crate::format::{self, FormattedResponse};
use crate::handlers::audio::{self, AudioOutcome};
use crate::handlers::code_save::{self, SaveOutcome};
use crate::model::{CompletionParams, CompletionRequest, Message};
use crate::model_gateway::{CompletionClient, SpeechSynthesizer};
use crate::spinner::Spinner;

const QUIT_COMMAND: &str = "quit";
const NO_RESPONSE_NOTICE: &str = "No response could be generated.";

/// Append-only message log. The seed (system prompt plus any context
/// document) is kept so `/reset` can restore it.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    seed: Vec<Message>,
    history: Vec<Message>,
}

impl Conversation {
    pub fn new(system_prompt: &str, context: Option<Message>) -> Self {
        let mut seed = Vec::new();
        if !system_prompt.trim().is_empty() {
            seed.push(Message::system(system_prompt));
        }
        seed.extend(context);
        Self {
            history: seed.clone(),
            seed,
        }
    }

    pub fn reset(&mut self) {
        self.history = self.seed.clone();
    }

    pub fn messages(&self) -> &[Message] {
        &self.history
    }

    fn push(&mut self, message: Message) {
        self.history.push(message);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnOutcome {
    Answered,
    Failed,
}

enum Command<'a> {
    Quit,
    Skip,
    History,
    Reset,
    Prompt(&'a str),
}

fn parse_command(line: &str) -> Command<'_> {
    let prompt = line.trim();
    if prompt.is_empty() {
        Command::Skip
    } else if prompt.eq_ignore_ascii_case(QUIT_COMMAND) {
        Command::Quit
    } else if prompt.eq_ignore_ascii_case("/history") {
        Command::History
    } else if prompt.eq_ignore_ascii_case("/reset") {
        Command::Reset
    } else {
        Command::Prompt(prompt)
    }
}

pub struct Session<'a, C: ?Sized, S: ?Sized> {
    completion: &'a C,
    speech: &'a S,
    config: &'a Config,
    settings: &'a RuntimeSettings,
    params: CompletionParams,
    conversation: Conversation,
}

impl<'a, C, S> Session<'a, C, S>
where
    C: CompletionClient + ?Sized,
    S: SpeechSynthesizer + ?Sized,
{
    pub fn new(
        completion: &'a C,
        speech: &'a S,
        config: &'a Config,
        settings: &'a RuntimeSettings,
        context: Option<Message>,
    ) -> Self {
        Self {
            completion,
            speech,
            config,
            settings,
            params: CompletionParams {
                max_tokens: settings.max_tokens,
                temperature: settings.temperature,
                api_base: settings.api_base(),
            },
            conversation: Conversation::new(&config.system_prompt, context),
        }
    }

    pub fn history(&self) -> &[Message] {
        self.conversation.messages()
    }

    /// Answers `first_prompt`, then keeps reading follow-ups from `input`
    /// while the provider is interactive. A failed turn ends the session.
    pub async fn run<R: BufRead, W: Write>(
        &mut self,
        first_prompt: &str,
        input: &mut R,
        output: &mut W,
    ) -> Result<()> {
        if self.run_turn(first_prompt, input, output).await? == TurnOutcome::Failed {
            return Ok(());
        }
        if !self.settings.interactive() {
            return Ok(());
        }

        writeln!(
            output,
            "\nAsk a follow-up, '/history' to inspect the conversation, '/reset' to clear it, or '{QUIT_COMMAND}' to exit"
        )?;

        loop {
            write!(output, "> ")?;
            output.flush().context("Failed to flush stdout")?;

            let mut line = String::new();
            let read = input.read_line(&mut line).context("Failed to read stdin")?;
            if read == 0 {
                debug!("input closed; ending session");
                break;
            }

            match parse_command(&line) {
                Command::Skip => continue,
                Command::Quit => break,
                Command::Reset => {
                    self.conversation.reset();
                    writeln!(output, "conversation reset\n")?;
                }
                Command::History => print_history(self.conversation.messages(), output)?,
                Command::Prompt(prompt) => {
                    if self.run_turn(prompt, input, output).await? == TurnOutcome::Failed {
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    async fn run_turn<R: BufRead, W: Write>(
        &mut self,
        prompt: &str,
        input: &mut R,
        output: &mut W,
    ) -> Result<TurnOutcome> {
        self.conversation.push(Message::user(prompt));

        let request = CompletionRequest {
            provider: self.settings.provider,
            model: &self.settings.selected_model,
            credential: self.settings.credential.as_deref(),
            messages: self.conversation.messages(),
            params: &self.params,
        };
        debug!(
            provider = self.settings.provider.name,
            model = %self.settings.selected_model,
            messages = request.messages.len(),
            "requesting completion"
        );

        let spinner = Spinner::start();
        let result = self.completion.complete(request).await;
        spinner.stop();

        let completion = match result {
            Ok(completion) => completion,
            Err(err) => {
                warn!(error = %err, provider = self.settings.provider.name, "completion failed");
                writeln!(output, "Error getting AI response: {err:#}")?;
                writeln!(output, "{NO_RESPONSE_NOTICE}")?;
                return Ok(TurnOutcome::Failed);
            }
        };
        info!(
            model = %self.settings.selected_model,
            cost = completion.cost,
            "received completion"
        );

        let formatted = format::format_response(&completion.text);
        writeln!(
            output,
            "model: {} | cost: ${:.6}\n",
            self.settings.selected_model, completion.cost
        )?;
        writeln!(output, "{}", formatted.display_text.trim_end_matches('\n'))?;

        if self.settings.save_code {
            self.save_code(&formatted, input, output)?;
        }
        if self.settings.audio {
            self.speak(&formatted, output).await?;
        }

        self.conversation.push(Message::assistant(completion.text));
        Ok(TurnOutcome::Answered)
    }

    fn save_code<R: BufRead, W: Write>(
        &self,
        formatted: &FormattedResponse,
        input: &mut R,
        output: &mut W,
    ) -> Result<()> {
        match code_save::save_code(
            &formatted.code_blocks,
            &self.settings.working_directory,
            input,
            output,
        ) {
            Ok(SaveOutcome::Saved(path)) => debug!(path = %path.display(), "code saved"),
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "saving code failed");
                writeln!(output, "Failed to save code: {err:#}")?;
            }
        }
        Ok(())
    }

    async fn speak<W: Write>(&self, formatted: &FormattedResponse, output: &mut W) -> Result<()> {
        let outcome = audio::synthesize_and_maybe_play(
            self.speech,
            &formatted.speakable_text(),
            self.config.speech_credential.as_deref(),
            &self.config.audio_destination(),
            self.settings.play_audio,
            self.config.audio_player.as_deref(),
        )
        .await;

        match outcome {
            AudioOutcome::Saved { path, .. } => {
                writeln!(output, "Audio saved to {}", path.display())?
            }
            AudioOutcome::MissingCredential => {
                writeln!(output, "Audio skipped: OPENAI_API_KEY is not set.")?
            }
            AudioOutcome::NothingToSay => {
                writeln!(output, "Audio skipped: the response has no text to speak.")?
            }
            AudioOutcome::Failed(reason) => writeln!(output, "Audio failed: {reason}")?,
        }
        Ok(())
    }
}

fn print_history<W: Write>(history: &[Message], output: &mut W) -> Result<()> {
    if history.is_empty() {
        writeln!(output, "(history is empty)\n")?;
        return Ok(());
    }

    for (idx, msg) in history.iter().enumerate() {
        writeln!(output, "[{}] {}: {}", idx, msg.role.as_str(), msg.content)?;
    }
    writeln!(output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use serde_json::Value;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::fs;
    use std::io::Cursor;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::{Conversation, Session};
    use crate::config::{Config, RuntimeSettings};
    use crate::model::{CompletionRequest, CompletionResult, Message, MessageRole};
    use crate::model_gateway::{
        CompletionClient, CompletionFuture, SpeechFuture, SpeechSynthesizer,
    };
    use crate::providers::{OLLAMA_BASE_URL, ProviderId, provider};

    struct StubClient {
        replies: RefCell<VecDeque<Result<String, String>>>,
        calls: RefCell<Vec<Vec<Message>>>,
        api_bases: RefCell<Vec<Option<String>>>,
    }

    impl StubClient {
        fn new(replies: Vec<Result<&str, &str>>) -> Self {
            Self {
                replies: RefCell::new(
                    replies
                        .into_iter()
                        .map(|reply| reply.map(str::to_string).map_err(str::to_string))
                        .collect(),
                ),
                calls: RefCell::new(Vec::new()),
                api_bases: RefCell::new(Vec::new()),
            }
        }
    }

    impl CompletionClient for StubClient {
        fn complete<'a>(&'a self, request: CompletionRequest<'a>) -> CompletionFuture<'a> {
            self.calls.borrow_mut().push(request.messages.to_vec());
            self.api_bases
                .borrow_mut()
                .push(request.params.api_base.clone());
            let reply = self
                .replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err("no reply queued".to_string()));
            Box::pin(async move {
                reply
                    .map(|text| CompletionResult::from_parts(Some(text), Some(0.0012), Value::Null))
                    .map_err(|err| anyhow!(err))
            })
        }
    }

    #[derive(Default)]
    struct StubSpeech {
        calls: RefCell<Vec<String>>,
    }

    impl SpeechSynthesizer for StubSpeech {
        fn synthesize<'a>(&'a self, text: &'a str, _credential: &'a str) -> SpeechFuture<'a> {
            self.calls.borrow_mut().push(text.to_string());
            Box::pin(async { Ok(b"mp3".to_vec()) })
        }
    }

    fn unique_temp_dir(suffix: &str) -> PathBuf {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock should be after unix epoch")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "aiask-session-{suffix}-{stamp}-{}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).expect("failed to create temp directory");
        dir
    }

    fn config() -> Config {
        Config::from_env_with(|key| match key {
            "SYSTEM_PROMPT" => Some("Be brief.".to_string()),
            _ => None,
        })
    }

    fn settings(id: ProviderId) -> RuntimeSettings {
        let provider = provider(id);
        RuntimeSettings {
            provider,
            selected_model: provider.default_model.to_string(),
            credential: (!provider.is_local()).then(|| "key".to_string()),
            max_tokens: 500,
            temperature: 0.2,
            working_directory: PathBuf::from("."),
            save_code: false,
            audio: false,
            play_audio: false,
            context_file: None,
        }
    }

    async fn run_session(
        client: &StubClient,
        settings: &RuntimeSettings,
        input: &str,
    ) -> (Vec<Message>, String) {
        let config = config();
        let speech = StubSpeech::default();
        let mut session = Session::new(client, &speech, &config, settings, None);
        let mut input = Cursor::new(input.as_bytes().to_vec());
        let mut output = Vec::new();
        session
            .run("first question", &mut input, &mut output)
            .await
            .expect("session should finish");
        (
            session.history().to_vec(),
            String::from_utf8(output).expect("utf8 output"),
        )
    }

    #[test]
    fn conversation_reset_restores_seed() {
        let mut conversation =
            Conversation::new("sys", Some(Message::system("document")));
        conversation.push(Message::user("hi"));
        conversation.reset();
        assert_eq!(
            conversation.messages(),
            [Message::system("sys"), Message::system("document")]
        );
    }

    #[test]
    fn blank_system_prompt_is_not_seeded() {
        assert!(Conversation::new("  ", None).messages().is_empty());
    }

    #[tokio::test]
    async fn single_shot_makes_exactly_one_call() {
        let client = StubClient::new(vec![Ok("Answer one"), Ok("never used")]);
        let settings = settings(ProviderId::Anthropic);

        let (history, output) = run_session(&client, &settings, "follow up\n").await;

        assert_eq!(client.calls.borrow().len(), 1);
        assert_eq!(client.api_bases.borrow().as_slice(), [None]);
        assert_eq!(
            history,
            [
                Message::system("Be brief."),
                Message::user("first question"),
                Message::assistant("Answer one"),
            ]
        );
        assert!(
            output.contains("model: claude-3-5-sonnet-20240620 | cost: $0.001200"),
            "unexpected output: {output}"
        );
        assert!(output.contains("Answer one"));
    }

    #[tokio::test]
    async fn interactive_replays_full_history_and_stops_on_quit() {
        let client = StubClient::new(vec![Ok("A1"), Ok("A2"), Ok("never used")]);
        let settings = settings(ProviderId::Ollama);

        let (history, _) =
            run_session(&client, &settings, "second question\n  QUIT  \nthird\n").await;

        let calls = client.calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[1],
            [
                Message::system("Be brief."),
                Message::user("first question"),
                Message::assistant("A1"),
                Message::user("second question"),
            ]
        );
        assert_eq!(
            client.api_bases.borrow()[0].as_deref(),
            Some(OLLAMA_BASE_URL)
        );
        assert_eq!(history.len(), 5);
        assert_eq!(history[4], Message::assistant("A2"));
    }

    #[tokio::test]
    async fn end_of_input_ends_interactive_session() {
        let client = StubClient::new(vec![Ok("A1")]);
        let settings = settings(ProviderId::Ollama);

        let (history, _) = run_session(&client, &settings, "\n\n").await;

        assert_eq!(client.calls.borrow().len(), 1);
        assert_eq!(history.len(), 3);
    }

    #[tokio::test]
    async fn provider_error_ends_session_without_assistant_message() {
        let client = StubClient::new(vec![Err("connection refused"), Ok("never used")]);
        let settings = settings(ProviderId::Ollama);

        let (history, output) = run_session(&client, &settings, "more\n").await;

        assert_eq!(client.calls.borrow().len(), 1);
        assert!(
            output.contains(
                "Error getting AI response: connection refused\nNo response could be generated.\n"
            ),
            "unexpected output: {output}"
        );
        assert!(history.iter().all(|msg| msg.role != MessageRole::Assistant));
        assert!(!output.contains("> "), "should not prompt again: {output}");
    }

    #[tokio::test]
    async fn history_and_reset_commands_skip_the_network() {
        let client = StubClient::new(vec![Ok("A1")]);
        let settings = settings(ProviderId::Ollama);

        let (history, output) = run_session(&client, &settings, "/history\n/reset\nquit\n").await;

        assert_eq!(client.calls.borrow().len(), 1);
        assert!(output.contains("[1] user: first question"), "unexpected output: {output}");
        assert!(output.contains("conversation reset"));
        assert_eq!(history, [Message::system("Be brief.")]);
    }

    #[tokio::test]
    async fn context_message_follows_system_prompt() {
        let client = StubClient::new(vec![Ok("A1")]);
        let settings = settings(ProviderId::Ollama);
        let config = config();
        let speech = StubSpeech::default();
        let mut session = Session::new(
            &client,
            &speech,
            &config,
            &settings,
            Some(Message::system("document body")),
        );
        let mut input = Cursor::new(Vec::new());
        let mut output = Vec::new();

        session
            .run("summarize", &mut input, &mut output)
            .await
            .expect("session should finish");

        assert_eq!(
            client.calls.borrow()[0],
            [
                Message::system("Be brief."),
                Message::system("document body"),
                Message::user("summarize"),
            ]
        );
    }

    #[tokio::test]
    async fn save_code_reads_file_name_from_input() {
        let dir = unique_temp_dir("save");
        let client = StubClient::new(vec![Ok("Here:\n```python\nprint('hello')\n```\n")]);
        let mut settings = settings(ProviderId::OpenAi);
        settings.save_code = true;
        settings.working_directory = dir.clone();

        let (history, _) = run_session(&client, &settings, "hello.py\n").await;

        assert_eq!(
            fs::read_to_string(dir.join("hello.py")).expect("read saved code"),
            "# Language: python\nprint('hello')\n"
        );
        assert_eq!(history.last().map(|msg| msg.role), Some(MessageRole::Assistant));
        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn audio_without_credential_is_skipped() {
        let client = StubClient::new(vec![Ok("Spoken words")]);
        let mut settings = settings(ProviderId::Mistral);
        settings.audio = true;
        let config = config();
        let speech = StubSpeech::default();
        let mut session = Session::new(&client, &speech, &config, &settings, None);
        let mut input = Cursor::new(Vec::new());
        let mut output = Vec::new();

        session
            .run("say something", &mut input, &mut output)
            .await
            .expect("session should finish");

        let output = String::from_utf8(output).expect("utf8 output");
        assert!(output.contains("Audio skipped"), "unexpected output: {output}");
        assert!(speech.calls.borrow().is_empty());
    }

    #[tokio::test]
    async fn audio_speaks_only_prose() {
        let dir = unique_temp_dir("audio");
        let client = StubClient::new(vec![Ok("Intro\n```sh\nls\n```\nOutro")]);
        let mut settings = settings(ProviderId::OpenAi);
        settings.audio = true;
        let audio_file = dir.join("answer.mp3");
        let config = Config::from_env_with(|key| match key {
            "OPENAI_API_KEY" => Some("sk".to_string()),
            "AUDIO_FILE" => Some(audio_file.display().to_string()),
            _ => None,
        });
        let speech = StubSpeech::default();
        let mut session = Session::new(&client, &speech, &config, &settings, None);
        let mut input = Cursor::new(Vec::new());
        let mut output = Vec::new();

        session
            .run("list files", &mut input, &mut output)
            .await
            .expect("session should finish");

        assert_eq!(speech.calls.borrow().as_slice(), ["Intro\n\nOutro"]);
        assert_eq!(fs::read(&audio_file).expect("read audio"), b"mp3");
        let _ = fs::remove_dir_all(&dir);
    }
}
