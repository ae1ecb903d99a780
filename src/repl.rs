//! Interactive terminal chat
//!
//! Parses each input line into a [`ReplCommand`] and dispatches it to the
//! session. The newest assistant turn's audio plays on the default output
//! device when autoplay is on.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::pipeline::TurnSynthesisPipeline;
use crate::session::{Role, Session};
use crate::voice::{AudioPlayback, record_reference};
use crate::{Error, Result};

const DEFAULT_RECORD_SECS: u64 = 5;

const HELP: &str = "\
Commands:
  <text>              send a message
  /rewind             undo the last question and answer
  /clear              clear the conversation
  /lang [label]       show languages or switch language
  /record [seconds]   record a new reference voice sample
  /reference <path>   use a WAV file as the reference voice
  /history            show the conversation
  /audio on|off       toggle autoplay of replies
  /help               show this help
  /quit               exit";

/// One parsed line of terminal input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Submit(String),
    Rewind,
    Clear,
    ListLanguages,
    SelectLanguage(String),
    Record(Duration),
    UseReference(PathBuf),
    History,
    Autoplay(bool),
    Help,
    Quit,
    Empty,
    Invalid(String),
}

impl ReplCommand {
    /// Parse a line of input
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Submit(line.to_string());
        };

        let (name, arg) = command
            .split_once(char::is_whitespace)
            .map_or((command, ""), |(n, a)| (n, a.trim()));

        match (name, arg) {
            ("rewind" | "undo", _) => Self::Rewind,
            ("clear", _) => Self::Clear,
            ("lang" | "language" | "languages", "") => Self::ListLanguages,
            ("lang" | "language", label) => Self::SelectLanguage(label.to_string()),
            ("record", "") => Self::Record(Duration::from_secs(DEFAULT_RECORD_SECS)),
            ("record", secs) => secs.parse::<u64>().map_or_else(
                |_| Self::Invalid(format!("not a number of seconds: {secs}")),
                |s| Self::Record(Duration::from_secs(s.max(1))),
            ),
            ("reference" | "ref", "") => Self::Invalid("usage: /reference <path>".to_string()),
            ("reference" | "ref", path) => Self::UseReference(PathBuf::from(path)),
            ("history", _) => Self::History,
            ("audio", "on") => Self::Autoplay(true),
            ("audio", "off") => Self::Autoplay(false),
            ("audio", _) => Self::Invalid("usage: /audio on|off".to_string()),
            ("help" | "?", _) => Self::Help,
            ("quit" | "exit" | "q", _) => Self::Quit,
            (other, _) => Self::Invalid(format!("unknown command: /{other}")),
        }
    }
}

/// Terminal front-end over one session
pub struct Repl {
    session: Session,
    pipeline: TurnSynthesisPipeline,
    reference_path: PathBuf,
    autoplay: bool,
    playback: Option<AudioPlayback>,
}

impl Repl {
    #[must_use]
    pub fn new(
        session: Session,
        pipeline: TurnSynthesisPipeline,
        reference_path: PathBuf,
        autoplay: bool,
    ) -> Self {
        Self {
            session,
            pipeline,
            reference_path,
            autoplay,
            playback: None,
        }
    }

    /// Read commands from stdin until EOF or `/quit`
    ///
    /// # Errors
    ///
    /// Returns error if stdin cannot be read
    #[allow(clippy::future_not_send)]
    pub async fn run(&mut self) -> Result<()> {
        println!(
            "Voice chat ({}). Type /help for commands.",
            self.session.language().selected_label()
        );
        if self.session.language().reference_audio().is_none() {
            println!("No reference voice yet: /record or /reference <path> before chatting.");
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            if !self.dispatch(ReplCommand::parse(&line)).await {
                break;
            }
        }
        Ok(())
    }

    /// Execute one command; returns `false` to stop
    #[allow(clippy::future_not_send)]
    pub async fn dispatch(&mut self, command: ReplCommand) -> bool {
        match command {
            ReplCommand::Submit(prompt) => self.submit(&prompt).await,
            ReplCommand::Rewind => {
                self.session.rewind();
                println!("rewound ({} turns left)", self.session.history().len());
            }
            ReplCommand::Clear => {
                self.session.clear();
                println!("history cleared");
            }
            ReplCommand::ListLanguages => {
                let current = self.session.language().selected_label();
                for label in self.session.catalog().selectable_labels() {
                    let marker = if label == current { "*" } else { " " };
                    println!("{marker} {label}");
                }
            }
            ReplCommand::SelectLanguage(label) => match self.session.select_language(&label) {
                Ok(()) => println!(
                    "language: {} ({})",
                    self.session.language().selected_label(),
                    self.session.language().language_code()
                ),
                Err(e) => println!("error: {e}"),
            },
            ReplCommand::Record(duration) => {
                println!("recording for {}s, speak now...", duration.as_secs());
                match record_reference(duration, &self.reference_path).await {
                    Ok(reference) => {
                        self.session.set_reference_audio(reference);
                        println!("recording complete");
                    }
                    Err(e) => println!("error: {e}"),
                }
            }
            ReplCommand::UseReference(path) => match self.session.set_reference_path(path) {
                Ok(()) => println!("reference voice updated"),
                Err(e) => println!("error: {e}"),
            },
            ReplCommand::History => self.print_history(),
            ReplCommand::Autoplay(on) => {
                self.autoplay = on;
                println!("autoplay {}", if on { "on" } else { "off" });
            }
            ReplCommand::Help => println!("{HELP}"),
            ReplCommand::Quit => return false,
            ReplCommand::Empty => {}
            ReplCommand::Invalid(message) => println!("{message}"),
        }
        true
    }

    #[allow(clippy::future_not_send)]
    async fn submit(&mut self, prompt: &str) {
        match self.session.submit(&self.pipeline, prompt).await {
            Ok(turn) => println!("assistant: {}", turn.text),
            Err(e) => {
                if let Some(text) = e.response_text() {
                    println!("assistant: {text}");
                    println!("(no audio: {e})");
                } else {
                    println!("error: {e}");
                }
                return;
            }
        }

        if self.autoplay {
            if let Err(e) = self.play_latest().await {
                tracing::warn!(error = %e, "autoplay failed");
            }
        }
    }

    /// Play the newest assistant turn's audio, if it is the newest turn
    #[allow(clippy::future_not_send)]
    async fn play_latest(&mut self) -> Result<()> {
        let history = self.session.history();
        let Some(index) = history.len().checked_sub(1) else {
            return Ok(());
        };
        if !history.is_latest_assistant_turn(index) {
            return Ok(());
        }
        let Some(audio) = history.get(index).and_then(|t| t.audio.as_ref()) else {
            return Ok(());
        };

        if self.playback.is_none() {
            self.playback = Some(AudioPlayback::new()?);
        }
        match self.playback.as_mut() {
            Some(playback) => playback.play(audio).await,
            None => Err(Error::Audio("no playback device".to_string())),
        }
    }

    fn print_history(&self) {
        let history = self.session.history();
        if history.is_empty() {
            println!("(empty)");
            return;
        }
        for (index, turn) in history.iter().enumerate() {
            let who = match turn.role {
                Role::User => "you",
                Role::Assistant => "assistant",
            };
            let audio = match &turn.audio {
                Some(a) if history.is_latest_assistant_turn(index) => {
                    format!(" [audio {:.1}s, autoplay]", a.duration_secs())
                }
                Some(a) => format!(" [audio {:.1}s]", a.duration_secs()),
                None => String::new(),
            };
            println!("{index:>3} {who}: {}{audio}", turn.text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_submits() {
        assert_eq!(
            ReplCommand::parse("  안녕  "),
            ReplCommand::Submit("안녕".to_string())
        );
        assert_eq!(ReplCommand::parse("   "), ReplCommand::Empty);
    }

    #[test]
    fn test_session_commands() {
        assert_eq!(ReplCommand::parse("/rewind"), ReplCommand::Rewind);
        assert_eq!(ReplCommand::parse("/undo"), ReplCommand::Rewind);
        assert_eq!(ReplCommand::parse("/clear"), ReplCommand::Clear);
        assert_eq!(ReplCommand::parse("/history"), ReplCommand::History);
        assert_eq!(ReplCommand::parse("/quit"), ReplCommand::Quit);
    }

    #[test]
    fn test_language_commands() {
        assert_eq!(ReplCommand::parse("/lang"), ReplCommand::ListLanguages);
        assert_eq!(
            ReplCommand::parse("/lang Korean"),
            ReplCommand::SelectLanguage("Korean".to_string())
        );
    }

    #[test]
    fn test_record_duration() {
        assert_eq!(
            ReplCommand::parse("/record"),
            ReplCommand::Record(Duration::from_secs(DEFAULT_RECORD_SECS))
        );
        assert_eq!(
            ReplCommand::parse("/record 8"),
            ReplCommand::Record(Duration::from_secs(8))
        );
        assert!(matches!(ReplCommand::parse("/record soon"), ReplCommand::Invalid(_)));
    }

    #[test]
    fn test_reference_and_audio() {
        assert_eq!(
            ReplCommand::parse("/reference /tmp/me.wav"),
            ReplCommand::UseReference(PathBuf::from("/tmp/me.wav"))
        );
        assert!(matches!(ReplCommand::parse("/reference"), ReplCommand::Invalid(_)));
        assert_eq!(ReplCommand::parse("/audio off"), ReplCommand::Autoplay(false));
        assert!(matches!(ReplCommand::parse("/dance"), ReplCommand::Invalid(_)));
    }
}
