use clap::Parser;
use openai_realtime_types::{Modality, ResponseConfig, Session, Voice};

/// Chat with an OpenAI Realtime model from the terminal.
///
/// Each line typed on stdin is sent as a user message; assistant replies are
/// streamed to stdout. Credentials come from `OPENAI_API_KEY`.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    /// Model id. Overrides `REALTIME_MODEL`.
    #[arg(long)]
    pub model: Option<String>,

    /// System instructions for the session.
    #[arg(long)]
    pub instructions: Option<String>,

    /// Output voice, e.g. `alloy` or `verse`.
    #[arg(long)]
    pub voice: Option<Voice>,

    /// Request text-only responses.
    #[arg(long)]
    pub text_only: bool,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Args {
    /// Whether any flag requires a `session.update` after connecting.
    pub fn changes_session(&self) -> bool {
        self.instructions.is_some() || self.voice.is_some() || self.text_only
    }

    pub fn apply(&self, session: &mut Session) {
        if let Some(instructions) = &self.instructions {
            session.instructions = instructions.clone();
        }
        if let Some(voice) = &self.voice {
            session.voice = voice.clone();
        }
        if self.text_only {
            session.modalities = vec![Modality::Text];
        }
    }

    /// Overrides sent with every `response.create`.
    pub fn response_config(&self) -> ResponseConfig {
        if self.text_only {
            ResponseConfig::text_only()
        } else {
            ResponseConfig::default()
        }
    }
}
