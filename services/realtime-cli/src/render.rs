use openai_realtime::ConversationState;
use openai_realtime_types::Role;
use std::collections::HashMap;

/// Turns successive state snapshots into the assistant text that has not
/// been printed yet.
#[derive(Debug, Default)]
pub struct TranscriptPrinter {
    printed: HashMap<String, String>,
    last_item: Option<String>,
}

impl TranscriptPrinter {
    pub fn next_chunk(&mut self, state: &ConversationState) -> String {
        let mut out = String::new();
        for message in state.messages().filter(|m| m.role == Role::Assistant) {
            let text = message.text();
            let printed = self.printed.entry(message.id.clone()).or_default();
            if *printed == text {
                continue;
            }

            if self.last_item.as_deref() != Some(message.id.as_str()) {
                if self.last_item.is_some() {
                    out.push('\n');
                }
                self.last_item = Some(message.id.clone());
            }

            match text.strip_prefix(printed.as_str()) {
                Some(rest) => out.push_str(rest),
                // A done event replaced the streamed text.
                None => {
                    out.push('\n');
                    out.push_str(&text);
                }
            }
            *printed = text;
        }
        out
    }
}
