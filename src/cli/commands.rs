//! CLI commands
//!
//! Special commands that can be executed in the REPL.

use std::sync::Arc;

use crate::agent::{Agency, Conversation};
use crate::core::MessageType;

/// Result of parsing a command
#[derive(Debug)]
pub enum CommandResult {
    /// Send as a message on the current conversation
    Continue(String),
    /// Command was handled, show output
    Handled(String),
    /// Switch the current conversation
    Switch(Arc<Conversation>),
    /// Exit the REPL
    Exit,
}

/// Parse and handle special commands
pub fn handle_command(
    input: &str,
    agency: &Agency,
    current: Option<&Arc<Conversation>>,
) -> CommandResult {
    let input = input.trim();
    let parts: Vec<&str> = input.splitn(2, ' ').collect();
    let cmd = parts[0].to_lowercase();
    let args = parts.get(1).map(|s| s.trim()).unwrap_or("");

    match cmd.as_str() {
        "exit" | "quit" | "q" => CommandResult::Exit,

        "help" | "?" => CommandResult::Handled(help_text()),

        "threads" => CommandResult::Handled(list_threads(agency, current)),

        "use" => select_thread(args, agency),

        "history" => match current {
            Some(conversation) => CommandResult::Handled(history(conversation)),
            None => CommandResult::Handled("No conversation selected.".to_string()),
        },

        _ => {
            if input.starts_with('/') {
                CommandResult::Handled(format!(
                    "Unknown command: {}. Type 'help' for available commands.",
                    cmd
                ))
            } else {
                CommandResult::Continue(input.to_string())
            }
        }
    }
}

fn list_threads(agency: &Agency, current: Option<&Arc<Conversation>>) -> String {
    let conversations = agency.user_conversations();
    if conversations.is_empty() {
        return "The user has no conversations in this agency.".to_string();
    }

    conversations
        .iter()
        .enumerate()
        .map(|(i, conversation)| {
            let marker = match current {
                Some(c) if Arc::ptr_eq(c, conversation) => "*",
                _ => " ",
            };
            format!(
                "{} {}. {} ({})",
                marker,
                i + 1,
                conversation.recipient().name(),
                conversation.id().unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Select by 1-based position or by conversation id
fn select_thread(args: &str, agency: &Agency) -> CommandResult {
    if args.is_empty() {
        return CommandResult::Handled("Usage: use <number|thread id>".to_string());
    }

    let conversations = agency.user_conversations();
    let by_position = args
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| conversations.get(i).cloned());

    match by_position.map(Ok).unwrap_or_else(|| agency.user_conversation(args)) {
        Ok(conversation) => CommandResult::Switch(conversation),
        Err(e) => CommandResult::Handled(e.to_string()),
    }
}

fn history(conversation: &Conversation) -> String {
    let messages = conversation.messages();
    if messages.is_empty() {
        return "No messages yet.".to_string();
    }

    messages
        .iter()
        .map(|m| {
            let tag = match m.kind {
                MessageType::Text => "",
                MessageType::Action => " [action]",
                MessageType::ActionResponse => " [result]",
            };
            format!(
                "[{}] {} -> {}{}: {}",
                m.date.format("%H:%M:%S"),
                m.from.name,
                m.to.name,
                tag,
                m.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Generate help text
fn help_text() -> String {
    r#"Agency Commands:
─────────────────────────────────────────────
  help, ?          Show this help message
  threads          List your conversations (* marks the current one)
  use <n|id>       Switch to a conversation by number or thread id
  history          Show the transcript of the current conversation
  exit, quit, q    Exit

Anything else is sent to the agent of the current conversation.
─────────────────────────────────────────────"#
        .to_string()
}
