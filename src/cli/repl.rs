//! Interactive REPL over the user's conversations
//!
//! Provides the terminal interaction loop.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use crate::agent::{Agency, Conversation};
use crate::cli::commands::{handle_command, CommandResult};
use crate::core::Result;

/// Interactive REPL (Read-Eval-Print Loop)
pub struct Repl {
    agency: Arc<Agency>,
    current: Option<Arc<Conversation>>,
}

impl Repl {
    /// Start on the first conversation the user can send to
    pub fn new(agency: Arc<Agency>) -> Self {
        let current = agency.user_conversations().into_iter().next();
        Self { agency, current }
    }

    /// Run the REPL
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();

        let stdin = io::stdin();
        let mut stdout = io::stdout();

        loop {
            print!("You: ");
            stdout.flush()?;

            let mut input = String::new();
            match stdin.lock().read_line(&mut input) {
                Ok(0) => {
                    // EOF (Ctrl+D)
                    println!("\nGoodbye!");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    continue;
                }
            }

            let input = input.trim();
            if input.is_empty() {
                continue;
            }

            match handle_command(input, &self.agency, self.current.as_ref()) {
                CommandResult::Exit => {
                    println!("\nGoodbye!");
                    break;
                }
                CommandResult::Handled(output) => println!("{}\n", output),
                CommandResult::Switch(conversation) => {
                    println!("Now talking to {}.\n", conversation.recipient().name());
                    self.current = Some(conversation);
                }
                CommandResult::Continue(text) => self.send(&text).await,
            }
        }

        Ok(())
    }

    async fn send(&self, text: &str) {
        let Some(conversation) = &self.current else {
            eprintln!("No conversation selected. Type 'threads' to list them.\n");
            return;
        };

        match conversation.send(text).await {
            Ok(reply) => println!("\n{}:\n{}\n", conversation.recipient().name(), reply),
            Err(e) => eprintln!("\nError: {}\n", e),
        }
    }

    /// Print the startup banner
    fn print_banner(&self) {
        println!();
        println!("{}", self.agency.name());
        if let Some(mission) = self.agency.mission() {
            println!("{}", mission);
        }
        println!();
        println!("Agents:");
        for agent in self.agency.agents() {
            println!("  {}", agent.name());
        }
        if let Some(current) = &self.current {
            println!();
            println!("Talking to: {}", current.recipient().name());
        }
        println!();
        println!("Commands: help, threads, use, history, exit");
        println!("─────────────────────────────────────────────");
    }
}
