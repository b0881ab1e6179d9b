//! Interactive chat command.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::rag::ConversationStore;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the interactive chat command.
pub async fn run_chat(model: Option<String>, mut settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    if let Some(model) = model {
        settings.rag.model = model;
    }
    let display_turns = settings.rag.history_display_turns;

    let orchestrator = Orchestrator::new(settings)?;
    let engine = orchestrator.rag_engine().await?;
    let mut history = ConversationStore::new();

    println!("\n{}", style("vidrag chat").bold().cyan());
    println!(
        "{}\n",
        style("Ask about your videos, 'history' to see recent turns, 'clear' to reset, 'exit' to quit.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            history = ConversationStore::new();
            Output::info("Conversation history cleared.");
            continue;
        }

        if input.eq_ignore_ascii_case("history") {
            if history.is_empty() {
                Output::info("No questions asked yet.");
            }
            for turn in history.recent(display_turns) {
                Output::turn(&turn.question, &turn.answer);
            }
            continue;
        }

        let spinner = Output::spinner("Thinking...");
        let result = engine.converse(input, &mut history).await;
        spinner.finish_and_clear();

        match result {
            Ok(answer) => {
                println!("\n{} {}\n", style("vidrag:").cyan().bold(), answer.answer);
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    Ok(())
}
