//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    model: Option<String>,
    top_k: Option<usize>,
    mut settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    if let Some(model) = model {
        settings.rag.model = model;
    }
    if let Some(top_k) = top_k {
        settings.rag.top_k = top_k;
    }

    let orchestrator = Orchestrator::new(settings)?;
    let spinner = Output::spinner("Searching transcripts...");

    match orchestrator.answer(question).await {
        Ok(answer) => {
            spinner.finish_and_clear();
            println!("\n{}\n", answer.answer);
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
