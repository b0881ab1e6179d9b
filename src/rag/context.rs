//! Context and reference formatting for RAG prompts.

use crate::config::Prompts;
use crate::vector_store::RetrievalMatch;
use std::collections::HashMap;

/// Build the context block sent to the chat model.
///
/// `header` is rendered with `{{top_k}}` set to `top_k`. Matches without
/// metadata contribute nothing. Repeated titles are kept as-is.
pub fn build_context(prompts: &Prompts, top_k: usize, matches: &[RetrievalMatch]) -> String {
    let mut vars = HashMap::new();
    vars.insert("top_k".to_string(), top_k.to_string());

    let mut context = prompts.render_with_custom(&prompts.rag.context_header, &vars);
    for metadata in matches.iter().filter_map(|m| m.metadata.as_ref()) {
        context.push_str(&format!("Title: {}\n", metadata.title));
        context.push_str(&format!("Transcription: {}\n", metadata.text));
    }
    context
}

/// Timestamped URLs of the matches, in match order, duplicates included.
pub fn reference_urls(matches: &[RetrievalMatch]) -> Vec<String> {
    matches
        .iter()
        .filter_map(|m| m.metadata.as_ref())
        .map(|metadata| metadata.video_url.clone())
        .collect()
}

/// The reference list appended to an answer.
pub fn build_references(urls: &[String]) -> String {
    urls.iter().map(|url| format!("\n - {}\n", url)).collect()
}
