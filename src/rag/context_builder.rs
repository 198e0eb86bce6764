//! Prompt assembly.
//!
//! Pure functions: the same instruction, evidence, history and question
//! always produce the same prompt.

use super::store::EvidenceItem;
use crate::history::{Role, Turn};

/// Per-block allowance for the citation header and separators.
const BLOCK_OVERHEAD: usize = 50;

/// A finished prompt and how many leading evidence items made it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub evidence_used: usize,
}

/// Formats evidence as numbered blocks, stopping before `max_chars` would be
/// exceeded. The first block is always kept, cut to fit if necessary.
/// Returns the context and the number of blocks included.
pub fn format_context(evidence: &[EvidenceItem], max_chars: usize) -> (String, usize) {
    let mut context = String::new();
    let mut used = 0usize;
    let mut included = 0usize;

    for (i, item) in evidence.iter().enumerate() {
        let chunk = &item.chunk;
        let text_len = chunk.text.chars().count();

        let text = if used + text_len + BLOCK_OVERHEAD > max_chars {
            if i > 0 {
                break;
            }
            let room = max_chars.saturating_sub(BLOCK_OVERHEAD).max(1);
            chunk.text.chars().take(room).collect::<String>()
        } else {
            chunk.text.clone()
        };

        let title = if chunk.source_title.is_empty() {
            chunk.source_url.as_str()
        } else {
            chunk.source_title.as_str()
        };
        context.push_str(&format!(
            "[{}] (Source: {}, {}, relevance: {:.2})\n{}\n\n",
            i + 1,
            title,
            chunk.source_url,
            item.similarity_score,
            text
        ));
        used += text_len + BLOCK_OVERHEAD;
        included += 1;
    }

    (context.trim_end().to_string(), included)
}

fn format_history(history: &[Turn]) -> String {
    history
        .iter()
        .map(|turn| {
            let speaker = match turn.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            format!("{}: {}", speaker, turn.text.trim())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Combines the system instruction, numbered evidence, recent conversation
/// and the question into one prompt.
pub fn build_prompt(
    system_instruction: &str,
    evidence: &[EvidenceItem],
    history: &[Turn],
    question: &str,
    max_context_chars: usize,
) -> Prompt {
    let (context, evidence_used) = format_context(evidence, max_context_chars);

    let mut prompt = String::new();
    prompt.push_str(system_instruction.trim());
    prompt.push_str("\n\nContext:\n");
    prompt.push_str(&context);

    if !history.is_empty() {
        prompt.push_str("\n\nConversation so far:\n");
        prompt.push_str(&format_history(history));
    }

    prompt.push_str("\n\nQuestion: ");
    prompt.push_str(question.trim());
    prompt.push_str("\n\nAnswer:");
    Prompt {
        text: prompt,
        evidence_used,
    }
}
