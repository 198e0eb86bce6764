pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an assistant that answers questions about GAIL (Gas Authority of India Limited) using content from its official website.

Guidelines:
- Answer only from the numbered context passages provided with each question.
- Cite the passages you rely on by their [n] markers.
- If the context does not contain the answer, say that the information was not found in the available content.
- Be professional and concise; include concrete figures, dates and names when the context has them.";

pub const NO_CONTEXT_ANSWER: &str = "I apologize, but I couldn't find relevant information about your question in the indexed website content. Please try rephrasing your question or ask about GAIL's business, services, or policies.";

pub const GENERATION_FAILED_ANSWER: &str =
    "I apologize, but I encountered an error while generating a response. Please try again.";

pub const MAX_SUGGESTED_QUESTIONS: usize = 8;

pub fn default_suggested_questions() -> Vec<String> {
    [
        "What is GAIL and what does it do?",
        "What are GAIL's main business areas?",
        "How can I contact GAIL?",
        "What career opportunities are available at GAIL?",
        "What is GAIL's renewable energy portfolio?",
        "Tell me about GAIL's pipeline network",
        "What are GAIL's CSR initiatives?",
        "How does GAIL contribute to India's energy sector?",
    ]
    .iter()
    .map(|q| q.to_string())
    .collect()
}

/// Extra starters offered when the corpus contains pages of the given type.
pub fn page_type_questions() -> Vec<(&'static str, &'static str)> {
    vec![
        ("news", "What are the latest news and updates from GAIL?"),
        ("investor", "What is GAIL's financial performance?"),
        ("career", "What job opportunities are available at GAIL?"),
    ]
}
