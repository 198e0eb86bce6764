pub mod core;
pub mod history;
pub mod llm;
pub mod rag;
pub mod state;

pub use crate::core::errors::RagError;
pub use crate::rag::{Answer, AnswerStatus, Document, RagService};
pub use crate::state::AppState;
