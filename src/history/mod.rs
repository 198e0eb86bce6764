//! Per-session conversation memory.
//!
//! Sessions live only in memory. Each one is an `Arc<Mutex<_>>` handle so the
//! answer path can hold it for a whole request and serialize concurrent
//! questions on the same session, while other sessions proceed in parallel.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

pub const DEFAULT_MAX_TURNS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug)]
pub struct ConversationSession {
    turns: VecDeque<Turn>,
    max_turns: usize,
}

impl ConversationSession {
    pub fn new(max_turns: usize) -> Self {
        let max_turns = max_turns.max(1);
        Self {
            turns: VecDeque::with_capacity(max_turns),
            max_turns,
        }
    }

    /// Appends a turn, evicting the oldest ones beyond the cap.
    pub fn append(&mut self, turn: Turn) {
        while self.turns.len() >= self.max_turns {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    /// Last `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Turn> {
        let skip = self.turns.len().saturating_sub(n);
        self.turns.iter().skip(skip).cloned().collect()
    }

    pub fn turns(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

pub type SessionHandle = Arc<Mutex<ConversationSession>>;

pub struct ConversationStore {
    sessions: RwLock<HashMap<String, SessionHandle>>,
    max_turns: usize,
}

impl ConversationStore {
    pub fn new(max_turns: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_turns,
        }
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    pub fn new_session_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Handle for `session_id`; unknown ids start an empty session. Only
    /// writers go through here, reads never register a session.
    pub async fn session(&self, session_id: &str) -> SessionHandle {
        if let Some(handle) = self.sessions.read().await.get(session_id) {
            return handle.clone();
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(ConversationSession::new(self.max_turns)))
            })
            .clone()
    }

    pub async fn append(&self, session_id: &str, turn: Turn) {
        let handle = self.session(session_id).await;
        handle.lock().await.append(turn);
    }

    async fn existing(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// Last `n` turns; empty for unknown sessions.
    pub async fn recent(&self, session_id: &str, n: usize) -> Vec<Turn> {
        match self.existing(session_id).await {
            Some(handle) => handle.lock().await.recent(n),
            None => Vec::new(),
        }
    }

    pub async fn history(&self, session_id: &str) -> Vec<Turn> {
        match self.existing(session_id).await {
            Some(handle) => handle.lock().await.turns(),
            None => Vec::new(),
        }
    }

    /// Forgets the session. Returns whether it existed.
    pub async fn clear(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id);
        match removed {
            Some(handle) => {
                handle.lock().await.clear();
                true
            }
            None => false,
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TURNS)
    }
}
