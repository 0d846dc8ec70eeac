//! Conversation sessions and the store that owns them.
//!
//! Each session is an ordered transcript replayed to the backend on every
//! exchange. Sessions sit behind an async mutex, but the mutex is held only
//! while the history is snapshotted and while the finished exchange is
//! committed. The backend call itself, retries included, runs unlocked.
//!
//! A turn pair is committed atomically and only on success: a failed call
//! leaves the transcript exactly as it was.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use campusdesk_config::SessionMode;
use campusdesk_core::error::ProviderError;
use campusdesk_core::message::{SessionId, Transcript, Turn};
use campusdesk_core::provider::{Provider, ProviderRequest};

/// Shared handle to one session.
pub type SessionHandle = Arc<Mutex<ConversationSession>>;

/// One conversation's transcript.
#[derive(Debug, Clone)]
pub struct ConversationSession {
    transcript: Transcript,
}

impl ConversationSession {
    pub fn new(id: SessionId) -> Self {
        Self {
            transcript: Transcript::new(id),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.transcript.id
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn len(&self) -> usize {
        self.transcript.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transcript.is_empty()
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.transcript.updated_at
    }

    /// Copy of the history to replay; `limit` of zero means all of it.
    fn history(&self, limit: usize) -> Vec<Turn> {
        self.transcript.recent(limit).to_vec()
    }

    fn commit(&mut self, user: Turn, assistant: Turn) {
        self.transcript.push_exchange(user, assistant);
    }

    /// Run one exchange on the session behind `handle`.
    ///
    /// `template` supplies the model, generation and safety settings; its
    /// `turns` are replaced by the replayed history plus a new user turn
    /// carrying `prompt`. Returns the backend's reply text.
    pub async fn send(
        handle: &SessionHandle,
        provider: &dyn Provider,
        template: &ProviderRequest,
        prompt: &str,
        history_limit: usize,
    ) -> Result<String, ProviderError> {
        let user_turn = Turn::user(prompt);

        let (session_id, mut turns) = {
            let session = handle.lock().await;
            (session.id().clone(), session.history(history_limit))
        };
        turns.push(user_turn.clone());

        debug!(
            session = %session_id,
            replayed = turns.len() - 1,
            provider = provider.name(),
            "Sending exchange to backend"
        );

        let request = ProviderRequest {
            turns,
            ..template.clone()
        };
        let response = provider.complete(request).await?;

        let mut session = handle.lock().await;
        session.commit(user_turn, Turn::assistant(response.text.clone()));
        debug!(session = %session_id, turns = session.len(), "Exchange committed");

        Ok(response.text)
    }
}

struct SessionSlot {
    handle: SessionHandle,
    last_used: Instant,
}

/// Owns every live session and maps callers onto them.
pub struct SessionStore {
    mode: SessionMode,
    max_sessions: usize,
    sessions: RwLock<HashMap<String, SessionSlot>>,
}

impl SessionStore {
    pub fn new(mode: SessionMode, max_sessions: usize) -> Self {
        Self {
            mode,
            max_sessions: max_sessions.max(1),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// One process-wide session for every caller.
    pub fn shared() -> Self {
        Self::new(SessionMode::Shared, 1)
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// The store key for a caller-supplied session id.
    ///
    /// In shared mode every caller maps to the anonymous session. In
    /// per-client mode a missing or blank id does too.
    pub fn key_for(&self, requested: Option<&str>) -> String {
        match (self.mode, requested.map(str::trim)) {
            (SessionMode::PerClient, Some(id)) if !id.is_empty() => id.to_string(),
            _ => SessionId::ANONYMOUS.to_string(),
        }
    }

    /// The session for `requested`, created on first use.
    pub async fn resolve(&self, requested: Option<&str>) -> SessionHandle {
        let key = self.key_for(requested);
        let mut sessions = self.sessions.write().await;

        if let Some(slot) = sessions.get_mut(&key) {
            slot.last_used = Instant::now();
            return slot.handle.clone();
        }

        // Evict the least recently used idle session if at capacity. A
        // handle cloned out of the store belongs to an exchange in flight.
        if sessions.len() >= self.max_sessions {
            let oldest_idle = sessions
                .iter()
                .filter(|(_, slot)| Arc::strong_count(&slot.handle) == 1)
                .min_by_key(|(_, slot)| slot.last_used)
                .map(|(k, _)| k.clone());
            match oldest_idle {
                Some(oldest_key) => {
                    sessions.remove(&oldest_key);
                    info!(session = %oldest_key, "Evicted idle session");
                }
                None => {
                    warn!(
                        sessions = sessions.len(),
                        max = self.max_sessions,
                        "All sessions busy, exceeding session cap"
                    );
                }
            }
        }

        let handle = Arc::new(Mutex::new(ConversationSession::new(SessionId::from(&key))));
        sessions.insert(
            key.clone(),
            SessionSlot {
                handle: handle.clone(),
                last_used: Instant::now(),
            },
        );
        debug!(session = %key, "Session created");
        handle
    }

    /// Number of turns recorded for `requested`, zero if it has no session.
    pub async fn transcript_len(&self, requested: Option<&str>) -> usize {
        let key = self.key_for(requested);
        let handle = {
            let sessions = self.sessions.read().await;
            match sessions.get(&key) {
                Some(slot) => slot.handle.clone(),
                None => return 0,
            }
        };
        let session = handle.lock().await;
        session.len()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::shared()
    }
}
