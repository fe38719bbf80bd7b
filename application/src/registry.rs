//! Session registry.
//!
//! [`SessionRegistry`] creates, looks up and retires [`ConversationLog`]s and
//! owns the per-session stream lock. A successful
//! [`try_acquire_stream`](SessionRegistry::try_acquire_stream) yields a
//! [`StreamSlot`]; the slot is the only key to the append path and releases
//! the lock when it goes away, whichever way the turn ends.

use crate::ports::transcript_store::{NoTranscriptStore, TranscriptEvent, TranscriptStore};
use parley_domain::{ConversationLog, DomainError, Message};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

/// Errors that can occur during registry operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("A turn is already streaming for session {0}")]
    Busy(String),
}

impl From<DomainError> for SessionError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::InvalidArgument(msg) => SessionError::InvalidArgument(msg),
            other => SessionError::InvalidArgument(other.to_string()),
        }
    }
}

struct SessionEntry {
    log: RwLock<ConversationLog>,
    busy: AtomicBool,
    last_active: std::sync::Mutex<Instant>,
}

impl SessionEntry {
    fn new(log: ConversationLog) -> Self {
        Self {
            log: RwLock::new(log),
            busy: AtomicBool::new(false),
            last_active: std::sync::Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        *self.last_active.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }

    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Exclusive right to run one streaming turn on a session.
///
/// Releases the session's stream lock exactly once, on drop.
pub struct StreamSlot {
    session_id: String,
    entry: Arc<SessionEntry>,
}

impl StreamSlot {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Consistent copy of the log as of now.
    pub async fn snapshot(&self) -> ConversationLog {
        self.entry.log.read().await.clone()
    }
}

impl Drop for StreamSlot {
    fn drop(&mut self) {
        self.entry.touch();
        self.entry.busy.store(false, Ordering::Release);
        debug!(session_id = %self.session_id, "Stream slot released");
    }
}

impl std::fmt::Debug for StreamSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSlot")
            .field("session_id", &self.session_id)
            .finish()
    }
}

/// In-memory registry of live sessions.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<SessionEntry>>>,
    ttl: Duration,
    transcript: Arc<dyn TranscriptStore>,
}

impl SessionRegistry {
    /// Create a registry whose idle sessions become evictable after `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
            transcript: Arc::new(NoTranscriptStore),
        }
    }

    /// Mirror session lifecycle events to a transcript store.
    pub fn with_transcript_store(mut self, store: Arc<dyn TranscriptStore>) -> Self {
        self.transcript = store;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Allocate a new session and return its identifier.
    pub async fn create(
        &self,
        owner_id: &str,
        persona_id: &str,
        system_instruction: &str,
    ) -> Result<String, SessionError> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let log = ConversationLog::new(&session_id, owner_id, persona_id, system_instruction)?;

        self.sessions
            .write()
            .await
            .insert(session_id.clone(), Arc::new(SessionEntry::new(log)));

        info!(session_id = %session_id, persona_id, "Session created");
        self.transcript.record(TranscriptEvent::new(
            "session_created",
            &session_id,
            serde_json::json!({
                "owner_id": owner_id,
                "persona_id": persona_id,
            }),
        ));

        Ok(session_id)
    }

    /// Snapshot of a session's log.
    pub async fn get(&self, session_id: &str) -> Result<ConversationLog, SessionError> {
        let entry = self.entry(session_id).await?;
        entry.touch();
        let log = entry.log.read().await.clone();
        Ok(log)
    }

    /// Try to take the session's stream slot without waiting.
    ///
    /// Returns `Ok(None)` when a turn is already streaming; the caller must
    /// reject its request rather than retry.
    ///
    /// The busy flag is set under the map's read lock, so `close` and
    /// `evict_idle` (which hold the write lock) never remove an entry between
    /// lookup and acquisition.
    pub async fn try_acquire_stream(
        &self,
        session_id: &str,
    ) -> Result<Option<StreamSlot>, SessionError> {
        let sessions = self.sessions.read().await;
        let entry = sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        if entry
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(session_id, "Stream slot already taken");
            return Ok(None);
        }
        drop(sessions);

        entry.touch();
        debug!(session_id, "Stream slot acquired");
        Ok(Some(StreamSlot {
            session_id: session_id.to_string(),
            entry,
        }))
    }

    /// Give a stream slot back.
    ///
    /// Equivalent to dropping the slot; spelled out for call sites where the
    /// release point matters.
    pub fn release_stream(&self, slot: StreamSlot) {
        drop(slot);
    }

    /// Whether a turn currently holds the session's stream slot.
    pub async fn is_streaming(&self, session_id: &str) -> Result<bool, SessionError> {
        Ok(self.entry(session_id).await?.is_busy())
    }

    /// Append a completed turn. Only the holder of the slot can do this.
    ///
    /// Returns the new log length.
    pub async fn commit_turn(&self, slot: &StreamSlot, user: Message, ai: Message) -> usize {
        let mut log = slot.entry.log.write().await;
        log.append_turn(user, ai);
        slot.entry.touch();
        log.len()
    }

    /// Retire a session explicitly.
    ///
    /// A session with a turn in flight cannot be closed.
    pub async fn close(&self, session_id: &str) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        if entry.is_busy() {
            return Err(SessionError::Busy(session_id.to_string()));
        }
        sessions.remove(session_id);
        drop(sessions);

        info!(session_id, "Session closed");
        self.transcript.record(TranscriptEvent::new(
            "session_closed",
            session_id,
            serde_json::json!({ "reason": "closed" }),
        ));
        Ok(())
    }

    /// Evict sessions idle for longer than the TTL. Sessions with a turn in
    /// flight are kept. Returns the number of sessions evicted.
    pub async fn evict_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let mut evicted = Vec::new();
        sessions.retain(|id, entry| {
            let keep = entry.is_busy() || entry.idle_for() < self.ttl;
            if !keep {
                evicted.push(id.clone());
            }
            keep
        });
        drop(sessions);

        for id in &evicted {
            self.transcript.record(TranscriptEvent::new(
                "session_closed",
                id,
                serde_json::json!({ "reason": "idle" }),
            ));
        }
        if !evicted.is_empty() {
            info!(count = evicted.len(), "Evicted idle sessions");
        }
        evicted.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    async fn entry(&self, session_id: &str) -> Result<Arc<SessionEntry>, SessionError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let registry = registry();
        let id = registry.create("u1", "p1", "You are a tour guide.").await.unwrap();
        assert!(!id.is_empty());

        let log = registry.get(&id).await.unwrap();
        assert_eq!(log.session_id(), id);
        assert_eq!(log.persona_id(), "p1");
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_blank_arguments() {
        let registry = registry();
        let err = registry.create("u1", "", "instr").await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidArgument(_)));

        let err = registry.create("u1", "p1", "").await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidArgument(_)));
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let registry = registry();
        let a = registry.create("u1", "p1", "x").await.unwrap();
        let b = registry.create("u1", "p1", "x").await.unwrap();
        assert_ne!(a, b);
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_get_unknown_session() {
        let err = registry().get("missing").await.unwrap_err();
        assert_eq!(err, SessionError::NotFound("missing".to_string()));
    }

    #[tokio::test]
    async fn test_stream_slot_is_exclusive() {
        let registry = registry();
        let id = registry.create("u1", "p1", "x").await.unwrap();

        let slot = registry.try_acquire_stream(&id).await.unwrap();
        assert!(slot.is_some());
        assert!(registry.is_streaming(&id).await.unwrap());
        assert!(registry.try_acquire_stream(&id).await.unwrap().is_none());

        registry.release_stream(slot.unwrap());
        assert!(!registry.is_streaming(&id).await.unwrap());
        assert!(registry.try_acquire_stream(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_dropping_slot_releases() {
        let registry = registry();
        let id = registry.create("u1", "p1", "x").await.unwrap();
        {
            let _slot = registry.try_acquire_stream(&id).await.unwrap().unwrap();
        }
        assert!(!registry.is_streaming(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_slots_are_per_session() {
        let registry = registry();
        let a = registry.create("u1", "p1", "x").await.unwrap();
        let b = registry.create("u1", "p1", "x").await.unwrap();

        let _slot_a = registry.try_acquire_stream(&a).await.unwrap().unwrap();
        assert!(registry.try_acquire_stream(&b).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_commit_turn_appends_pair() {
        let registry = registry();
        let id = registry.create("u1", "p1", "x").await.unwrap();
        let slot = registry.try_acquire_stream(&id).await.unwrap().unwrap();

        let len = registry
            .commit_turn(&slot, Message::user("hi"), Message::ai("hello"))
            .await;
        assert_eq!(len, 2);

        let log = registry.get(&id).await.unwrap();
        assert_eq!(log.last_ai_message().unwrap().text, "hello");
    }

    #[tokio::test]
    async fn test_close_refuses_busy_session() {
        let registry = registry();
        let id = registry.create("u1", "p1", "x").await.unwrap();
        let slot = registry.try_acquire_stream(&id).await.unwrap().unwrap();

        assert_eq!(
            registry.close(&id).await,
            Err(SessionError::Busy(id.clone()))
        );
        drop(slot);

        registry.close(&id).await.unwrap();
        assert!(matches!(
            registry.get(&id).await,
            Err(SessionError::NotFound(_))
        ));
        assert!(matches!(
            registry.close(&id).await,
            Err(SessionError::NotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_acquire_and_close_never_both_succeed() {
        let registry = Arc::new(registry());
        for _ in 0..200 {
            let id = registry.create("u1", "p1", "x").await.unwrap();

            let acquire = tokio::spawn({
                let registry = registry.clone();
                let id = id.clone();
                async move { registry.try_acquire_stream(&id).await }
            });
            let close = tokio::spawn({
                let registry = registry.clone();
                let id = id.clone();
                async move { registry.close(&id).await }
            });

            let slot = acquire.await.unwrap();
            let closed = close.await.unwrap();
            let acquired = matches!(slot, Ok(Some(_)));
            assert_ne!(acquired, closed.is_ok(), "session {}", id);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_idle_skips_busy_sessions() {
        let registry = SessionRegistry::new(Duration::from_secs(10));
        let idle = registry.create("u1", "p1", "x").await.unwrap();
        let busy = registry.create("u1", "p1", "x").await.unwrap();
        let _slot = registry.try_acquire_stream(&busy).await.unwrap().unwrap();

        assert_eq!(registry.evict_idle().await, 0);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(registry.evict_idle().await, 1);
        assert!(registry.get(&idle).await.is_err());
        assert!(registry.get(&busy).await.is_ok());
    }
}
