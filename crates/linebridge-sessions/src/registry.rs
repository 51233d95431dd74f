use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use linebridge_agent::Assistant;
use tokio::sync::watch;
use tracing::{debug, info, instrument};

use crate::types::Session;

/// Builds a fresh assistant for a user who has no session yet.
pub type AssistantFactory = Arc<dyn Fn(&str) -> Box<dyn Assistant> + Send + Sync>;

/// In-memory map of user ID -> live [`Session`], with idle eviction.
///
/// Constructed once at startup and shared through the gateway state. At most
/// one session exists per user; `get_or_create` hands out the same `Arc`
/// until the entry is deleted or swept.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
    factory: AssistantFactory,
    idle_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(factory: AssistantFactory, idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            factory,
            idle_timeout,
        }
    }

    /// Return the user's session, creating one with a new assistant if needed.
    pub fn get_or_create(&self, user_id: &str) -> Arc<Session> {
        self.get_or_create_at(user_id, Utc::now())
    }

    /// [`get_or_create`](Self::get_or_create) with an explicit creation time.
    #[instrument(skip(self, now))]
    pub fn get_or_create_at(&self, user_id: &str, now: DateTime<Utc>) -> Arc<Session> {
        let entry = self.sessions.entry(user_id.to_string()).or_insert_with(|| {
            let session = Session::new(user_id, (self.factory)(user_id), now);
            info!(session_id = %session.id, "session created");
            Arc::new(session)
        });
        Arc::clone(entry.value())
    }

    pub fn get(&self, user_id: &str) -> Option<Arc<Session>> {
        self.sessions.get(user_id).map(|e| Arc::clone(e.value()))
    }

    /// Drop the user's session. Returns whether one existed.
    #[instrument(skip(self))]
    pub fn delete(&self, user_id: &str) -> bool {
        match self.sessions.remove(user_id) {
            Some((_, session)) => {
                info!(session_id = %session.id, "session deleted");
                true
            }
            None => {
                debug!("no session to delete");
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Evict idle sessions as of now. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    /// Evict every session whose idle time at `now` exceeds the idle timeout.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let limit_ms = i64::try_from(self.idle_timeout.as_millis()).unwrap_or(i64::MAX);
        let mut removed = 0;
        self.sessions.retain(|user_id, session| {
            let idle_ms = session.idle_millis(now);
            if idle_ms > limit_ms {
                info!(user_id = %user_id, session_id = %session.id, idle_ms, "session expired");
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }

    /// Sweep every `every` until `shutdown` flips to `true` (or its sender drops).
    pub async fn run_sweeper(self: Arc<Self>, every: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(
            every_secs = every.as_secs(),
            idle_secs = self.idle_timeout.as_secs(),
            "session sweeper started"
        );

        let mut interval = tokio::time::interval(every);
        // The first tick completes immediately; nothing can be idle yet.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let removed = self.sweep();
                    if removed > 0 {
                        info!(removed, remaining = self.len(), "idle sessions evicted");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("session sweeper shutting down");
                        break;
                    }
                }
            }
        }
    }
}
