use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use linebridge_agent::{Assistant, ConversationState, RunnerError};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// One user's conversation: an assistant plus the time it was last used.
///
/// The assistant sits behind an async mutex, so a second message for the
/// same user waits for the first invocation to finish instead of running
/// a second CLI process next to it.
pub struct Session {
    /// UUIDv7, time-sortable. Changes whenever the session is recreated.
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    /// Unix millis; only ever moves forward.
    last_activity_ms: AtomicI64,
    assistant: Mutex<Box<dyn Assistant>>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, assistant: Box<dyn Assistant>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            user_id: user_id.into(),
            created_at: now,
            last_activity_ms: AtomicI64::new(now.timestamp_millis()),
            assistant: Mutex::new(assistant),
        }
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_activity_ms.load(Ordering::Acquire))
            .unwrap_or_default()
    }

    /// Record activity now.
    pub fn touch(&self) {
        self.touch_at(Utc::now());
    }

    /// Record activity at `at`. Earlier timestamps are ignored.
    pub fn touch_at(&self, at: DateTime<Utc>) {
        self.last_activity_ms
            .fetch_max(at.timestamp_millis(), Ordering::AcqRel);
    }

    /// Milliseconds since last activity as seen from `now` (0 if `now` is earlier).
    pub fn idle_millis(&self, now: DateTime<Utc>) -> i64 {
        (now.timestamp_millis() - self.last_activity_ms.load(Ordering::Acquire)).max(0)
    }

    /// Current conversation state, waiting for any in-flight invocation.
    pub async fn conversation_state(&self) -> ConversationState {
        self.assistant.lock().await.conversation_state()
    }

    /// Run `prompt` through this session's assistant and refresh activity on success.
    pub async fn execute(&self, prompt: &str) -> Result<String, RunnerError> {
        let mut assistant = self.assistant.lock().await;
        debug!(
            session_id = %self.id,
            assistant = assistant.name(),
            state = ?assistant.conversation_state(),
            "executing prompt"
        );
        let output = assistant.execute(prompt).await?;
        self.touch();
        Ok(output)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("created_at", &self.created_at)
            .field("last_activity", &self.last_activity())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;

    struct Echo {
        state: ConversationState,
        fail: bool,
    }

    #[async_trait]
    impl Assistant for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn conversation_state(&self) -> ConversationState {
            self.state
        }

        async fn execute(&mut self, prompt: &str) -> Result<String, RunnerError> {
            self.state = ConversationState::Continuing;
            if self.fail {
                return Err(RunnerError::NonZeroExit {
                    code: 1,
                    stderr: "nope".to_string(),
                });
            }
            Ok(prompt.to_uppercase())
        }
    }

    fn session(fail: bool, now: DateTime<Utc>) -> Session {
        Session::new(
            "U1",
            Box::new(Echo {
                state: ConversationState::Fresh,
                fail,
            }),
            now,
        )
    }

    #[test]
    fn touch_never_moves_backwards() {
        let start = Utc::now();
        let s = session(false, start);
        s.touch_at(start + Duration::minutes(5));
        s.touch_at(start + Duration::minutes(1));
        assert_eq!(
            s.last_activity().timestamp_millis(),
            (start + Duration::minutes(5)).timestamp_millis()
        );
    }

    #[test]
    fn idle_millis_is_clamped_at_zero() {
        let start = Utc::now();
        let s = session(false, start);
        assert_eq!(s.idle_millis(start - Duration::seconds(10)), 0);
        assert_eq!(s.idle_millis(start + Duration::seconds(10)), 10_000);
    }

    #[tokio::test]
    async fn successful_execute_refreshes_activity() {
        let old = Utc::now() - Duration::hours(1);
        let s = session(false, old);
        assert_eq!(s.execute("hi").await.unwrap(), "HI");
        assert!(s.last_activity() > old);
        assert_eq!(s.conversation_state().await, ConversationState::Continuing);
    }

    #[tokio::test]
    async fn failed_execute_leaves_activity_alone() {
        let old = Utc::now() - Duration::hours(1);
        let s = session(true, old);
        assert!(s.execute("hi").await.is_err());
        assert_eq!(s.last_activity().timestamp_millis(), old.timestamp_millis());
    }
}
