//! Control commands typed into the chat instead of a prompt.

use chrono::Local;
use linebridge_sessions::Session;

/// A chat message the bridge answers itself instead of forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// `/new` or `新規`: drop the session so the next prompt starts fresh.
    NewSession,
    /// `/status` or `ステータス`.
    Status,
    Help,
}

impl ControlCommand {
    /// Exact match only: `" /new"` or `/NEW` is an ordinary prompt.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "/new" | "新規" => Some(Self::NewSession),
            "/status" | "ステータス" => Some(Self::Status),
            "/help" => Some(Self::Help),
            _ => None,
        }
    }
}

pub const NEW_SESSION_TEXT: &str = "🔄 Started a new session.";
pub const NO_SESSION_TEXT: &str = "❌ No active session.";

pub fn status_text(session: Option<&Session>, working_dir: &str) -> String {
    match session {
        Some(s) => format!(
            "📊 Session status:\n- Last activity: {}\n- Started: {}\n- Working directory: {}",
            s.last_activity().with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
            s.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
            working_dir,
        ),
        None => NO_SESSION_TEXT.to_string(),
    }
}

pub fn help_text() -> String {
    [
        "Commands:",
        "/new (新規) - start a new conversation",
        "/status (ステータス) - show the current session",
        "/help - show this list",
        "Anything else is sent to Claude.",
    ]
    .join("\n")
}
