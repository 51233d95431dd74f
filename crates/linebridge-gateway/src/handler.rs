//! Turns accepted LINE messages into assistant invocations and replies.

use std::sync::Arc;
use std::time::Duration;

use linebridge_agent::RunnerError;
use linebridge_core::config::{MAX_SEGMENT_CHARS, SEGMENT_DELAY_MS};
use linebridge_line::{send::push_segmented, IncomingText, TextMessage};
use tracing::{error, info, instrument, warn};

use crate::app::AppState;
use crate::commands::{help_text, status_text, ControlCommand, NEW_SESSION_TEXT};
use crate::output::clean_output;

pub const THINKING_TEXT: &str = "🤔 Thinking...";
pub const NO_OUTPUT_TEXT: &str = "(no output)";

/// Handle the accepted messages of one webhook delivery, in order.
pub async fn process_messages(state: Arc<AppState>, messages: Vec<IncomingText>) {
    for message in messages {
        handle_message(&state, message).await;
    }
}

#[instrument(skip_all, fields(user_id = %message.user_id))]
pub async fn handle_message(state: &AppState, message: IncomingText) {
    if let Some(command) = ControlCommand::parse(&message.text) {
        info!(?command, "control command");
        let text = match command {
            ControlCommand::NewSession => {
                state.sessions.delete(&message.user_id);
                NEW_SESSION_TEXT.to_string()
            }
            ControlCommand::Status => {
                let session = state.sessions.get(&message.user_id);
                status_text(session.as_deref(), &state.config.claude.working_dir_or_cwd())
            }
            ControlCommand::Help => help_text(),
        };
        push_notice(state, &message.user_id, text).await;
        return;
    }

    if let Some(token) = message.reply_token.as_deref() {
        // Reply tokens are single-use and short-lived; losing the ack is harmless.
        if let Err(e) = state.line.reply(token, &[TextMessage::new(THINKING_TEXT)]).await {
            warn!(error = %e, "thinking acknowledgement failed");
        }
    }

    let session = state.sessions.get_or_create(&message.user_id);
    info!(session_id = %session.id, chars = message.text.chars().count(), "dispatching prompt");

    match session.execute(&message.text).await {
        Ok(raw) => {
            let mut output = clean_output(&raw);
            if output.is_empty() {
                output = NO_OUTPUT_TEXT.to_string();
            }
            match push_segmented(
                state.line.as_ref(),
                &message.user_id,
                &output,
                MAX_SEGMENT_CHARS,
                Duration::from_millis(SEGMENT_DELAY_MS),
            )
            .await
            {
                Ok(segments) => info!(segments, "response delivered"),
                Err(e) => error!(error = %e, "failed to deliver response"),
            }
        }
        Err(e) => {
            error!(error = %e, exit_code = ?e.exit_code(), timeout = e.is_timeout(), "claude execution failed");
            push_notice(state, &message.user_id, failure_text(&e, state.config.claude.timeout_secs)).await;
        }
    }
}

/// Chat text for a failed invocation.
pub fn failure_text(err: &RunnerError, limit_secs: u64) -> String {
    if err.is_timeout() {
        let minutes = (limit_secs / 60).max(1);
        format!(
            "❌ An error occurred:\n⏰ Claude Code timed out ({minutes} minute limit).\n\
             For long tasks, try a narrower, more specific request."
        )
    } else {
        format!("❌ An error occurred:\n{err}")
    }
}

async fn push_notice(state: &AppState, to: &str, text: String) {
    if let Err(e) = state.line.push(to, &[TextMessage::new(text)]).await {
        error!(error = %e, "push failed");
    }
}
