//! linebridge-agent — runs the Claude Code CLI (`claude -p`) as a subprocess
//! on behalf of a chat session.
//!
//! The [`Assistant`] trait is the seam the session registry stores; the
//! production implementation is [`ClaudeRunner`].

pub mod assistant;
pub mod claude_cli;
pub mod error;

pub use assistant::{Assistant, ConversationState};
pub use claude_cli::{resolve_allowed_tools, ClaudeRunner, RunnerOptions, DEFAULT_ALLOWED_TOOLS};
pub use error::{RunnerError, TimeoutCause};
