//! Test doubles shared by the gateway's unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use linebridge_agent::{Assistant, ConversationState, RunnerError, TimeoutCause};
use linebridge_core::config::{BridgeConfig, ClaudeConfig, GatewayConfig, LineConfig, SessionsConfig};
use linebridge_line::{LineError, MessageGateway, TextMessage};
use linebridge_sessions::{AssistantFactory, SessionRegistry};

use crate::app::AppState;

pub const USER: &str = "U-authorized";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Reply { token: String, text: String },
    Push { to: String, text: String },
}

/// Gateway that records every outbound call instead of sending it.
#[derive(Default)]
pub struct RecordingGateway {
    calls: Mutex<Vec<Call>>,
    fail_replies: bool,
}

impl RecordingGateway {
    pub fn failing_replies() -> Self {
        Self {
            fail_replies: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn pushed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Push { text, .. } => Some(text),
                Call::Reply { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl MessageGateway for RecordingGateway {
    async fn reply(&self, reply_token: &str, messages: &[TextMessage]) -> Result<(), LineError> {
        if self.fail_replies {
            return Err(LineError::Api {
                status: 400,
                body: "Invalid reply token".to_string(),
            });
        }
        let mut calls = self.calls.lock().unwrap();
        calls.extend(messages.iter().map(|m| Call::Reply {
            token: reply_token.to_string(),
            text: m.text.clone(),
        }));
        Ok(())
    }

    async fn push(&self, to: &str, messages: &[TextMessage]) -> Result<(), LineError> {
        let mut calls = self.calls.lock().unwrap();
        calls.extend(messages.iter().map(|m| Call::Push {
            to: to.to_string(),
            text: m.text.clone(),
        }));
        Ok(())
    }
}

/// What a [`ScriptedAssistant`] does with each prompt.
#[derive(Clone)]
pub enum Script {
    /// Reply `"new:<prompt>"` or `"continue:<prompt>"`.
    Echo,
    /// Reply with this exact text.
    Fixed(String),
    TimesOut,
    Fails(String),
}

pub struct ScriptedAssistant {
    state: ConversationState,
    script: Script,
}

#[async_trait]
impl Assistant for ScriptedAssistant {
    fn name(&self) -> &str {
        "scripted"
    }

    fn conversation_state(&self) -> ConversationState {
        self.state
    }

    async fn execute(&mut self, prompt: &str) -> Result<String, RunnerError> {
        let was = self.state;
        self.state = ConversationState::Continuing;
        match &self.script {
            Script::Echo => {
                let mode = if was.is_continuing() { "continue" } else { "new" };
                Ok(format!("{mode}:{prompt}"))
            }
            Script::Fixed(text) => Ok(text.clone()),
            Script::TimesOut => Err(RunnerError::Timeout {
                cause: TimeoutCause::Timer,
                limit: Duration::from_secs(600),
            }),
            Script::Fails(stderr) => Err(RunnerError::NonZeroExit {
                code: 1,
                stderr: stderr.clone(),
            }),
        }
    }
}

pub fn config(channel_secret: Option<&str>) -> BridgeConfig {
    BridgeConfig {
        gateway: GatewayConfig::default(),
        line: LineConfig {
            channel_token: "test-token".to_string(),
            channel_secret: channel_secret.map(str::to_string),
            user_id: USER.to_string(),
            api_base: "http://127.0.0.1:9".to_string(),
        },
        claude: ClaudeConfig {
            working_dir: Some("/srv/project".to_string()),
            ..ClaudeConfig::default()
        },
        sessions: SessionsConfig::default(),
    }
}

pub fn state_with(
    gateway: Arc<RecordingGateway>,
    script: Script,
    channel_secret: Option<&str>,
) -> Arc<AppState> {
    let factory: AssistantFactory = Arc::new(move |_user: &str| {
        Box::new(ScriptedAssistant {
            state: ConversationState::Fresh,
            script: script.clone(),
        }) as Box<dyn Assistant>
    });
    let sessions = Arc::new(SessionRegistry::new(factory, Duration::from_secs(30 * 60)));
    Arc::new(AppState::new(config(channel_secret), gateway, sessions))
}

pub fn state(gateway: Arc<RecordingGateway>, script: Script) -> Arc<AppState> {
    state_with(gateway, script, None)
}
