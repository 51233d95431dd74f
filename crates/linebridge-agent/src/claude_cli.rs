use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use linebridge_core::config::ClaudeConfig;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::assistant::{Assistant, ConversationState};
use crate::error::{RunnerError, TimeoutCause};

/// Exit code a shell reports for a child killed by SIGTERM (128 + 15).
pub const SIGTERM_EXIT_CODE: i32 = 143;
const SIGTERM: i32 = 15;

/// Tools allowed when neither the config file nor `CLAUDE_ALLOWED_TOOLS`
/// says otherwise. Read-only on purpose.
pub const DEFAULT_ALLOWED_TOOLS: &[&str] = &["Read", "Grep", "Glob", "LS"];

const ALLOWED_TOOLS_ENV: &str = "CLAUDE_ALLOWED_TOOLS";

/// Resolve the tool allow-list.
///
/// Priority: explicit config list > `CLAUDE_ALLOWED_TOOLS` > [`DEFAULT_ALLOWED_TOOLS`].
/// The env value is comma separated; a blank value means "no tools".
pub fn resolve_allowed_tools(explicit: Option<&[String]>, env_value: Option<&str>) -> Vec<String> {
    if let Some(tools) = explicit {
        return tools.to_vec();
    }
    if let Some(raw) = env_value {
        return raw
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
    }
    DEFAULT_ALLOWED_TOOLS.iter().map(|t| t.to_string()).collect()
}

/// Everything fixed at runner construction.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub command: String,
    pub working_dir: String,
    /// Joined with commas into one `--allowedTools` argument. Empty = no flag.
    pub allowed_tools: Vec<String>,
    pub skip_permissions: bool,
    pub verbose: bool,
    pub timeout: Duration,
}

impl RunnerOptions {
    /// Build options from the `[claude]` config section, consulting
    /// `CLAUDE_ALLOWED_TOOLS` when no explicit list is configured.
    pub fn from_config(cfg: &ClaudeConfig) -> Self {
        let env_tools = std::env::var(ALLOWED_TOOLS_ENV).ok();
        Self {
            command: cfg.command.clone(),
            working_dir: cfg.working_dir_or_cwd(),
            allowed_tools: resolve_allowed_tools(cfg.allowed_tools.as_deref(), env_tools.as_deref()),
            skip_permissions: cfg.skip_permissions,
            verbose: cfg.verbose,
            timeout: Duration::from_secs(cfg.timeout_secs),
        }
    }

    /// Argument vector for one invocation (without the program name).
    pub fn build_args(&self, prompt: &str, state: ConversationState) -> Vec<String> {
        let mut args = Vec::with_capacity(10);
        if state.is_continuing() {
            args.push("--continue".to_string());
        }
        args.extend([
            "-p".to_string(),
            prompt.to_string(),
            "--output-format".to_string(),
            "text".to_string(),
        ]);
        if !self.allowed_tools.is_empty() {
            args.push("--allowedTools".to_string());
            args.push(self.allowed_tools.join(","));
        }
        if self.skip_permissions {
            args.push("--dangerously-skip-permissions".to_string());
        }
        if self.verbose {
            args.push("--verbose".to_string());
        }
        args
    }
}

/// Assistant backed by the Claude Code CLI (`claude -p`).
///
/// The first call starts a new conversation; every later call passes
/// `--continue` so Claude Code resumes the most recent conversation in the
/// working directory.
pub struct ClaudeRunner {
    options: RunnerOptions,
    state: ConversationState,
}

impl ClaudeRunner {
    pub fn new(options: RunnerOptions) -> Self {
        Self {
            options,
            state: ConversationState::Fresh,
        }
    }

    fn spawn_error(&self, reason: impl Into<String>) -> RunnerError {
        RunnerError::Spawn {
            command: self.options.command.clone(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Assistant for ClaudeRunner {
    fn name(&self) -> &str {
        "claude-cli"
    }

    fn conversation_state(&self) -> ConversationState {
        self.state
    }

    async fn execute(&mut self, prompt: &str) -> Result<String, RunnerError> {
        let args = self.options.build_args(prompt, self.state);
        let continuing = self.state.is_continuing();
        self.state = ConversationState::Continuing;

        debug!(
            command = %self.options.command,
            cwd = %self.options.working_dir,
            continuing,
            prompt_len = prompt.len(),
            "spawning claude CLI"
        );

        let mut cmd = Command::new(&self.options.command);
        cmd.args(&args)
            .current_dir(&self.options.working_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so a deadline kill also reaches tools the CLI forked.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                self.spawn_error(format!("not found (cwd '{}')", self.options.working_dir))
            } else {
                self.spawn_error(e.to_string())
            }
        })?;

        let pid = child
            .id()
            .ok_or_else(|| self.spawn_error("no process id after spawn"))?;

        // Drain both pipes on their own tasks while we wait on the child,
        // otherwise a full pipe buffer stalls the CLI forever.
        let mut stdout_task = tokio::spawn(drain(child.stdout.take()));
        let mut stderr_task = tokio::spawn(drain(child.stderr.take()));

        // One deadline bounds the exit wait and both drains: a grandchild
        // holding the pipes open must not outlive the limit either.
        let limit = self.options.timeout;
        let finished = tokio::time::timeout(limit, async {
            tokio::join!(child.wait(), &mut stdout_task, &mut stderr_task)
        })
        .await;

        let (status, stdout, stderr) = match finished {
            Ok(done) => done,
            Err(_elapsed) => {
                warn!(pid, limit_ms = limit.as_millis() as u64, "claude CLI exceeded deadline, killing");
                stdout_task.abort();
                stderr_task.abort();
                kill_process_group(pid);
                if let Err(e) = child.kill().await {
                    debug!(pid, error = %e, "child already reaped");
                }
                return Err(RunnerError::Timeout {
                    cause: TimeoutCause::Timer,
                    limit,
                });
            }
        };
        let status: ExitStatus = status?;
        let stdout = stdout.map_err(std::io::Error::other)??;
        let stderr = stderr.map_err(std::io::Error::other)??;

        match classify_exit(status.code(), exit_signal(&status)) {
            ExitOutcome::Success => {
                let text = String::from_utf8_lossy(&stdout).trim().to_string();
                info!(pid, output_len = text.len(), "claude CLI finished");
                Ok(text)
            }
            ExitOutcome::Terminated => {
                warn!(pid, "claude CLI terminated by SIGTERM");
                Err(RunnerError::Timeout {
                    cause: TimeoutCause::Signal,
                    limit,
                })
            }
            ExitOutcome::Failed(code) => {
                let stderr = String::from_utf8_lossy(&stderr).trim().to_string();
                warn!(pid, exit_code = code, stderr_len = stderr.len(), "claude CLI failed");
                Err(RunnerError::NonZeroExit { code, stderr })
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ExitOutcome {
    Success,
    Terminated,
    Failed(i32),
}

/// Map an exit code / terminating signal pair onto the runner's categories.
fn classify_exit(code: Option<i32>, signal: Option<i32>) -> ExitOutcome {
    match (code, signal) {
        (Some(0), _) => ExitOutcome::Success,
        (Some(SIGTERM_EXIT_CODE), _) | (None, Some(SIGTERM)) => ExitOutcome::Terminated,
        (Some(code), _) => ExitOutcome::Failed(code),
        (None, _) => ExitOutcome::Failed(-1),
    }
}

/// SIGKILL the child's whole process group.
#[cfg(unix)]
fn kill_process_group(pid: u32) {
    // Safety: the child was spawned with process_group(0), so its pid is
    // also the id of a group containing only it and its descendants.
    let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
    if rc != 0 {
        debug!(pid, error = %std::io::Error::last_os_error(), "killpg failed");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

async fn drain<R: AsyncRead + Unpin>(stream: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        stream.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}
