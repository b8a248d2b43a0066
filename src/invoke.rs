//! Bounded invocation of an external command-line tool.
//!
//! One call to [`invoke`] spawns exactly one child process, drains its
//! stdout/stderr on separate tasks, and waits for it against a deadline.
//! Whatever happens, the child and its pipes are released before `invoke`
//! returns. There are no retries; callers that want to poll again must
//! invoke again.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::ScanError;

/// Default bound for a listing call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// What to run, with which environment, and for how long at most.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    program: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    timeout: Duration,
}

impl InvocationRequest {
    /// Start a request for `program` with the default timeout and no
    /// arguments or environment overrides.
    pub fn new(program: impl Into<PathBuf>) -> Result<Self, ScanError> {
        let program = program.into();
        if program.as_os_str().is_empty() {
            return Err(ScanError::Validation {
                message: "program path must not be empty".into(),
            });
        }
        Ok(Self {
            program,
            args: Vec::new(),
            env: BTreeMap::new(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set a variable in the child's environment. Inherited variables of the
    /// same name are overridden; the calling process is never touched.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs(mut self, vars: &BTreeMap<String, String>) -> Self {
        self.env
            .extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Result<Self, ScanError> {
        if timeout.is_zero() {
            return Err(ScanError::Validation {
                message: "timeout must be greater than zero".into(),
            });
        }
        self.timeout = timeout;
        Ok(self)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn program_args(&self) -> &[String] {
        &self.args
    }

    pub fn env_overrides(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn timeout_duration(&self) -> Duration {
        self.timeout
    }

    /// Same program and environment, different arguments.
    pub fn with_args<I, S>(&self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            ..self.clone()
        }
    }
}

/// Output of a child that ran to completion within its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the child was ended by a signal.
    pub exit_code: Option<i32>,
}

impl CapturedOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Exit status as shown to users: the code, or `signal` when there is none.
    pub fn status_label(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exit code {code}"),
            None => "signal".into(),
        }
    }

    /// Fail with [`ScanError::ToolFailed`] unless the tool exited with 0.
    pub fn require_success(&self, request: &InvocationRequest) -> Result<(), ScanError> {
        if self.success() {
            return Ok(());
        }
        Err(ScanError::ToolFailed {
            program: request.program.display().to_string(),
            status: self.status_label(),
            stderr: self.stderr.trim().to_string(),
        })
    }
}

#[derive(Debug)]
pub enum InvocationOutcome {
    Success(CapturedOutput),
    TimedOut { timeout: Duration },
    LaunchFailed { cause: std::io::Error },
}

impl InvocationOutcome {
    /// Convert into a `Result`, naming the program of `request` in errors.
    pub fn into_result(self, request: &InvocationRequest) -> Result<CapturedOutput, ScanError> {
        let program = request.program.display().to_string();
        match self {
            Self::Success(output) => Ok(output),
            Self::TimedOut { timeout } => Err(ScanError::TimedOut { program, timeout }),
            Self::LaunchFailed { cause } => Err(ScanError::LaunchFailed {
                program,
                source: cause,
            }),
        }
    }
}

/// Aborts the pipe-draining tasks when dropped, so no reader outlives the call.
struct PipeReaders {
    stdout: JoinHandle<std::io::Result<Vec<u8>>>,
    stderr: JoinHandle<std::io::Result<Vec<u8>>>,
}

impl PipeReaders {
    fn spawn(child: &mut Child) -> Self {
        Self {
            stdout: tokio::spawn(drain(child.stdout.take())),
            stderr: tokio::spawn(drain(child.stderr.take())),
        }
    }

    async fn collect(&mut self) -> (Vec<u8>, Vec<u8>) {
        let stdout = (&mut self.stdout).await;
        let stderr = (&mut self.stderr).await;
        (settle("stdout", stdout), settle("stderr", stderr))
    }
}

impl Drop for PipeReaders {
    fn drop(&mut self) {
        self.stdout.abort();
        self.stderr.abort();
    }
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

fn settle(
    stream: &str,
    joined: Result<std::io::Result<Vec<u8>>, tokio::task::JoinError>,
) -> Vec<u8> {
    match joined {
        Ok(Ok(buf)) => buf,
        Ok(Err(e)) => {
            tracing::debug!(stream, "reading child pipe failed: {e}");
            Vec::new()
        }
        Err(e) => {
            tracing::debug!(stream, "pipe reader task failed: {e}");
            Vec::new()
        }
    }
}

enum Waited {
    Exited(ExitStatus),
    WaitError(std::io::Error),
    Deadline,
}

/// Run `request` once and classify what happened.
pub async fn invoke(request: &InvocationRequest) -> InvocationOutcome {
    let program = request.program.display().to_string();
    tracing::debug!(
        program = %program,
        args = ?request.args,
        env = ?request.env.keys().collect::<Vec<_>>(),
        timeout_ms = request.timeout.as_millis() as u64,
        "invoking"
    );

    let mut cmd = Command::new(&request.program);
    cmd.args(&request.args)
        .envs(&request.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let started = Instant::now();
    let deadline = started + request.timeout;

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(cause) => {
            tracing::debug!(program = %program, "launch failed: {cause}");
            return InvocationOutcome::LaunchFailed { cause };
        }
    };
    let mut readers = PipeReaders::spawn(&mut child);

    let waited = tokio::select! {
        status = child.wait() => match status {
            Ok(status) => Waited::Exited(status),
            Err(e) => Waited::WaitError(e),
        },
        _ = tokio::time::sleep_until(deadline) => Waited::Deadline,
    };

    let status = match waited {
        Waited::Exited(status) => status,
        Waited::WaitError(cause) => {
            terminate(&mut child, &program).await;
            return InvocationOutcome::LaunchFailed { cause };
        }
        Waited::Deadline => {
            tracing::warn!(
                program = %program,
                timeout_ms = request.timeout.as_millis() as u64,
                "invocation timed out"
            );
            terminate(&mut child, &program).await;
            return InvocationOutcome::TimedOut {
                timeout: request.timeout,
            };
        }
    };

    // A grandchild can keep the pipes open after the child itself exits.
    let (stdout, stderr) = match tokio::time::timeout_at(deadline, readers.collect()).await {
        Ok(collected) => collected,
        Err(_) => {
            tracing::warn!(program = %program, "output pipes still open at deadline");
            return InvocationOutcome::TimedOut {
                timeout: request.timeout,
            };
        }
    };

    let output = CapturedOutput {
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        exit_code: status.code(),
    };
    tracing::debug!(
        program = %program,
        exit_code = ?output.exit_code,
        elapsed_ms = started.elapsed().as_millis() as u64,
        stdout_bytes = stdout.len(),
        "invocation finished"
    );
    InvocationOutcome::Success(output)
}

/// Kill and reap the child.
async fn terminate(child: &mut Child, program: &str) {
    if let Err(e) = child.kill().await {
        tracing::debug!(program = %program, "killing child failed: {e}");
    }
}

/// Run `request` and require a clean exit: used to check the tool is usable.
pub async fn check_available(request: &InvocationRequest) -> Result<(), ScanError> {
    let output = invoke(request).await.into_result(request)?;
    output.require_success(request)
}
