// scm-hub: Repository management layer over version-control backends
//
// SPDX-FileCopyrightText: 2026 Romeo Ahmed
// SPDX-License-Identifier: GPL-3.0-or-later

//! Child-process execution with deadline and cancellation.
//!
//! ```text
//! ProcessBuilder
//!  • new/which
//!  • arg/args/cwd/env/stdin/timeout/name/flags
//!          |
//!          v
//!   run(&CancellationToken)            sync callers
//!     multi-thread runtime --> block_in_place + block_on
//!     otherwise            --> current-thread runtime
//!          |
//!          v
//!   run_async(&CancellationToken)
//!     spawn --> stdin writer task
//!           --> stdout / stderr reader tasks
//!           --> select! { wait, token.cancelled() --> kill --> Cancelled,
//!                         sleep(timeout)      --> kill --> Timeout }
//!          |
//!          v
//!   ProcessOutput { exit_code, stdout: Vec<u8>, stderr }
//! ```


use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use bitflags::bitflags;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::{CommandError, ScmError, ScmResult};

bitflags! {
    /// Flags controlling process execution behavior.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ProcessFlags: u32 {
        /// Don't fail if the process exits with a non-zero status
        const ALLOW_FAILURE = 0x01;
        /// Don't capture stdout
        const DISCARD_STDOUT = 0x02;
    }
}

/// Output from a completed process.
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    exit_code: i32,
    stdout: Vec<u8>,
    stderr: String,
}

impl ProcessOutput {
    /// Returns the process exit code (0 = success, -1 if killed by a signal).
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.exit_code
    }

    #[must_use]
    pub fn stdout(&self) -> &[u8] {
        &self.stdout
    }

    /// Captured stdout, lossily decoded.
    #[must_use]
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    #[must_use]
    pub fn into_stdout(self) -> Vec<u8> {
        self.stdout
    }

    #[must_use]
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Builder for a single child process.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    env: BTreeMap<OsString, OsString>,
    stdin: Option<Vec<u8>>,
    timeout: Option<Duration>,
    name: Option<String>,
    flags: ProcessFlags,
}

impl ProcessBuilder {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
            stdin: None,
            timeout: None,
            name: None,
            flags: ProcessFlags::empty(),
        }
    }

    /// Resolve `program` on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns an I/O `NotFound` error if the executable cannot be found.
    pub fn which(program: &str) -> ScmResult<Self> {
        let path = which::which(program).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{program} not found in PATH: {e}"),
            )
        })?;
        Ok(Self::new(path).name(program))
    }

    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    #[must_use]
    pub fn cwd(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.env
            .insert(key.as_ref().to_os_string(), value.as_ref().to_os_string());
        self
    }

    /// Bytes written to the child's stdin, which is then closed.
    #[must_use]
    pub fn stdin(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(content.into());
        self
    }

    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets a timeout if `duration` is present and non-zero.
    #[must_use]
    pub fn maybe_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout = duration.filter(|d| !d.is_zero());
        self
    }

    /// Name used in logs and errors instead of the program file name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub const fn flags(mut self, flags: ProcessFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Program followed by its arguments, for logs.
    #[must_use]
    pub fn command_line(&self) -> String {
        use std::fmt::Write as _;

        let mut line = self.display_name();
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.contains(' ') {
                let _ = write!(line, " \"{arg}\"");
            } else {
                let _ = write!(line, " {arg}");
            }
        }
        line
    }

    fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.program.file_stem().map_or_else(
                || "process".to_string(),
                |s| s.to_string_lossy().into_owned(),
            )
        })
    }

    /// Run to completion from synchronous code.
    ///
    /// Inside a multi-thread runtime the worker blocks in place; anywhere else
    /// the process is driven by a current-thread runtime of its own.
    ///
    /// # Errors
    ///
    /// See [`ProcessBuilder::run_async`].
    pub fn run(&self, token: &CancellationToken) -> ScmResult<ProcessOutput> {
        match Handle::try_current() {
            Ok(handle) if matches!(handle.runtime_flavor(), RuntimeFlavor::MultiThread) => {
                tokio::task::block_in_place(|| handle.block_on(self.run_async(token)))
            }
            // a current-thread runtime cannot be blocked from its own thread
            Ok(_) => std::thread::scope(|scope| {
                scope
                    .spawn(|| self.run_on_own_runtime(token))
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            }),
            Err(_) => self.run_on_own_runtime(token),
        }
    }

    fn run_on_own_runtime(&self, token: &CancellationToken) -> ScmResult<ProcessOutput> {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?
            .block_on(self.run_async(token))
    }

    /// Run to completion.
    ///
    /// # Errors
    ///
    /// - I/O error if the process cannot be spawned.
    /// - `CommandError::Timeout` when the deadline passes (the child is killed).
    /// - `CommandError::Cancelled` when `token` fires (the child is killed).
    /// - `CommandError::Backend` on a non-zero exit unless `ALLOW_FAILURE`.
    pub async fn run_async(&self, token: &CancellationToken) -> ScmResult<ProcessOutput> {
        let name = self.display_name();
        if token.is_cancelled() {
            return Err(CommandError::Cancelled { command: name }.into());
        }
        debug!(process = %name, command = %self.command_line(), "running");

        let mut child = self.build_command().spawn().map_err(|e| {
            std::io::Error::new(e.kind(), format!("failed to execute {name}: {e}"))
        })?;
        trace!(process = %name, pid = ?child.id(), "spawned");

        let writer = self.spawn_stdin_writer(&mut child);
        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());

        // on timeout or cancel the readers are left behind: grandchildren may
        // still hold the pipes open
        let status = tokio::select! {
            status = child.wait() => status?,
            () = token.cancelled() => {
                warn!(process = %name, "cancellation requested, terminating process");
                terminate(&mut child).await;
                return Err(CommandError::Cancelled { command: name }.into());
            }
            () = deadline(self.timeout) => {
                warn!(process = %name, timeout = ?self.timeout, "process timed out");
                terminate(&mut child).await;
                return Err(timeout_error(&name, self.timeout));
            }
        };
        if let Some(writer) = writer
            && writer.await.is_err()
        {
            warn!(process = %name, "stdin writer panicked");
        }
        let stdout = join_reader(stdout).await;
        let stderr = String::from_utf8_lossy(&join_reader(stderr).await)
            .trim()
            .to_string();

        let exit_code = status.code().unwrap_or(-1);
        trace!(process = %name, exit_code, "finished");
        if exit_code != 0 && !self.flags.contains(ProcessFlags::ALLOW_FAILURE) {
            return Err(CommandError::Backend {
                command: name,
                message: if stderr.is_empty() {
                    format!("exited with code {exit_code}")
                } else {
                    stderr
                },
            }
            .into());
        }

        Ok(ProcessOutput {
            exit_code,
            stdout,
            stderr,
        })
    }

    fn build_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(&self.env)
            .stdin(if self.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(if self.flags.contains(ProcessFlags::DISCARD_STDOUT) {
                Stdio::null()
            } else {
                Stdio::piped()
            })
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        command
    }

    fn spawn_stdin_writer(&self, child: &mut Child) -> Option<JoinHandle<()>> {
        let content = self.stdin.clone()?;
        let mut stdin = child.stdin.take()?;
        Some(tokio::spawn(async move {
            // the child may exit without reading; a broken pipe is not an error here
            if let Err(e) = stdin.write_all(&content).await {
                trace!(error = %e, "stdin closed early");
            }
        }))
    }
}

fn timeout_error(name: &str, timeout: Option<Duration>) -> ScmError {
    CommandError::Timeout {
        command: name.to_string(),
        timeout_secs: timeout.map_or(0, |t| t.as_secs()),
    }
    .into()
}

async fn deadline(timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => std::future::pending().await,
    }
}

async fn terminate(child: &mut Child) {
    if let Err(e) = child.kill().await {
        debug!(error = %e, "kill failed, process already exited");
    }
}

fn spawn_reader<R>(stream: Option<R>) -> Option<JoinHandle<Vec<u8>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut stream = stream?;
    Some(tokio::spawn(async move {
        let mut buffer = Vec::new();
        if let Err(e) = stream.read_to_end(&mut buffer).await {
            trace!(error = %e, "output stream closed with error");
        }
        buffer
    }))
}

async fn join_reader(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    match handle {
        Some(handle) => handle.await.unwrap_or_default(),
        None => Vec::new(),
    }
}
