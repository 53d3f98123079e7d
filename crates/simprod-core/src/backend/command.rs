// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Backend that drives the grid middleware through a bridge executable.
//!
//! The bridge is invoked once per operation and answers with JSON on stdout:
//!
//! | Invocation | Stdin | Stdout |
//! |------------|-------|--------|
//! | `find <request-id>` | - | `null` or a job object |
//! | `create` | job spec | job object |
//! | `status <job-id>` | - | `{"status": "<status>"}` |
//! | `destroy <job-id> [--remove-jobs]` | - | ignored |
//!
//! Exit code 75 (`EX_TEMPFAIL`) means the grid system is temporarily
//! unreachable. A failed `create` must leave nothing behind on the grid side.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::traits::*;

/// Exit code the bridge uses for transient unavailability.
const EXIT_TEMPFAIL: i32 = 75;

/// Default timeout for a single bridge invocation.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Deserialize)]
struct StatusReply {
    status: JobStatus,
}

/// Output of a finished bridge invocation.
struct BridgeOutput {
    exit_code: Option<i32>,
    stdout: Vec<u8>,
    stderr: String,
}

/// Job backend that shells out to a bridge executable.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: PathBuf,
    base_args: Vec<String>,
    timeout: Duration,
}

impl CommandBackend {
    /// Create a backend that runs `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Arguments placed before the operation, e.g. a script for an interpreter.
    pub fn with_base_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Override the per-invocation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the bridge with `args`, optionally feeding `input` on stdin.
    async fn invoke(&self, args: &[&str], input: Option<&[u8]>) -> Result<BridgeOutput> {
        debug!(program = %self.program.display(), args = ?args, "Invoking backend bridge");

        let mut child = Command::new(&self.program)
            .args(&self.base_args)
            .args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                BackendError::Unavailable(format!(
                    "failed to start {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        // Feed stdin while collecting output; the timeout bounds both.
        let stdin = child.stdin.take();
        let feed = async move {
            if let (Some(input), Some(mut stdin)) = (input, stdin) {
                match stdin.write_all(input).await {
                    // The bridge exited without reading everything; its exit
                    // code says why.
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                    other => other?,
                }
            }
            Ok::<_, std::io::Error>(())
        };
        let exchange = async { tokio::try_join!(feed, child.wait_with_output()) };

        let (_, output) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                BackendError::Unavailable(format!(
                    "{} timed out after {}s",
                    self.program.display(),
                    self.timeout.as_secs()
                ))
            })??;

        let result = BridgeOutput {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        };

        if result.exit_code == Some(EXIT_TEMPFAIL) {
            return Err(BackendError::Unavailable(result.stderr));
        }

        Ok(result)
    }

    fn failure_message(output: &BridgeOutput) -> String {
        match output.exit_code {
            Some(code) => format!("exit code {}: {}", code, output.stderr),
            None => format!("terminated by signal: {}", output.stderr),
        }
    }
}

#[async_trait]
impl JobBackend for CommandBackend {
    fn backend_type(&self) -> &'static str {
        "command"
    }

    async fn find(&self, request_id: i64) -> Result<Option<Job>> {
        let request_id = request_id.to_string();
        let output = self.invoke(&["find", request_id.as_str()], None).await?;
        if output.exit_code != Some(0) {
            return Err(BackendError::Protocol(Self::failure_message(&output)));
        }
        Ok(serde_json::from_slice(&output.stdout)?)
    }

    async fn create(&self, spec: &JobSpec) -> Result<Job> {
        let input = serde_json::to_vec(spec)?;
        let output = self.invoke(&["create"], Some(&input)).await?;
        if output.exit_code != Some(0) {
            return Err(BackendError::CreateFailed(Self::failure_message(&output)));
        }

        let job: Job = serde_json::from_slice(&output.stdout).map_err(|e| {
            BackendError::Protocol(format!("unreadable create reply: {}", e))
        })?;
        if job.request_id != spec.request_id {
            return Err(BackendError::Protocol(format!(
                "bridge created job {} for request {} instead of {}",
                job.job_id, job.request_id, spec.request_id
            )));
        }
        Ok(job)
    }

    async fn status(&self, job: &Job) -> Result<JobStatus> {
        let output = self.invoke(&["status", job.job_id.as_str()], None).await?;
        if output.exit_code != Some(0) {
            return Err(BackendError::Protocol(Self::failure_message(&output)));
        }
        let reply: StatusReply = serde_json::from_slice(&output.stdout)?;
        Ok(reply.status)
    }

    async fn destroy(&self, job: &Job, remove_submitted_tasks: bool) -> Result<()> {
        let mut args = vec!["destroy", job.job_id.as_str()];
        if remove_submitted_tasks {
            args.push("--remove-jobs");
        }
        let output = self.invoke(&args, None).await?;
        if output.exit_code != Some(0) {
            return Err(BackendError::Protocol(Self::failure_message(&output)));
        }
        Ok(())
    }
}
