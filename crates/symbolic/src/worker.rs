use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use crate::protocol::{WorkerCommand, WorkerReply};
use crate::types::{SymbolicError, SymbolicPoolConfig};

/// Startup budget for a fresh worker to print its ready line.
const STARTUP_TIMEOUT_SECS: u64 = 30;

/// A single symbolic worker managing one `symbolic-worker` child process.
///
/// Communication is JSON lines over stdin/stdout. Workers track their
/// request count and age for recycling decisions, and are marked dead
/// when the process exits or the pipe breaks so the pool replaces them
/// on next checkout.
pub struct SymbolicWorker {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    program: PathBuf,
    requests_handled: u64,
    next_id: u64,
    started_at: Instant,
    dead: bool,
    config: SymbolicPoolConfig,
}

impl SymbolicWorker {
    /// Spawn a worker process and wait for its `ready.` line.
    pub async fn spawn(config: &SymbolicPoolConfig) -> Result<Self, SymbolicError> {
        let program = config.resolve_worker()?;
        let (child, stdin, stdout) = Self::spawn_process(&program)?;

        let mut worker = Self {
            child,
            stdin,
            stdout,
            program,
            requests_handled: 0,
            next_id: 0,
            started_at: Instant::now(),
            dead: false,
            config: config.clone(),
        };
        worker.consume_ready_line().await?;

        tracing::debug!(program = %worker.program.display(), "Spawned symbolic worker");
        Ok(worker)
    }

    fn spawn_process(
        program: &Path,
    ) -> Result<(Child, BufWriter<ChildStdin>, BufReader<ChildStdout>), SymbolicError> {
        let mut child = Command::new(program)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = BufWriter::new(
            child
                .stdin
                .take()
                .ok_or_else(|| SymbolicError::Protocol("Failed to capture stdin".into()))?,
        );
        let stdout = BufReader::new(
            child
                .stdout
                .take()
                .ok_or_else(|| SymbolicError::Protocol("Failed to capture stdout".into()))?,
        );

        Ok((child, stdin, stdout))
    }

    async fn consume_ready_line(&mut self) -> Result<(), SymbolicError> {
        let mut line = String::new();
        let timeout = std::time::Duration::from_secs(STARTUP_TIMEOUT_SECS);

        match tokio::time::timeout(timeout, self.stdout.read_line(&mut line)).await {
            Ok(Ok(0)) => Err(SymbolicError::ProcessDied),
            Ok(Ok(_)) => {
                let trimmed = line.trim();
                if trimmed != "ready." {
                    tracing::warn!(line = trimmed, "Unexpected first line from symbolic worker");
                }
                Ok(())
            }
            Ok(Err(e)) => Err(SymbolicError::Io(e)),
            Err(_) => Err(SymbolicError::Timeout(STARTUP_TIMEOUT_SECS)),
        }
    }

    /// Whether this worker should be replaced before its next request.
    pub fn needs_recycling(&self) -> bool {
        self.dead
            || self.requests_handled >= self.config.max_requests_per_worker
            || self.started_at.elapsed().as_secs() >= self.config.max_lifetime_secs
    }

    pub fn requests_handled(&self) -> u64 {
        self.requests_handled
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Kill the current process and spawn a fresh one.
    pub async fn recycle(&mut self) -> Result<(), SymbolicError> {
        let _ = self.child.kill().await;
        let _ = self.child.wait().await;

        let (child, stdin, stdout) = Self::spawn_process(&self.program)?;
        self.child = child;
        self.stdin = stdin;
        self.stdout = stdout;
        self.requests_handled = 0;
        self.started_at = Instant::now();
        self.dead = false;

        self.consume_ready_line().await?;

        tracing::debug!("Recycled symbolic worker");
        Ok(())
    }

    /// Send one command and wait for its reply.
    ///
    /// Bounded by `timeout_secs`; on timeout the process is recycled and
    /// [`SymbolicError::Timeout`] is returned.
    pub async fn send(&mut self, command: &WorkerCommand) -> Result<WorkerReply, SymbolicError> {
        self.next_id += 1;
        let id = self.next_id;
        let json = command
            .to_json(id)
            .map_err(|e| SymbolicError::Protocol(format!("Serialization error: {e}")))?;

        if let Err(e) = self.write_line(&json).await {
            self.dead = true;
            return Err(e);
        }

        let timeout_secs = self.config.timeout_secs;
        let timeout = std::time::Duration::from_secs(timeout_secs);
        match tokio::time::timeout(timeout, self.read_reply(id)).await {
            Ok(Ok(reply)) => {
                self.requests_handled += 1;
                Ok(reply)
            }
            Ok(Err(e)) => {
                if matches!(e, SymbolicError::ProcessDied | SymbolicError::Io(_)) {
                    self.dead = true;
                }
                Err(e)
            }
            Err(_) => {
                tracing::warn!(timeout_secs, "Symbolic request timed out, recycling worker");
                if let Err(e) = self.recycle().await {
                    tracing::warn!(error = %e, "Recycle after timeout failed");
                    self.dead = true;
                }
                Err(SymbolicError::Timeout(timeout_secs))
            }
        }
    }

    async fn write_line(&mut self, json: &str) -> Result<(), SymbolicError> {
        self.stdin.write_all(json.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        self.stdin.flush().await?;
        Ok(())
    }

    /// Read lines until the reply for `id` arrives, dropping stale ones.
    async fn read_reply(&mut self, id: u64) -> Result<WorkerReply, SymbolicError> {
        loop {
            let mut line = String::new();
            if self.stdout.read_line(&mut line).await? == 0 {
                return Err(SymbolicError::ProcessDied);
            }
            let (reply_id, reply) = WorkerReply::parse(line.trim())?;
            if reply_id == id {
                return Ok(reply);
            }
            tracing::debug!(expected = id, got = reply_id, "Discarding stale worker reply");
        }
    }

    /// Shut down this worker by killing the child process.
    pub async fn shutdown(&mut self) {
        let _ = self.child.kill().await;
        let _ = self.child.wait().await;
        self.dead = true;
        tracing::debug!("Symbolic worker shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_fails_cleanly_for_missing_binary() {
        let config = SymbolicPoolConfig {
            worker_path: Some(PathBuf::from("/nonexistent/symbolic-worker")),
            ..Default::default()
        };
        let err = SymbolicWorker::spawn(&config).await.err().unwrap();
        assert!(matches!(err, SymbolicError::Io(_)));
    }

    #[test]
    fn request_line_has_no_newline() {
        let json = WorkerCommand::Simplify { expr: "x".into() }.to_json(1).unwrap();
        assert!(!json.ends_with('\n'));
    }
}
