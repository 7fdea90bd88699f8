//! Worker sessions as child processes.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};

use super::protocol::WorkerMessage;
use super::{ResultRecord, Session, SessionFactory, SessionSpec};
use crate::config::WorkerConfig;
use crate::error::{SessionError, WorkerInitError};

/// Spawns `program args...` per job, writes the [`SessionSpec`] as one JSON
/// line on stdin, and reads [`WorkerMessage`] lines from stdout.
///
/// Children are spawned with `kill_on_drop` in their own process group, so a
/// cancelled job's process is killed when its session is dropped and only
/// the orchestrator decides when a worker stops.
#[derive(Debug, Clone)]
pub struct CommandSessionFactory {
    program: String,
    args: Vec<String>,
}

impl CommandSessionFactory {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(cfg: &WorkerConfig) -> Self {
        Self::new(cfg.program.clone(), cfg.args.clone())
    }

    async fn handshake(
        &self,
        child: &mut Child,
        spec: &SessionSpec,
    ) -> Result<Lines<BufReader<ChildStdout>>, WorkerInitError> {
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| WorkerInitError::new("worker stdin unavailable"))?;
        let mut line = serde_json::to_vec(spec)
            .map_err(|e| WorkerInitError::new(format!("encode session spec: {}", e)))?;
        line.push(b'\n');
        stdin
            .write_all(&line)
            .await
            .map_err(|e| WorkerInitError::new(format!("send session spec: {}", e)))?;
        drop(stdin);

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| WorkerInitError::new("worker stdout unavailable"))?;
        let mut lines = BufReader::new(stdout).lines();
        let first = lines
            .next_line()
            .await
            .map_err(|e| WorkerInitError::new(format!("read handshake: {}", e)))?;
        match first.as_deref().map(WorkerMessage::parse) {
            Some(Ok(WorkerMessage::Ready)) => Ok(lines),
            Some(Ok(WorkerMessage::Error { message })) => Err(WorkerInitError::new(message)),
            Some(Ok(other)) => Err(WorkerInitError::new(format!(
                "expected ready, got {:?}",
                other
            ))),
            Some(Err(e)) => Err(WorkerInitError::new(format!("bad handshake line: {}", e))),
            None => Err(WorkerInitError::new("worker exited before ready")),
        }
    }
}

#[async_trait]
impl SessionFactory for CommandSessionFactory {
    async fn open(&self, spec: &SessionSpec) -> Result<Box<dyn Session>, WorkerInitError> {
        let mut std_command = std::process::Command::new(&self.program);
        std_command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        // Own process group: a terminal Ctrl-C reaches the orchestrator only.
        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut std_command, 0);
        let mut child = Command::from(std_command)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| WorkerInitError::new(format!("spawn {}: {}", self.program, e)))?;

        match self.handshake(&mut child, spec).await {
            Ok(lines) => {
                tracing::debug!(pid = ?child.id(), program = %self.program, "worker ready");
                Ok(Box::new(CommandSession { child, lines }))
            }
            Err(e) => {
                reap(&mut child).await;
                Err(e)
            }
        }
    }
}

struct CommandSession {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
}

#[async_trait]
impl Session for CommandSession {
    async fn collect(&mut self) -> Result<Vec<ResultRecord>, SessionError> {
        let mut records = Vec::new();
        while let Some(line) = self.lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match WorkerMessage::parse(&line) {
                Ok(WorkerMessage::Record { fields }) => records.push(fields),
                Ok(WorkerMessage::Done) => return Ok(records),
                Ok(WorkerMessage::Error { message }) => return Err(SessionError::Worker(message)),
                Ok(WorkerMessage::Ready) => {
                    tracing::debug!("ignoring repeated ready from worker");
                }
                Err(e) => return Err(SessionError::Protocol(format!("{}: {}", e, line))),
            }
        }
        // Output ended without `done`: only a clean exit means no more results.
        let status = self.child.wait().await?;
        if status.success() {
            Ok(records)
        } else {
            Err(SessionError::Worker(format!(
                "worker {} after {} record(s)",
                status,
                records.len()
            )))
        }
    }

    async fn close(&mut self) {
        reap(&mut self.child).await;
    }
}

/// Kill (if still running) and wait for the child so it never lingers.
async fn reap(child: &mut Child) {
    match child.try_wait() {
        Ok(Some(_)) => return,
        Ok(None) => {}
        Err(e) => tracing::debug!(error = %e, "could not poll worker status"),
    }
    if let Err(e) = child.kill().await {
        tracing::debug!(error = %e, "could not kill worker");
    }
}
