//! Capture subprocess management
//!
//! Each listener gets its own capture process writing raw PCM to stdout.
//! The process lives exactly as long as the [`CaptureSession`] that owns it.

use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use uuid::Uuid;

use crate::config::CaptureConfig;
use crate::error::CaptureError;

/// Program and arguments used to start a capture
#[derive(Debug, Clone)]
pub struct CaptureCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl CaptureCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl From<&CaptureConfig> for CaptureCommand {
    fn from(config: &CaptureConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
    }
}

impl Default for CaptureCommand {
    fn default() -> Self {
        Self::from(&CaptureConfig::default())
    }
}

/// A running capture process and its output pipe
pub struct CaptureSession {
    id: Uuid,
    child: Child,
    stdout: ChildStdout,
}

impl CaptureSession {
    /// Launch the capture program
    pub fn spawn(command: &CaptureCommand) -> Result<Self, CaptureError> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CaptureError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.start_kill();
                return Err(CaptureError::MissingStdout);
            }
        };

        let id = Uuid::new_v4();
        tracing::debug!(
            "Capture session {} started: {} (pid {:?})",
            id,
            command.program,
            child.id()
        );

        Ok(Self { id, child, stdout })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// OS process id, `None` once the process has been reaped
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Read the next chunk of PCM. `Ok(0)` means the capture ended.
    pub async fn read_chunk(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stdout.read(buf).await
    }

    /// Forcibly terminate the process
    pub fn kill(&mut self) {
        if let Err(e) = self.child.start_kill() {
            // InvalidInput means it already exited
            if e.kind() != std::io::ErrorKind::InvalidInput {
                tracing::warn!("Failed to kill capture session {}: {}", self.id, e);
            }
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.kill();
        tracing::debug!("Capture session {} terminated", self.id);
    }
}
