//! Launching the external deployment script.
//!
//! The HTTP handler only knows about the [`DeployTrigger`] trait. The
//! production implementation, [`ScriptTrigger`], runs the configured script
//! as a detached child process; tests substitute a fake that records calls.
//!
//! Launches are fire-and-forget. Nothing limits how many deployments run at
//! once, there is no timeout, and a running script is never cancelled.

use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::config::DeployConfig;

/// Starts a deployment. Must return without waiting for it to finish.
pub trait DeployTrigger: Send + Sync {
    fn launch(&self, secret: &str);
}

/// Runs `<interpreter> <script> <secret>` in the background.
#[derive(Debug, Clone)]
pub struct ScriptTrigger {
    interpreter: String,
    script: PathBuf,
}

impl ScriptTrigger {
    pub fn new(interpreter: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            script: script.into(),
        }
    }

    pub fn from_config(config: &DeployConfig) -> Self {
        Self::new(config.interpreter.clone(), config.script.clone())
    }

    fn command(&self, secret: &str) -> Command {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(&self.script)
            .arg(secret)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        cmd
    }

    /// Spawn the script on a background task and return that task's handle.
    ///
    /// Must be called from within a Tokio runtime. The task holds the child
    /// only to reap it and log how it exited; it runs inside the caller's
    /// span so its logs carry the request ID.
    pub fn spawn(&self, secret: &str) -> JoinHandle<io::Result<ExitStatus>> {
        let mut cmd = self.command(secret);
        let interpreter = self.interpreter.clone();
        let script = self.script.clone();

        let task = async move {
            let mut child = cmd.spawn().map_err(|e| {
                tracing::error!(
                    error = %e,
                    interpreter = %interpreter,
                    script = %script.display(),
                    "Failed to start deployment script"
                );
                e
            })?;

            let pid = child.id();
            tracing::info!(
                pid = ?pid,
                interpreter = %interpreter,
                script = %script.display(),
                "Deployment script started"
            );

            match child.wait().await {
                Ok(status) if status.success() => {
                    tracing::info!(pid = ?pid, "Deployment script finished");
                    Ok(status)
                }
                Ok(status) => {
                    tracing::warn!(pid = ?pid, status = %status, "Deployment script failed");
                    Ok(status)
                }
                Err(e) => {
                    tracing::error!(pid = ?pid, error = %e, "Failed to wait on deployment script");
                    Err(e)
                }
            }
        };

        tokio::spawn(task.instrument(tracing::Span::current()))
    }
}

impl DeployTrigger for ScriptTrigger {
    fn launch(&self, secret: &str) {
        // Detached: the handle is dropped and the task runs on its own.
        drop(self.spawn(secret));
    }
}
