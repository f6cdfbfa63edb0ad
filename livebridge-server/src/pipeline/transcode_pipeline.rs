use crate::error::{BridgeError, BridgeResult};
use crate::pipeline::PipelineCommand;
use std::collections::VecDeque;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

const STDERR_TAIL_LINES: usize = 20;
const STDERR_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// How a transcoder process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineExit {
    /// `None` when the process was ended by a signal.
    pub code: Option<i32>,
    /// Last lines the process wrote to stderr.
    pub stderr_tail: Vec<String>,
}

impl PipelineExit {
    /// A non-zero exit code. Signal deaths are how we stop the process
    /// ourselves and do not count.
    pub fn is_failure(&self) -> bool {
        matches!(self.code, Some(code) if code != 0)
    }
}

/// A running transcoder child process.
///
/// The child is owned by a monitor task. Exit is reported once on the
/// `exits` channel passed to [`TranscodePipeline::start`] and can also be
/// awaited through [`TranscodePipeline::wait`].
pub struct TranscodePipeline {
    label: String,
    pid: Option<u32>,
    kill_tx: mpsc::Sender<()>,
    exit_rx: watch::Receiver<Option<PipelineExit>>,
}

impl TranscodePipeline {
    pub async fn start(
        command: PipelineCommand,
        label: impl Into<String>,
        exits: mpsc::Sender<PipelineExit>,
    ) -> BridgeResult<Self> {
        let label = label.into();

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                BridgeError::ExternalProcess(format!("failed to start {}: {e}", command.program))
            })?;

        let pid = child.id();
        info!("[{}] Started {} (pid {:?})", label, command.program, pid);

        if let (Some(input), Some(mut stdin)) = (command.stdin, child.stdin.take()) {
            let label = label.clone();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    debug!("[{}] Could not write stdin: {}", label, e);
                }
                // stdin is closed on drop
            });
        }

        let tail = Arc::new(Mutex::new(VecDeque::with_capacity(STDERR_TAIL_LINES)));
        let stderr_task = child.stderr.take().map(|stderr| {
            let label = label.clone();
            let tail = tail.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!("[{}] {}", label, line);
                    if let Ok(mut tail) = tail.lock() {
                        if tail.len() == STDERR_TAIL_LINES {
                            tail.pop_front();
                        }
                        tail.push_back(line);
                    }
                }
            })
        });

        let (kill_tx, mut kill_rx) = mpsc::channel::<()>(1);
        let (exit_tx, exit_rx) = watch::channel(None);

        let monitor_label = label.clone();
        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                Some(()) = kill_rx.recv() => {
                    warn!("[{}] Killing transcoder", monitor_label);
                    if let Err(e) = child.start_kill() {
                        warn!("[{}] Kill failed: {}", monitor_label, e);
                    }
                    child.wait().await
                }
            };

            if let Some(task) = stderr_task {
                let _ = tokio::time::timeout(STDERR_DRAIN_TIMEOUT, task).await;
            }

            let code = match status {
                Ok(status) => status.code(),
                Err(e) => {
                    warn!("[{}] Failed to wait for transcoder: {}", monitor_label, e);
                    None
                }
            };
            let stderr_tail = tail
                .lock()
                .map(|tail| tail.iter().cloned().collect())
                .unwrap_or_default();
            let exit = PipelineExit { code, stderr_tail };

            if exit.is_failure() {
                warn!(
                    "[{}] Transcoder exited with code {:?}: {}",
                    monitor_label,
                    exit.code,
                    exit.stderr_tail.join(" | ")
                );
            } else {
                info!("[{}] Transcoder exited ({:?})", monitor_label, exit.code);
            }

            let _ = exit_tx.send(Some(exit.clone()));
            let _ = exits.send(exit).await;
        });

        Ok(Self {
            label,
            pid,
            kill_tx,
            exit_rx,
        })
    }

    pub fn is_running(&self) -> bool {
        self.exit_rx.borrow().is_none()
    }

    /// Waits for the process to end.
    pub async fn wait(&mut self) -> Option<PipelineExit> {
        self.exit_rx
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|exit| (*exit).clone())
    }

    /// Asks the process to stop, then kills it if it is still alive after
    /// `grace`.
    pub async fn terminate(&mut self, grace: Duration) -> Option<PipelineExit> {
        if let Some(exit) = self.exit_rx.borrow().clone() {
            return Some(exit);
        }

        if !self.request_stop() {
            let _ = self.kill_tx.try_send(());
            return self.wait().await;
        }

        match tokio::time::timeout(grace, self.wait()).await {
            Ok(exit) => exit,
            Err(_) => {
                warn!(
                    "[{}] Transcoder still running after {:?}, killing",
                    self.label, grace
                );
                let _ = self.kill_tx.try_send(());
                self.wait().await
            }
        }
    }

    /// Sends SIGTERM. Returns false if no polite stop could be requested.
    #[cfg(unix)]
    fn request_stop(&self) -> bool {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        let Some(pid) = self.pid.and_then(|pid| i32::try_from(pid).ok()) else {
            return false;
        };
        match kill(Pid::from_raw(pid), Signal::SIGTERM) {
            Ok(()) => {
                debug!("[{}] Sent SIGTERM to {}", self.label, pid);
                true
            }
            Err(e) => {
                warn!("[{}] SIGTERM to {} failed: {}", self.label, pid, e);
                false
            }
        }
    }

    #[cfg(not(unix))]
    fn request_stop(&self) -> bool {
        false
    }
}
