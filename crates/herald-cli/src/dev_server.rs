//! Local dev-server launcher and readiness poller.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::time::sleep;

use herald_core::{RetryPolicy, retry_until};

/// Substring the dev server prints once it accepts connections.
pub const READY_MARKER: &str = "Ready in";

/// How long to wait for the ready marker before giving up.
const STARTUP_TIMEOUT: Duration = Duration::from_secs(60);

/// Readiness probe budget: 30 probes, one second apart.
const READY_PROBES: u32 = 30;

/// Terminal startup states. The first transition wins; no further events
/// are processed after it.
#[derive(Debug)]
enum Startup {
    Ready,
    TimedOut,
    Exited(std::process::ExitStatus),
}

/// A running dev-server child process.
#[derive(Debug)]
pub struct DevServer {
    child: Child,
}

impl DevServer {
    /// Start the scaffolded app's dev server on `port` and wait for its
    /// ready marker. Startup failure (exit before the marker, or timeout)
    /// is fatal.
    pub async fn start(project_dir: &Path, port: u16) -> Result<Self> {
        let mut command = Command::new("npm");
        command
            .args(["run", "dev"])
            .current_dir(project_dir)
            .env("PORT", port.to_string());
        tracing::info!(port, "Starting dev server (npm run dev)");
        Self::start_command(command, STARTUP_TIMEOUT).await
    }

    /// Spawn `command` and wait for [`READY_MARKER`] on its stdout,
    /// streaming every line to the console as it arrives.
    pub(crate) async fn start_command(mut command: Command, timeout: Duration) -> Result<Self> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = command.spawn().context("failed to spawn dev server")?;
        let stdout = child
            .stdout
            .take()
            .context("dev server stdout not captured")?;
        let mut lines = BufReader::new(stdout).lines();
        let mut stdout_open = true;

        let deadline = sleep(timeout);
        tokio::pin!(deadline);

        let outcome = loop {
            tokio::select! {
                line = lines.next_line(), if stdout_open => {
                    match line {
                        Ok(Some(line)) => {
                            #[allow(clippy::print_stdout)]
                            {
                                println!("{line}");
                            }
                            if line.contains(READY_MARKER) {
                                break Startup::Ready;
                            }
                        }
                        Ok(None) | Err(_) => stdout_open = false,
                    }
                }
                status = child.wait() => {
                    break Startup::Exited(status.context("waiting for dev server")?);
                }
                () = &mut deadline => {
                    break Startup::TimedOut;
                }
            }
        };

        match outcome {
            Startup::Ready => Ok(Self { child }),
            Startup::TimedOut => {
                let _ = child.kill().await;
                bail!(
                    "dev server did not report ready within {}s",
                    timeout.as_secs()
                );
            }
            Startup::Exited(status) => {
                bail!("dev server exited before reporting ready ({status})");
            }
        }
    }

    /// Terminate the child process.
    pub async fn stop(mut self) {
        let _ = self.child.kill().await;
    }
}

/// Probe `http://localhost:<port>` until it answers 200 or the budget is
/// exhausted. Exhaustion is soft: the caller proceeds with a warning.
pub async fn wait_for_server_ready(port: u16) -> bool {
    wait_with_policy(port, RetryPolicy::per_second(READY_PROBES)).await
}

pub(crate) async fn wait_with_policy(port: u16, policy: RetryPolicy) -> bool {
    let http = reqwest::Client::new();
    let url = format!("http://localhost:{port}");
    retry_until(
        policy,
        || {
            let http = http.clone();
            let url = url.clone();
            async move {
                // Connection errors just mean "not yet".
                match http.get(&url).send().await {
                    Ok(response) => response.status() == reqwest::StatusCode::OK,
                    Err(_) => false,
                }
            }
        },
        |attempt| tracing::debug!(attempt, "waiting for dev server to answer"),
    )
    .await
}
