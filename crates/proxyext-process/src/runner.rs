//! Process runner - runs one external command under shutdown supervision

use std::fmt;
use std::future::Future;
use std::io;
use std::pin::{pin, Pin};
use std::process::ExitStatus;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::process::{Child, ChildStdin};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    command::ExternalCommand,
    error::{ProcessError, RunError, RunFailure, ShutdownError},
    platform::{NativePlatform, Platform},
    signals::SignalCoordinator,
    stdio::{Reader, StdStreams, Writer},
};

/// Time a child gets to exit after SIGTERM before it is killed
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(60);

/// Non-terminal states of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Starting,
    Running,
    ShuttingDown,
}

/// How a single run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    StartFailed,
    ExitedOk,
    ExitedWithError,
    /// Exited within the grace period after a shutdown signal
    GracefullyExited,
    /// Still running after the grace period and killed
    ForceKilled,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Runs external commands, cooperating with the signal coordinator for
/// graceful, then forceful, shutdown.
#[derive(Clone)]
pub struct ProcessRunner {
    signals: SignalCoordinator,
    platform: Arc<dyn Platform>,
    grace_period: Duration,
}

impl ProcessRunner {
    /// Runner bound to OS signals and the native platform
    pub fn new() -> Self {
        Self {
            signals: SignalCoordinator::global().clone(),
            platform: Arc::new(NativePlatform),
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    /// Use `signals` instead of the process-wide coordinator
    pub fn with_signals(mut self, signals: SignalCoordinator) -> Self {
        self.signals = signals;
        self
    }

    pub fn with_platform(mut self, platform: impl Platform + 'static) -> Self {
        self.platform = Arc::new(platform);
        self
    }

    /// Set how long a child may take to exit after SIGTERM
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// The coordinator runs subscribe to
    pub fn signals(&self) -> &SignalCoordinator {
        &self.signals
    }

    /// Run `command` with its standard streams bound to `streams`.
    ///
    /// Returns once the command exits on its own, or once a shutdown signal has
    /// been handled: the child is sent SIGTERM, given the grace period to exit,
    /// and killed if it is still running. A shutdown always yields
    /// [`ProcessError::Shutdown`], whatever the child did in response.
    pub async fn run(
        &self,
        command: ExternalCommand,
        streams: &mut StdStreams<'_>,
    ) -> Result<(), ProcessError> {
        let command_line = command.to_string();
        let fail = |cause| ProcessError::from(RunError::new(command_line.as_str(), cause));

        let mut cmd = command.to_tokio();
        cmd.stdin(streams.input.stdio())
            .stdout(streams.output.stdio())
            .stderr(streams.error.stdio())
            .kill_on_drop(true);
        self.platform.configure(&mut cmd);

        // Subscribed before spawning so a signal can never slip in between.
        let token = CancellationToken::new();
        let _unsubscribe = token.clone().drop_guard();
        let mut shutdown = self.signals.setup_signal_handler(token);

        transition(&command_line, RunState::NotStarted, RunState::Starting);
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                finish(&command_line, Termination::StartFailed);
                return Err(fail(RunFailure::Start(e)));
            }
        };
        transition(&command_line, RunState::Starting, RunState::Running);

        let (input, output, error) = streams.pumps();
        let (child_stdout, child_stderr) = (child.stdout.take(), child.stderr.take());
        let mut stdin = pin!(feed(child.stdin.take(), input));
        let mut drained = pin!(async move {
            let (out, err) = tokio::join!(drain(child_stdout, output), drain(child_stderr, error));
            out.and(err)
        });

        let mut status: Option<io::Result<ExitStatus>> = None;
        let mut output_result: Option<io::Result<()>> = None;
        let mut input_result: Option<io::Result<()>> = None;

        let signal = loop {
            if status.is_some() && output_result.is_some() {
                break None;
            }
            tokio::select! {
                res = child.wait(), if status.is_none() => status = Some(res),
                res = &mut drained, if output_result.is_none() => output_result = Some(res),
                res = &mut stdin, if input_result.is_none() => input_result = Some(res),
                signal = shutdown.recv() => break Some(signal),
            }
        };

        let Some(signal) = signal else {
            let result = match status {
                Some(Err(e)) => Err(RunFailure::Wait(e)),
                Some(Ok(s)) if !s.success() => Err(RunFailure::Exit(s)),
                _ => match (output_result, input_result) {
                    (Some(Err(e)), _) | (_, Some(Err(e))) => Err(RunFailure::Io(e)),
                    _ => Ok(()),
                },
            };
            return match result {
                Ok(()) => {
                    finish(&command_line, Termination::ExitedOk);
                    Ok(())
                }
                Err(cause) => {
                    finish(&command_line, Termination::ExitedWithError);
                    Err(fail(cause))
                }
            };
        };

        transition(&command_line, RunState::Running, RunState::ShuttingDown);
        info!(command = %command_line, signal = %signal, "Shutting down external command");

        let termination = self
            .escalate(&mut child, status.is_some(), drained, output_result.is_some())
            .await;
        finish(&command_line, termination);

        Err(ShutdownError::new(signal).into())
    }

    /// SIGTERM, bounded wait, SIGKILL. Output keeps flowing while waiting.
    async fn escalate<O>(
        &self,
        child: &mut Child,
        exited: bool,
        mut output: Pin<&mut O>,
        mut drained: bool,
    ) -> Termination
    where
        O: Future<Output = io::Result<()>>,
    {
        if exited {
            return Termination::GracefullyExited;
        }

        let pid = child.id();
        if self.platform.supports_graceful_termination() {
            let running = matches!(child.try_wait(), Ok(None));
            if running {
                if let Err(e) = self.platform.terminate(child) {
                    warn!(pid = ?pid, error = %e, "Failed to send SIGTERM to external command");
                }
            }

            // Wait for the exit and, within the same window, for the remaining output.
            let mut exit_status = None;
            let _ = tokio::time::timeout(self.grace_period, async {
                while exit_status.is_none() || !drained {
                    tokio::select! {
                        res = child.wait(), if exit_status.is_none() => exit_status = Some(res),
                        _ = &mut output, if !drained => drained = true,
                    }
                }
            })
            .await;

            match exit_status {
                Some(Ok(_)) => return Termination::GracefullyExited,
                Some(Err(e)) => {
                    warn!(pid = ?pid, error = %e, "Failed waiting for external command to exit")
                }
                None => warn!(
                    pid = ?pid,
                    grace_period_secs = self.grace_period.as_secs_f64(),
                    "External command still running after grace period, killing it"
                ),
            }
        }

        // kill() also reaps the child, releasing the process handle.
        if let Err(e) = child.kill().await {
            warn!(pid = ?pid, error = %e, "Failed to kill external command");
        }
        Termination::ForceKilled
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessRunner")
            .field("grace_period", &self.grace_period)
            .finish_non_exhaustive()
    }
}

fn transition(command: &str, from: RunState, to: RunState) {
    debug!(command = %command, from = %from, to = %to, "External command state change");
}

fn finish(command: &str, termination: Termination) {
    debug!(command = %command, termination = %termination, "External command finished");
}

/// Copy `source` into the child's stdin, then close it.
async fn feed(pipe: Option<ChildStdin>, source: Option<Reader<'_>>) -> io::Result<()> {
    let (Some(mut pipe), Some(source)) = (pipe, source) else {
        return Ok(());
    };
    let copied = match tokio::io::copy(source, &mut pipe).await {
        Ok(_) => pipe.shutdown().await,
        Err(e) => Err(e),
    };
    match copied {
        // The child exited (or closed stdin) without reading everything.
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

/// Copy a child's output pipe into `sink` until EOF.
async fn drain<R>(pipe: Option<R>, sink: Option<Writer<'_>>) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let (Some(mut pipe), Some(sink)) = (pipe, sink) else {
        return Ok(());
    };
    tokio::io::copy(&mut pipe, sink).await?;
    sink.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::ManualSignals;

    fn manual_runner() -> (ProcessRunner, ManualSignals) {
        let signals = ManualSignals::new();
        let runner = ProcessRunner::new().with_signals(SignalCoordinator::new(signals.clone()));
        (runner, signals)
    }

    #[test]
    fn test_default_grace_period() {
        assert_eq!(ProcessRunner::new().grace_period(), Duration::from_secs(60));
        assert_eq!(
            ProcessRunner::new()
                .with_grace_period(Duration::from_secs(3))
                .grace_period(),
            Duration::from_secs(3)
        );
    }

    #[tokio::test]
    async fn test_run_true() {
        let (runner, signals) = manual_runner();
        runner
            .run(ExternalCommand::new("true"), &mut StdStreams::null())
            .await
            .unwrap();
        drop(signals);
    }

    #[tokio::test]
    async fn test_run_false_reports_exit_status() {
        let (runner, _signals) = manual_runner();
        let err = runner
            .run(ExternalCommand::new("false"), &mut StdStreams::null())
            .await
            .unwrap_err();

        let run = err.as_run().expect("run error");
        assert_eq!(run.command(), "false");
        assert_eq!(run.exit_code(), Some(1));
        assert!(err.to_string().ends_with("exit status 1"));
    }

    #[tokio::test]
    async fn test_child_that_ignores_stdin() {
        let (runner, _signals) = manual_runner();
        let input = vec![b'x'; 1 << 20];
        let mut reader = input.as_slice();
        let mut streams = StdStreams::null().with_input(&mut reader);

        runner
            .run(ExternalCommand::new("true"), &mut streams)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_working_dir_and_env() {
        let (runner, _signals) = manual_runner();
        let dir = tempfile::tempdir().unwrap();
        let mut stdout = Vec::new();
        let command = ExternalCommand::new("sh")
            .args(["-c", "printf '%s:%s' \"$(pwd -P)\" \"$GREETING\""])
            .current_dir(dir.path())
            .env("GREETING", "hello");

        runner
            .run(command, &mut StdStreams::null().with_output(&mut stdout))
            .await
            .unwrap();

        let expected = format!("{}:hello", dir.path().canonicalize().unwrap().display());
        assert_eq!(String::from_utf8(stdout).unwrap(), expected);
    }
}
