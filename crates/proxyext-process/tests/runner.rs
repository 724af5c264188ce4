//! Process runner tests
//!
//! Child processes are the scripts under `testdata/`; shutdown signals are
//! raised through `ManualSignals` so tests can run in parallel.

#![cfg(unix)]

use std::io::{self, ErrorKind};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use proxyext_process::{
    ExternalCommand, ManualSignals, Platform, ProcessError, ProcessRunner, RunFailure,
    ShutdownSignal, SignalCoordinator, StdStreams, FORCED_EXIT_CODE,
};
use tokio::process::{Child, Command};

fn runner_with(signals: &ManualSignals, grace_period: Duration) -> ProcessRunner {
    ProcessRunner::new()
        .with_signals(SignalCoordinator::new(signals.clone()))
        .with_grace_period(grace_period)
}

async fn wait_for_file(path: &Path) {
    for _ in 0..500 {
        if path.exists() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} never appeared", path.display());
}

async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..300 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

fn recorded_signals(dir: &Path) -> String {
    std::fs::read_to_string(dir.join("signals")).unwrap_or_default()
}

fn recorded_pid(dir: &Path) -> Pid {
    let pid = std::fs::read_to_string(dir.join("pid")).unwrap();
    Pid::from_raw(pid.trim().parse().unwrap())
}

/// A platform without graceful termination, recording any attempt to use it
#[derive(Default)]
struct KillOnlyPlatform {
    terminate_called: Arc<AtomicBool>,
}

impl Platform for KillOnlyPlatform {
    fn configure(&self, _cmd: &mut Command) {}

    fn supports_graceful_termination(&self) -> bool {
        false
    }

    fn terminate(&self, _child: &Child) -> io::Result<()> {
        self.terminate_called.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_stdio_round_trip() {
    let signals = ManualSignals::new();
    let runner = runner_with(&signals, Duration::from_secs(3));

    let mut stdin: &[u8] = b"stdin\n";
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut streams = StdStreams::null()
        .with_input(&mut stdin)
        .with_output(&mut stdout)
        .with_error(&mut stderr);

    let command = ExternalCommand::new("testdata/test_stdio.sh").args(["0", "stderr"]);
    runner.run(command, &mut streams).await.unwrap();
    drop(streams);

    assert_eq!(String::from_utf8(stdout).unwrap(), "stdin");
    assert_eq!(String::from_utf8(stderr).unwrap(), "stderr");
}

#[tokio::test]
async fn test_nonzero_exit_is_run_error() {
    let signals = ManualSignals::new();
    let runner = runner_with(&signals, Duration::from_secs(3));

    let command = ExternalCommand::new("testdata/test_stdio.sh").arg("123");
    let err = runner
        .run(command, &mut StdStreams::null())
        .await
        .unwrap_err();

    assert!(!err.is_shutdown());
    assert_eq!(
        err.to_string(),
        "failed to execute an external command \"testdata/test_stdio.sh 123\": exit status 123"
    );
    assert_eq!(err.as_run().and_then(|e| e.exit_code()), Some(123));
}

#[tokio::test]
async fn test_missing_program_fails_to_start() {
    let signals = ManualSignals::new();
    let runner = runner_with(&signals, Duration::from_secs(3));

    let started = Instant::now();
    let err = runner
        .run(
            ExternalCommand::new("testdata/does-not-exist.sh"),
            &mut StdStreams::null(),
        )
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(1));
    let run = err.as_run().expect("run error");
    assert!(matches!(run.cause(), RunFailure::Start(e) if e.kind() == ErrorKind::NotFound));
    assert!(err
        .to_string()
        .starts_with("failed to execute an external command \"testdata/does-not-exist.sh\""));
}

#[tokio::test]
async fn test_shutdown_sends_sigterm_first() {
    let signals = ManualSignals::new();
    let grace = Duration::from_secs(3);
    let runner = runner_with(&signals, grace);
    let dir = tempfile::tempdir().unwrap();

    let mut stdout = Vec::new();
    let mut streams = StdStreams::null().with_output(&mut stdout);
    let command = ExternalCommand::new("testdata/test_sigterm.sh")
        .arg(dir.path().to_string_lossy().to_string());

    let started = Instant::now();
    let (result, ()) = tokio::join!(runner.run(command, &mut streams), async {
        wait_for_file(&dir.path().join("ready")).await;
        signals.raise(ShutdownSignal::Interrupt);
    });
    drop(streams);

    match result {
        Err(ProcessError::Shutdown(e)) => assert_eq!(e.signal(), ShutdownSignal::Interrupt),
        other => panic!("expected shutdown error, got {:?}", other),
    }
    assert!(started.elapsed() < grace, "child should exit well within the grace period");
    assert_eq!(recorded_signals(dir.path()), "SIGTERM\n");
    assert_eq!(String::from_utf8(stdout).unwrap(), "terminating\n");
}

#[tokio::test]
async fn test_unresponsive_child_is_killed_after_grace_period() {
    let signals = ManualSignals::new();
    let grace = Duration::from_secs(1);
    let runner = runner_with(&signals, grace);
    let dir = tempfile::tempdir().unwrap();

    let command = ExternalCommand::new("testdata/test_ignore_sigterm.sh")
        .arg(dir.path().to_string_lossy().to_string());

    let mut streams = StdStreams::null();
    let mut signalled_at = None;
    let (result, ()) = tokio::join!(runner.run(command, &mut streams), async {
        wait_for_file(&dir.path().join("ready")).await;
        signalled_at = Some(Instant::now());
        signals.raise(ShutdownSignal::Terminate);
    });

    let err = result.unwrap_err();
    assert_eq!(
        err.as_shutdown().map(|e| e.signal()),
        Some(ShutdownSignal::Terminate)
    );
    assert!(signalled_at.expect("signal raised").elapsed() >= grace);
    assert_eq!(recorded_signals(dir.path()), "SIGTERM\n");
    assert_eq!(kill(recorded_pid(dir.path()), None), Err(Errno::ESRCH));
}

#[tokio::test]
async fn test_platform_without_graceful_termination_kills_immediately() {
    let signals = ManualSignals::new();
    let grace = Duration::from_secs(5);
    let platform = KillOnlyPlatform::default();
    let terminate_called = platform.terminate_called.clone();
    let runner = runner_with(&signals, grace).with_platform(platform);
    let dir = tempfile::tempdir().unwrap();

    let command = ExternalCommand::new("testdata/test_ignore_sigterm.sh")
        .arg(dir.path().to_string_lossy().to_string());

    let mut streams = StdStreams::null();
    let mut signalled_at = None;
    let (result, ()) = tokio::join!(runner.run(command, &mut streams), async {
        wait_for_file(&dir.path().join("ready")).await;
        signalled_at = Some(Instant::now());
        signals.raise(ShutdownSignal::Interrupt);
    });

    let err = result.unwrap_err();
    assert_eq!(
        err.as_shutdown().map(|e| e.signal()),
        Some(ShutdownSignal::Interrupt)
    );
    assert!(signalled_at.expect("signal raised").elapsed() < grace);
    assert!(!terminate_called.load(Ordering::SeqCst));
    assert_eq!(recorded_signals(dir.path()), "");
    assert_eq!(kill(recorded_pid(dir.path()), None), Err(Errno::ESRCH));
}

#[tokio::test]
async fn test_second_signal_during_grace_period_forces_exit() {
    let signals = ManualSignals::new();
    let exited = Arc::new(AtomicI32::new(-1));
    let hook = exited.clone();
    let coordinator = SignalCoordinator::new(signals.clone())
        .with_exit_hook(move |code| hook.store(code, Ordering::SeqCst));
    let runner = ProcessRunner::new()
        .with_signals(coordinator)
        .with_grace_period(Duration::from_secs(1));
    let dir = tempfile::tempdir().unwrap();

    let command = ExternalCommand::new("testdata/test_ignore_sigterm.sh")
        .arg(dir.path().to_string_lossy().to_string());

    let mut streams = StdStreams::null();
    let (result, forced) = tokio::join!(runner.run(command, &mut streams), async {
        wait_for_file(&dir.path().join("ready")).await;
        signals.raise(ShutdownSignal::Interrupt);
        wait_for_file(&dir.path().join("signals")).await;
        signals.raise(ShutdownSignal::Interrupt);
        eventually(|| exited.load(Ordering::SeqCst) == FORCED_EXIT_CODE).await
    });

    assert!(forced, "second signal should trigger the exit hook");
    assert!(result.unwrap_err().is_shutdown());
}

#[tokio::test]
async fn test_sequential_runs_release_subscriptions() {
    let signals = ManualSignals::new();
    let runner = runner_with(&signals, Duration::from_secs(3));

    for _ in 0..5 {
        runner
            .run(ExternalCommand::new("true"), &mut StdStreams::null())
            .await
            .unwrap();
    }
    assert!(eventually(|| signals.subscriber_count() == 0).await);

    // Nothing is listening, so this must not affect the next run.
    signals.raise(ShutdownSignal::Interrupt);
    runner
        .run(ExternalCommand::new("true"), &mut StdStreams::null())
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let command = ExternalCommand::new("testdata/test_sigterm.sh")
        .arg(dir.path().to_string_lossy().to_string());
    let mut streams = StdStreams::null();
    let (result, ()) = tokio::join!(runner.run(command, &mut streams), async {
        wait_for_file(&dir.path().join("ready")).await;
        assert_eq!(signals.subscriber_count(), 1);
        signals.raise(ShutdownSignal::Terminate);
    });

    assert!(result.unwrap_err().is_shutdown());
    assert!(eventually(|| signals.subscriber_count() == 0).await);
}

#[tokio::test]
async fn test_exit_wins_when_no_signal_arrives() {
    let signals = ManualSignals::new();
    let runner = runner_with(&signals, Duration::from_secs(3));

    let mut stdout = Vec::new();
    let mut streams = StdStreams::null().with_output(&mut stdout);
    let command = ExternalCommand::new("sh").args(["-c", "sleep 0.2; echo done"]);

    runner.run(command, &mut streams).await.unwrap();
    drop(streams);

    // A signal after completion has no one to reach.
    signals.raise(ShutdownSignal::Interrupt);
    assert_eq!(String::from_utf8(stdout).unwrap(), "done\n");
}
