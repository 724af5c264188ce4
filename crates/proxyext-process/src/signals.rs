//! OS signal coordination.
//!
//! # Responsibilities
//! - Subscribe to SIGINT and SIGTERM on behalf of one watched operation
//! - Deliver the first signal exactly once as a shutdown notification
//! - Terminate the host process when a second signal arrives before the
//!   watched operation finished
//!
//! # Design Decisions
//! - OS delivery is process-wide; every subscriber gets its own stream
//!   (tokio fans each signal out to all registered listeners)
//! - Subscribers unregister when their cancellation token fires
//! - The exit hook is injectable so the double-signal path can be tested
//!   without exiting the test process

use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};

use tokio::sync::{broadcast, oneshot};
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Exit status of the host process when a second shutdown signal arrives
pub const FORCED_EXIT_CODE: i32 = 1;

/// A termination signal received by the host process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShutdownSignal {
    /// SIGINT, usually Ctrl-C
    Interrupt,
    /// SIGTERM
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => f.write_str("interrupt"),
            ShutdownSignal::Terminate => f.write_str("terminated"),
        }
    }
}

/// Stream of raw signals belonging to a single subscriber
pub type SignalStream = Pin<Box<dyn Stream<Item = ShutdownSignal> + Send>>;

/// Where signals come from.
///
/// Every call to [`listen`](SignalSource::listen) must return an independent
/// stream that observes every signal delivered after the call returns.
pub trait SignalSource: Send + Sync {
    fn listen(&self) -> io::Result<SignalStream>;
}

/// Signals delivered to the host process by the operating system
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSignals;

impl SignalSource for OsSignals {
    #[cfg(unix)]
    fn listen(&self) -> io::Result<SignalStream> {
        use tokio::signal::unix::{signal, SignalKind};
        use tokio_stream::wrappers::SignalStream as UnixSignalStream;

        let interrupt = UnixSignalStream::new(signal(SignalKind::interrupt())?)
            .map(|()| ShutdownSignal::Interrupt);
        let terminate = UnixSignalStream::new(signal(SignalKind::terminate())?)
            .map(|()| ShutdownSignal::Terminate);

        Ok(Box::pin(interrupt.merge(terminate)))
    }

    #[cfg(not(unix))]
    fn listen(&self) -> io::Result<SignalStream> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "shutdown signals are only supported on POSIX platforms",
        ))
    }
}

/// Signals raised programmatically, for tests and embedders
#[derive(Debug, Clone)]
pub struct ManualSignals {
    tx: broadcast::Sender<ShutdownSignal>,
}

impl ManualSignals {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    /// Deliver `signal` to every current subscriber
    pub fn raise(&self, signal: ShutdownSignal) {
        let _ = self.tx.send(signal);
    }

    /// Number of live subscriber streams
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ManualSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalSource for ManualSignals {
    fn listen(&self) -> io::Result<SignalStream> {
        let stream = tokio_stream::wrappers::BroadcastStream::new(self.tx.subscribe())
            .filter_map(|signal| signal.ok());
        Ok(Box::pin(stream))
    }
}

type ExitHook = Arc<dyn Fn(i32) + Send + Sync>;

/// Turns raw termination signals into one-shot shutdown notifications.
#[derive(Clone)]
pub struct SignalCoordinator {
    source: Arc<dyn SignalSource>,
    exit: ExitHook,
}

impl SignalCoordinator {
    /// Create a coordinator over `source` that exits the process on a second signal
    pub fn new(source: impl SignalSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
            exit: Arc::new(|code| std::process::exit(code)),
        }
    }

    /// The process-wide coordinator over OS signals, created on first use
    pub fn global() -> &'static SignalCoordinator {
        static GLOBAL: OnceLock<SignalCoordinator> = OnceLock::new();
        GLOBAL.get_or_init(|| SignalCoordinator::new(OsSignals))
    }

    /// Replace what happens on a second signal (default: `std::process::exit`)
    pub fn with_exit_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        self.exit = Arc::new(hook);
        self
    }

    /// Start watching for shutdown signals until `token` is cancelled.
    ///
    /// Registration completes before this returns. The notification yields the
    /// first signal and then closes. A second signal arriving while `token` is
    /// still live terminates the process with [`FORCED_EXIT_CODE`].
    ///
    /// Must be called from within a Tokio runtime.
    pub fn setup_signal_handler(&self, token: CancellationToken) -> ShutdownNotification {
        let (tx, rx) = oneshot::channel();

        let mut signals = match self.source.listen() {
            Ok(signals) => signals,
            Err(e) => {
                warn!(error = %e, "Failed to subscribe to shutdown signals");
                return ShutdownNotification { rx: None };
            }
        };

        let exit = self.exit.clone();
        tokio::spawn(async move {
            let first = tokio::select! {
                biased;
                _ = token.cancelled() => return,
                signal = signals.next() => match signal {
                    Some(signal) => signal,
                    None => return,
                },
            };

            debug!(signal = %first, "Shutdown signal received");
            let _ = tx.send(first);

            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                signal = signals.next() => {
                    if let Some(signal) = signal {
                        error!(signal = %signal, "Second shutdown signal received, exiting immediately");
                        exit(FORCED_EXIT_CODE);
                    }
                }
            }
        });

        ShutdownNotification { rx: Some(rx) }
    }
}

impl fmt::Debug for SignalCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalCoordinator").finish_non_exhaustive()
    }
}

/// Receiving end of a single shutdown subscription
#[derive(Debug)]
pub struct ShutdownNotification {
    rx: Option<oneshot::Receiver<ShutdownSignal>>,
}

impl ShutdownNotification {
    /// Wait for the shutdown signal.
    ///
    /// Resolves at most once. After that, or if the subscription ended without
    /// a signal, the returned future never completes. Cancel safe.
    pub async fn recv(&mut self) -> ShutdownSignal {
        if let Some(rx) = self.rx.as_mut() {
            let received = rx.await;
            self.rx = None;
            if let Ok(signal) = received {
                return signal;
            }
        }
        std::future::pending().await
    }

    /// The signal, if it has already arrived and was not yet received
    pub fn try_recv(&mut self) -> Option<ShutdownSignal> {
        let signal = self.rx.as_mut()?.try_recv().ok()?;
        self.rx = None;
        Some(signal)
    }
}
