//! Shutdown coordination for the demo runtime
//!
//! Signals (or an explicit trigger) raise a shared flag and broadcast a
//! notification. Async code listens on the broadcast; producer threads that
//! run outside tokio poll the flag through [`ShutdownCoordinator::flag`].

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Exit status used when a second signal forces termination
const FORCED_EXIT_CODE: i32 = 130;

/// Coordinates graceful shutdown across async tasks and worker threads
pub struct ShutdownCoordinator {
    shutdown_tx: broadcast::Sender<()>,
    shutdown_requested: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    pub fn new() -> (Self, broadcast::Receiver<()>) {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(8);
        let coordinator = Self {
            shutdown_tx,
            shutdown_requested: Arc::new(AtomicBool::new(false)),
        };
        (coordinator, shutdown_rx)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Shared flag for code that cannot await the broadcast
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown_requested)
    }

    pub fn trigger_shutdown(&self) {
        request(&self.shutdown_tx, &self.shutdown_requested);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    /// Run `future_fn` with signal handlers installed
    ///
    /// Must be called inside a tokio runtime. The first signal requests a
    /// graceful shutdown; a second one exits the process immediately.
    pub async fn guard_with_coordinator<F, Fut, R, E>(future_fn: F) -> Result<R, E>
    where
        F: FnOnce(Self, broadcast::Receiver<()>) -> Fut,
        Fut: std::future::Future<Output = Result<R, E>>,
    {
        let (coordinator, shutdown_rx) = Self::new();
        install_signal_handlers(
            coordinator.shutdown_tx.clone(),
            coordinator.shutdown_requested.clone(),
        );
        future_fn(coordinator, shutdown_rx).await
    }
}

fn request(tx: &broadcast::Sender<()>, requested: &AtomicBool) {
    requested.store(true, Ordering::Release);
    let _ = tx.send(());
}

/// Record one received signal; exits on the second
fn on_signal(tx: &broadcast::Sender<()>, requested: &AtomicBool, received: &AtomicUsize) {
    let previous = received.fetch_add(1, Ordering::AcqRel);
    request(tx, requested);
    if previous >= 1 {
        log::warn!("Second shutdown signal received; exiting immediately");
        std::process::exit(FORCED_EXIT_CODE);
    }
    log::info!("Shutdown requested; stopping producers and draining the queue");
}

fn install_signal_handlers(shutdown_tx: broadcast::Sender<()>, shutdown_requested: Arc<AtomicBool>) {
    let received = Arc::new(AtomicUsize::new(0));

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        // Writing the summary to a closed pipe should end the process quietly
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }

        for kind in [SignalKind::terminate(), SignalKind::hangup(), SignalKind::quit()] {
            let tx = shutdown_tx.clone();
            let requested = shutdown_requested.clone();
            let received = received.clone();
            tokio::spawn(async move {
                if let Ok(mut stream) = signal(kind) {
                    while stream.recv().await.is_some() {
                        on_signal(&tx, &requested, &received);
                    }
                }
            });
        }
    }

    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            on_signal(&shutdown_tx, &shutdown_requested, &received);
        }
    });
}
