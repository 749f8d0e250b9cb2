use std::panic::AssertUnwindSafe;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use scribe_core::agent::{AgentRuntime, RunEvent, RunRequest};

use crate::error::EngineError;

#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// Bound of the event channel; the worker blocks when the consumer
    /// falls this far behind.
    pub channel_capacity: usize,
    pub startup_timeout: Duration,
    pub shutdown_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
            startup_timeout: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

enum BridgeItem {
    Event(RunEvent),
    /// Pushed on every worker exit path. Carries the worker's error,
    /// if it had one.
    Done(Option<EngineError>),
}

/// Drives an async agent run on a dedicated worker thread and exposes
/// its events as a blocking iterator.
///
/// The worker owns a private current-thread tokio runtime; the sync
/// side never touches async state directly. Construction blocks until
/// the worker is up, so a `cancel()` issued immediately afterwards is
/// observed before the first event. `close()` (also run on drop) tears
/// the worker down within a bounded wait and logs a leaked worker
/// instead of hanging.
pub struct RunBridge {
    rx: Option<Receiver<BridgeItem>>,
    done_rx: Receiver<()>,
    token: CancellationToken,
    worker: Option<JoinHandle<()>>,
    shutdown_timeout: Duration,
    finished: bool,
    closed: bool,
}

impl RunBridge {
    pub fn spawn(
        runtime: Arc<dyn AgentRuntime>,
        request: RunRequest,
        config: BridgeConfig,
    ) -> Result<Self, EngineError> {
        let (tx, rx) = mpsc::sync_channel(config.channel_capacity);
        let (ready_tx, ready_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();
        let token = CancellationToken::new();
        let worker_token = token.clone();

        let worker = std::thread::Builder::new()
            .name("scribe-run-bridge".into())
            .spawn(move || {
                worker_main(runtime, request, worker_token, tx, ready_tx);
                let _ = done_tx.send(());
            })
            .map_err(|e| EngineError::Internal(format!("spawn bridge worker: {e}")))?;

        if ready_rx.recv_timeout(config.startup_timeout).is_err() {
            token.cancel();
            warn!(
                timeout_ms = config.startup_timeout.as_millis() as u64,
                "bridge worker did not start in time - abandoning thread"
            );
            return Err(EngineError::Internal(
                "bridge worker did not start in time".into(),
            ));
        }

        Ok(Self {
            rx: Some(rx),
            done_rx,
            token,
            worker: Some(worker),
            shutdown_timeout: config.shutdown_timeout,
            finished: false,
            closed: false,
        })
    }

    /// Request cancellation of the underlying run. Idempotent, callable
    /// from any thread at any time.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Tear down the worker. Idempotent. A worker that does not finish
    /// within the shutdown timeout is logged and abandoned.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.finished = true;

        self.token.cancel();
        // Dropping the receiver unblocks a worker stuck on a full channel.
        self.rx = None;

        match self.done_rx.recv_timeout(self.shutdown_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(worker) = self.worker.take() {
                    if worker.join().is_err() {
                        warn!("bridge worker panicked during shutdown");
                    }
                }
                debug!("bridge worker shut down");
            }
            Err(RecvTimeoutError::Timeout) => {
                self.worker.take();
                warn!(
                    timeout_ms = self.shutdown_timeout.as_millis() as u64,
                    "bridge worker did not exit in time - leaking thread"
                );
            }
        }
    }
}

impl Iterator for RunBridge {
    type Item = Result<RunEvent, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let rx = self.rx.as_ref()?;
        match rx.recv() {
            Ok(BridgeItem::Event(event)) => Some(Ok(event)),
            Ok(BridgeItem::Done(None)) => {
                self.finished = true;
                None
            }
            Ok(BridgeItem::Done(Some(err))) => {
                self.finished = true;
                Some(Err(err))
            }
            // Worker dropped its sender without a sentinel; treat as done.
            Err(_) => {
                self.finished = true;
                None
            }
        }
    }
}

impl Drop for RunBridge {
    fn drop(&mut self) {
        self.close();
    }
}

fn worker_main(
    runtime: Arc<dyn AgentRuntime>,
    request: RunRequest,
    token: CancellationToken,
    tx: SyncSender<BridgeItem>,
    ready_tx: mpsc::Sender<()>,
) {
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            let _ = ready_tx.send(());
            let _ = tx.send(BridgeItem::Done(Some(EngineError::Internal(format!(
                "build bridge runtime: {e}"
            )))));
            return;
        }
    };

    let _ = ready_tx.send(());

    let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
        rt.block_on(async {
            let mut run = runtime.start_run(request);

            // Catch a cancel issued between construction and the first poll.
            if token.is_cancelled() {
                run.cancel().await;
                return None;
            }

            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        run.cancel().await;
                        return None;
                    }
                    event = run.next_event() => {
                        match event {
                            Some(RunEvent::RunError { message }) => {
                                return Some(EngineError::Run(message));
                            }
                            Some(event) => {
                                // Consumer gone; nothing left to deliver to.
                                if tx.send(BridgeItem::Event(event)).is_err() {
                                    run.cancel().await;
                                    return None;
                                }
                            }
                            None => return None,
                        }
                    }
                }
            }
        })
    }));

    let sentinel = match outcome {
        Ok(err) => BridgeItem::Done(err),
        Err(panic) => BridgeItem::Done(Some(EngineError::WorkerPanic(panic_message(&panic)))),
    };
    let _ = tx.send(sentinel);
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
