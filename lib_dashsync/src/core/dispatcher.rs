//! # Dispatcher
//!
//! The orchestrator of the engine. It owns the lifecycle of the whole pipeline
//! and routes every decoded event to the store that handles it.
//!
//! ## Lifecycle
//! `Idle → Running → Stopped`. `start()` spawns two tasks: the transport adapter
//! and the pipeline loop. `stop()` cancels both, disposes the stores and waits
//! for the pipeline to finish.
//!
//! ## Single mutation queue
//! Both stores are owned by the pipeline task and only touched from its loop.
//! The loop multiplexes three inputs, in priority order:
//!
//! 1.  **Shutdown**, from `stop()`.
//! 2.  **Payloads**, from the adapter, in delivery order.
//! 3.  **Expiries**, from message timers, by id.
//!
//! Nothing else can mutate the stores, so no locks are needed. After every
//! change the new visible state is published on `watch` channels (`SyncViews`).
//!
//! ## Transport failure
//! When the adapter ends with an error the status becomes `Failed` and the loop
//! keeps running so messages continue to expire. The dispatcher never
//! resubscribes or switches transports; the caller watches `SyncViews::status`
//! and decides.

use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::configs::SyncConfig;
use crate::core::alert_store::{Alert, AlertStore};
use crate::core::decoder::{decode, RawPayload, SyncEvent};
use crate::core::message_window::{MessageWindow, TransientMessage};
use crate::errors::{SyncError, TransportError};
use crate::ingestors::TransportAdapter;

/// Lifecycle state of a `Dispatcher`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Idle,
    Running,
    Stopped,
}

/// Health of the stream feeding the pipeline, as seen by observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStatus {
    /// Not started yet.
    Idle,
    /// The adapter is running.
    Streaming,
    /// The adapter ended with an error. Terminal for this dispatcher.
    Failed(String),
    /// `stop()` was called.
    Stopped,
}

impl StreamStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamStatus::Failed(_) | StreamStatus::Stopped)
    }
}

/// # Sync Views
///
/// Read-only observable state for the rendering layer. Each receiver always
/// holds the latest snapshot.
#[derive(Debug, Clone)]
pub struct SyncViews {
    /// Visible transient messages, oldest first.
    pub messages: watch::Receiver<Vec<TransientMessage>>,
    /// Visible triggered alerts, newest first.
    pub alerts: watch::Receiver<Vec<Alert>>,
    pub status: watch::Receiver<StreamStatus>,
}

impl SyncViews {
    /// Waits until the stream has failed or been stopped.
    ///
    /// # Returns
    /// The terminal status, or `Stopped` if the dispatcher was dropped.
    pub async fn terminated(&mut self) -> StreamStatus {
        match self.status.wait_for(StreamStatus::is_terminal).await {
            Ok(status) => status.clone(),
            Err(_) => StreamStatus::Stopped,
        }
    }
}

/// Sending halves of the `SyncViews` channels.
struct Publishers {
    messages: watch::Sender<Vec<TransientMessage>>,
    alerts: watch::Sender<Vec<Alert>>,
    status: watch::Sender<StreamStatus>,
}

/// # Core Dispatcher
pub struct Dispatcher {
    message_capacity: usize,
    state: DispatcherState,
    shutdown: CancellationToken,
    pipeline: Option<JoinHandle<()>>,
    /// Held until `start()` hands them to the pipeline.
    publishers: Option<Publishers>,
    views: SyncViews,
}

impl Dispatcher {
    /// Creates an idle dispatcher whose message window shows `message_capacity` messages.
    pub fn new(message_capacity: usize) -> Self {
        let (messages_tx, messages_rx) = watch::channel(Vec::new());
        let (alerts_tx, alerts_rx) = watch::channel(Vec::new());
        let (status_tx, status_rx) = watch::channel(StreamStatus::Idle);

        Self {
            message_capacity,
            state: DispatcherState::Idle,
            shutdown: CancellationToken::new(),
            pipeline: None,
            publishers: Some(Publishers {
                messages: messages_tx,
                alerts: alerts_tx,
                status: status_tx,
            }),
            views: SyncViews {
                messages: messages_rx,
                alerts: alerts_rx,
                status: status_rx,
            },
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.message_capacity)
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    /// Returns fresh receivers on the visible state. Can be called any number of times.
    pub fn views(&self) -> SyncViews {
        self.views.clone()
    }

    /// # Start
    ///
    /// Moves `Idle → Running` and begins consuming `adapter`.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// `SyncError::InvalidTransition` unless the dispatcher is idle.
    pub fn start(&mut self, adapter: TransportAdapter) -> Result<(), SyncError> {
        let publishers = match (self.state, self.publishers.take()) {
            (DispatcherState::Idle, Some(publishers)) => publishers,
            (from, publishers) => {
                self.publishers = publishers;
                return Err(SyncError::InvalidTransition {
                    from,
                    to: DispatcherState::Running,
                });
            }
        };

        log::info!("Starting dispatcher on the {} transport.", adapter.kind());

        let (payload_tx, payload_rx) = mpsc::unbounded_channel();
        let (expiry_tx, expiry_rx) = mpsc::unbounded_channel();

        let adapter_task = tokio::spawn(adapter.run(payload_tx, self.shutdown.child_token()));

        let pipeline = Pipeline {
            window: MessageWindow::new(self.message_capacity, expiry_tx),
            alerts: AlertStore::new(),
            publishers,
        };
        pipeline.publishers.status.send_replace(StreamStatus::Streaming);

        self.pipeline = Some(tokio::spawn(pipeline.run(
            payload_rx,
            expiry_rx,
            adapter_task,
            self.shutdown.clone(),
        )));
        self.state = DispatcherState::Running;
        Ok(())
    }

    /// # Stop
    ///
    /// Moves to `Stopped`: halts the adapter, cancels every pending message
    /// timer and waits for the pipeline task to finish. Stopping an idle or
    /// already stopped dispatcher only records the state.
    ///
    /// # Errors
    /// `SyncError::Join` if the pipeline task panicked.
    pub async fn stop(&mut self) -> Result<(), SyncError> {
        let previous = std::mem::replace(&mut self.state, DispatcherState::Stopped);
        self.shutdown.cancel();

        if let Some(pipeline) = self.pipeline.take() {
            pipeline.await?;
        } else if let Some(publishers) = &self.publishers {
            publishers.status.send_replace(StreamStatus::Stopped);
        }

        if previous != DispatcherState::Stopped {
            log::info!("Dispatcher stopped (was {:?}).", previous);
        }
        Ok(())
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Dropping a running dispatcher tears the pipeline down in the background.
        self.shutdown.cancel();
    }
}

/// State owned by the pipeline task.
struct Pipeline {
    window: MessageWindow,
    alerts: AlertStore,
    publishers: Publishers,
}

impl Pipeline {
    async fn run(
        mut self,
        mut payload_rx: mpsc::UnboundedReceiver<RawPayload>,
        mut expiry_rx: mpsc::UnboundedReceiver<u64>,
        adapter_task: JoinHandle<Result<(), TransportError>>,
        shutdown: CancellationToken,
    ) {
        let mut adapter_task = Some(adapter_task);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                Some(payload) = payload_rx.recv() => self.route(payload),

                Some(id) = expiry_rx.recv() => {
                    if self.window.expire(id) {
                        self.publishers.messages.send_replace(self.window.visible());
                    }
                }

                result = async {
                    match adapter_task.as_mut() {
                        Some(task) => task.await,
                        None => std::future::pending().await,
                    }
                }, if adapter_task.is_some() => {
                    adapter_task = None;
                    self.on_adapter_finished(result);
                }
            }
        }

        self.window.dispose();
        self.alerts.dispose();
        if let Some(task) = adapter_task {
            // The adapter watches a child of `shutdown`, so this returns promptly.
            if let Ok(Err(e)) = task.await {
                log::debug!("Adapter ended during shutdown: {}", e);
            }
        }
        self.publishers.status.send_replace(StreamStatus::Stopped);
        log::debug!("Pipeline task finished.");
    }

    /// Decodes one payload and hands the event to its store.
    fn route(&mut self, payload: RawPayload) {
        let tag = payload.event.as_deref().unwrap_or("-");

        match decode(&payload) {
            Ok(Some(SyncEvent::Alert(alert))) => {
                self.alerts.ingest(alert);
                self.publishers.alerts.send_replace(self.alerts.visible());
            }
            Ok(Some(SyncEvent::Message(message))) => {
                self.window.ingest(message);
                self.publishers.messages.send_replace(self.window.visible());
            }
            Ok(None) => {
                log::debug!("Ignoring incomplete message payload [{}]: {}", tag, payload.data);
                return;
            }
            Err(e) => {
                log::warn!("Dropping undecodable payload [{}]: {}", tag, e);
                return;
            }
        }

        log::trace!(
            "Routed [{}] payload in {}us.",
            tag,
            Instant::now().duration_since(payload.received_at).as_micros()
        );
    }

    fn on_adapter_finished(&mut self, result: Result<Result<(), TransportError>, tokio::task::JoinError>) {
        let status = match result {
            Ok(Ok(())) => {
                log::info!("Transport adapter finished.");
                return;
            }
            Ok(Err(e)) => {
                log::error!("Transport failed: {}. The stream will not be restarted.", e);
                StreamStatus::Failed(e.to_string())
            }
            Err(e) => {
                log::error!("Transport task aborted: {}", e);
                StreamStatus::Failed(e.to_string())
            }
        };
        self.publishers.status.send_replace(status);
    }
}
