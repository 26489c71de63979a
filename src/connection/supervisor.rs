//! The abort orchestrator.
//!
//! # Responsibilities
//! - Arm/cancel the connection's tracker as protocol phases begin and end
//! - Receive fired timeouts on the connection's own task (never the
//!   heartbeat's) and execute the abort sequence exactly once
//! - Keep the bookkeeping a farewell frame needs: open streams and the
//!   highest fully processed stream id
//!
//! # Data Flow
//! ```text
//! I/O context:   connection_opened / headers_complete / stream_closed / ...
//!                        │ arm / cancel
//!                        ▼
//!                  TimeoutTracker ──fire──▶ AbortSignal (mpsc) ──▶ run()
//!                                                                   │
//!                        farewell ▸ resets ▸ typed failure ◀────────┘
//! ```

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc, watch};

use crate::config::TimeoutConfig;
use crate::heartbeat::Heartbeat;
use crate::observability::metrics;
use crate::time::Clock;
use crate::timeout::{TimeoutHandler, TimeoutReason, TimeoutTracker, TrackerError};
use crate::wire::{FrameSink, StreamId};

use super::abort::{AbortEvent, ConnectionTimedOut};
use super::{ConnectionId, ConnectionState, StreamHeaderPhase};

/// Bridges tracker fires from the heartbeat task onto the connection's task.
///
/// `on_timeout` only enqueues the fired reason; the heartbeat never executes
/// abort work.
struct AbortSignal {
    conn: ConnectionId,
    tx: mpsc::UnboundedSender<TimeoutReason>,
}

impl TimeoutHandler for AbortSignal {
    fn on_timeout(&self, reason: TimeoutReason) {
        if self.tx.send(reason).is_err() {
            tracing::debug!(
                connection = %self.conn,
                %reason,
                "Timeout fired after supervisor task ended; dropping"
            );
        }
    }
}

#[derive(Debug)]
struct SupervisorState {
    state: ConnectionState,
    /// Header progress of the stream currently inside a header block, if any.
    header_phase: Option<(StreamId, StreamHeaderPhase)>,
    /// Streams the peer has opened and not yet closed.
    open_streams: BTreeSet<StreamId>,
    /// Highest stream id fully processed; advertised in the farewell frame.
    highest_processed: StreamId,
    /// The stream that armed the current timeout, when narrower than the
    /// connection.
    timeout_scope: Option<StreamId>,
}

/// Per-connection timeout policy and abort state machine.
///
/// Owns the connection's [`TimeoutTracker`]; the heartbeat holds a non-owning
/// reference for ticking. Phase-event methods are called from the
/// connection's I/O context and never block.
pub struct ConnectionSupervisor<S: FrameSink> {
    id: ConnectionId,
    limits: TimeoutConfig,
    sink: S,
    heartbeat: Arc<Heartbeat>,
    tracker: Arc<TimeoutTracker>,
    state: Mutex<SupervisorState>,
    fired_rx: Mutex<Option<mpsc::UnboundedReceiver<TimeoutReason>>>,
    failure_tx: watch::Sender<Option<ConnectionTimedOut>>,
}

impl<S: FrameSink> ConnectionSupervisor<S> {
    /// Create a supervisor for a freshly accepted connection.
    ///
    /// Wires the capability chain: tracker → abort signal → this supervisor,
    /// initializes the tracker at the clock's current tick and registers it
    /// with the heartbeat.
    pub fn new(
        limits: TimeoutConfig,
        sink: S,
        heartbeat: Arc<Heartbeat>,
        clock: &dyn Clock,
    ) -> Arc<Self> {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let tracker = Arc::new(TimeoutTracker::new(Arc::new(AbortSignal { conn: id, tx })));
        tracker
            .initialize(clock.now())
            .expect("fresh tracker already initialized");
        heartbeat.register(&tracker);

        let (failure_tx, _) = watch::channel(None);

        tracing::debug!(connection = %id, tracker = %tracker.id(), "Connection supervisor created");

        Arc::new(Self {
            id,
            limits,
            sink,
            heartbeat,
            tracker,
            state: Mutex::new(SupervisorState {
                state: ConnectionState::Open,
                header_phase: None,
                open_streams: BTreeSet::new(),
                highest_processed: StreamId::default(),
                timeout_scope: None,
            }),
            fired_rx: Mutex::new(Some(rx)),
            failure_tx,
        })
    }

    /// This connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.lock().state
    }

    /// The connection's tracker, for lifecycle management and tests.
    pub fn tracker(&self) -> &Arc<TimeoutTracker> {
        &self.tracker
    }

    /// Subscribe to the typed failure surfaced when a timeout closes this
    /// connection. Holds `None` until then.
    pub fn failure(&self) -> watch::Receiver<Option<ConnectionTimedOut>> {
        self.failure_tx.subscribe()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SupervisorState> {
        self.state.lock().expect("supervisor mutex poisoned")
    }

    fn arm(&self, reason: TimeoutReason) -> Result<(), TrackerError> {
        self.tracker.set_timeout(self.limits.ticks_for(reason), reason)
    }

    /// Cancel the armed timeout, but only if `reason` is what is armed.
    /// Keeps one phase's completion from disarming another phase's guard.
    fn cancel_if(&self, reason: TimeoutReason) {
        if self.tracker.armed_reason() == Some(reason) {
            self.tracker.cancel_timeout();
        }
    }

    /// Transport established: start waiting for the first header block.
    pub fn connection_opened(&self) -> Result<(), TrackerError> {
        {
            let mut st = self.lock();
            if st.state != ConnectionState::Open {
                return Ok(());
            }
            st.state = ConnectionState::AwaitingHeaders;
        }
        self.arm(TimeoutReason::RequestHeaders)
    }

    /// The peer opened a stream. Ends any idle period.
    pub fn stream_opened(&self, stream: StreamId) {
        {
            let mut st = self.lock();
            if st.state.is_terminal() {
                return;
            }
            st.open_streams.insert(stream);
        }
        self.cancel_if(TimeoutReason::KeepAlive);
    }

    /// A header frame arrived but the block is incomplete.
    ///
    /// While the first request's headers are pending the connection-level
    /// guard from [`connection_opened`](Self::connection_opened) is already
    /// armed and is left running; only the stream scope is recorded. Inside
    /// an active connection this arms a fresh stream-scoped guard.
    pub fn header_frame_partial(&self, stream: StreamId) -> Result<(), TrackerError> {
        let arm_needed = {
            let mut st = self.lock();
            match st.state {
                ConnectionState::AwaitingHeaders => {
                    st.timeout_scope = Some(stream);
                    false
                }
                ConnectionState::Active => {
                    st.header_phase = Some((stream, StreamHeaderPhase::Partial));
                    st.timeout_scope = Some(stream);
                    true
                }
                _ => return Ok(()),
            }
        };
        if arm_needed {
            self.arm(TimeoutReason::RequestHeaders)?;
        }
        Ok(())
    }

    /// The header block for `stream` completed in time.
    pub fn headers_complete(&self, stream: StreamId) {
        {
            let mut st = self.lock();
            match st.state {
                ConnectionState::AwaitingHeaders => {
                    st.state = ConnectionState::Active;
                }
                ConnectionState::Active => {
                    if let Some((pending, phase)) = st.header_phase.as_mut() {
                        if *pending == stream {
                            *phase = StreamHeaderPhase::Complete;
                        }
                    }
                }
                _ => return,
            }
            st.timeout_scope = None;
        }
        self.cancel_if(TimeoutReason::RequestHeaders);
    }

    /// A request body transfer began on `stream`.
    pub fn request_body_started(&self, stream: StreamId) -> Result<(), TrackerError> {
        {
            let mut st = self.lock();
            if st.state != ConnectionState::Active {
                return Ok(());
            }
            st.timeout_scope = Some(stream);
        }
        self.arm(TimeoutReason::RequestBody)
    }

    /// The request body finished in time.
    pub fn request_body_complete(&self) {
        self.lock().timeout_scope = None;
        self.cancel_if(TimeoutReason::RequestBody);
    }

    /// Buffered response data started waiting on the peer to drain it.
    pub fn flush_started(&self) -> Result<(), TrackerError> {
        if self.lock().state != ConnectionState::Active {
            return Ok(());
        }
        self.arm(TimeoutReason::WriteFlush)
    }

    /// The write buffer drained in time.
    pub fn flush_complete(&self) {
        self.cancel_if(TimeoutReason::WriteFlush);
    }

    /// A stream closed. `fully_processed` marks it eligible for the farewell
    /// frame's last-processed advertisement.
    ///
    /// Draining the last open stream of an active connection starts the
    /// keep-alive idle guard.
    pub fn stream_closed(&self, stream: StreamId, fully_processed: bool) -> Result<(), TrackerError> {
        let (cancel_scoped, start_idle) = {
            let mut st = self.lock();
            if st.state.is_terminal() {
                return Ok(());
            }
            st.open_streams.remove(&stream);
            if fully_processed && stream > st.highest_processed {
                st.highest_processed = stream;
            }
            if st
                .header_phase
                .map(|(pending, _)| pending == stream)
                .unwrap_or(false)
            {
                st.header_phase = None;
            }
            let cancel_scoped = st.timeout_scope == Some(stream);
            if cancel_scoped {
                st.timeout_scope = None;
            }
            let start_idle =
                st.state == ConnectionState::Active && st.open_streams.is_empty();
            (cancel_scoped, start_idle)
        };

        if cancel_scoped {
            // the guard belonged to the stream that just went away
            self.tracker.cancel_timeout();
        }
        if start_idle {
            self.arm(TimeoutReason::KeepAlive)?;
        }
        Ok(())
    }

    /// Voluntarily close the connection: farewell with the last processed
    /// stream, then tear down. Not a timeout; no failure is published.
    pub fn initiate_graceful_close(&self) {
        let last = {
            let mut st = self.lock();
            if st.state.is_terminal() {
                return;
            }
            st.state = ConnectionState::GracefullyClosing;
            st.highest_processed
        };
        self.tracker.cancel_timeout();

        tracing::info!(connection = %self.id, last_processed = %last, "Closing connection gracefully");
        if let Err(error) = self.sink.send_go_away(last) {
            tracing::warn!(connection = %self.id, %error, "Failed to send farewell frame during graceful close");
        }

        self.finish_close();
    }

    /// External teardown (peer vanished, listener shutting down): stop
    /// ticking and close without touching the wire.
    pub fn shutdown(&self) {
        {
            let mut st = self.lock();
            if st.state == ConnectionState::Closed {
                return;
            }
            st.state = ConnectionState::Closed;
            st.open_streams.clear();
        }
        self.tracker.cancel_timeout();
        self.heartbeat.unregister(&self.tracker);
        tracing::debug!(connection = %self.id, "Connection supervisor shut down");
    }

    /// Consume fired timeouts until the supervisor closes or `shutdown`
    /// signals. Spawned on the connection's own task.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let mut fired = {
            let mut slot = self.fired_rx.lock().expect("supervisor mutex poisoned");
            match slot.take() {
                Some(rx) => rx,
                None => {
                    tracing::error!(connection = %self.id, "Supervisor run loop started twice; ignoring");
                    return;
                }
            }
        };

        loop {
            tokio::select! {
                maybe_reason = fired.recv() => {
                    match maybe_reason {
                        Some(reason) => self.execute_abort(reason),
                        None => break,
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!(connection = %self.id, "Supervisor received shutdown signal, exiting loop");
                    self.shutdown();
                    break;
                }
            }
        }
    }

    /// The abort sequence. Runs exactly once per connection; fires arriving
    /// once the connection is terminal are dropped.
    fn execute_abort(&self, reason: TimeoutReason) {
        let (event, last, open, graceful) = {
            let mut st = self.lock();
            if st.state.is_terminal() {
                tracing::debug!(
                    connection = %self.id,
                    %reason,
                    "Timeout fired on terminated connection; ignoring"
                );
                return;
            }
            let graceful =
                reason == TimeoutReason::KeepAlive && st.open_streams.is_empty();
            st.state = if graceful {
                ConnectionState::GracefullyClosing
            } else {
                ConnectionState::Aborting
            };
            let event = AbortEvent::for_reason(reason, st.timeout_scope);
            let open: Vec<StreamId> = st.open_streams.iter().copied().collect();
            (event, st.highest_processed, open, graceful)
        };

        if graceful {
            tracing::info!(
                connection = %self.id,
                "Connection idle past the keep-alive limit; closing gracefully"
            );
        } else if let Some(stream) = event.stream {
            tracing::warn!(
                connection = %self.id,
                reason = %event.reason,
                code = %event.code,
                %stream,
                "Stream phase timed out; aborting connection"
            );
        } else {
            tracing::warn!(
                connection = %self.id,
                reason = %event.reason,
                code = %event.code,
                "Connection timed out; aborting"
            );
        }

        // The farewell must precede stream closure notifications on the wire.
        match self.sink.send_go_away(last) {
            Ok(()) => {
                metrics::record_farewell(true);
                tracing::debug!(connection = %self.id, last_processed = %last, "Farewell frame queued");
            }
            Err(error) => {
                metrics::record_farewell(false);
                tracing::warn!(
                    connection = %self.id,
                    %error,
                    "Failed to send farewell frame; proceeding with local teardown"
                );
            }
        }

        for stream in open {
            if let Err(error) = self.sink.reset_stream(stream, event.code) {
                tracing::warn!(
                    connection = %self.id,
                    %stream,
                    %error,
                    "Failed to reset stream during abort"
                );
            }
        }

        metrics::record_abort(event.reason, event.code);
        self.finish_close();

        // published last so observers of the failure see a closed connection
        self.failure_tx.send_replace(Some(ConnectionTimedOut::from(&event)));
    }

    /// Shared tail of every teardown path: mark closed, disarm, unregister.
    fn finish_close(&self) {
        {
            let mut st = self.lock();
            st.state = ConnectionState::Closed;
            st.open_streams.clear();
        }
        // a phase event may have re-armed between the fire and here
        self.tracker.cancel_timeout();
        self.heartbeat.unregister(&self.tracker);
    }
}
