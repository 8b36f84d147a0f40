//! Session façade and connection lifecycle.
//!
//! A [`Session`] owns at most one connection. Every script-based operation
//! funnels through [`Session::execute`]:
//!
//! ```text
//! execute ─► interrupt ─► enter raw ─► paced slices ─► Ctrl-D
//!                                                        │
//!                         exit raw ◄── execution-finished ┘
//! ```
//!
//! # Signal Pump
//!
//! `open` spawns a task that drains the transport's signal channel:
//!
//! - `Opened` publishes `connected` and wakes the device
//! - `Data` is decoded and published as `output`
//! - `Error` is published as `transport-error`
//! - `Closed` drops the connection and publishes `disconnected`

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};

use futures_util::Stream;
use futures_util::stream;
use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::ExecutionId;
use crate::repl::{PacedOutcome, PacedWriter, RawRepl};
use crate::transport::{
    Connector, PortEnumerator, PortInfo, Transport, TransportLink, TransportSignal, Utf8Decoder,
};

use super::event::SessionEvent;
use super::execution::{Execution, ExecutionOutcome};
use super::options::{OverlapPolicy, SessionOptions};
use super::state::ConnectionState;

// ============================================================================
// Connection
// ============================================================================

/// Execution currently holding the connection.
struct Inflight {
    id: ExecutionId,
    cancel: CancellationToken,
}

/// State guard for the execute pipeline.
#[derive(Default)]
struct ExecSlot {
    state: ConnectionState,
    current: Option<Inflight>,
}

/// One open transport and everything bound to it.
pub(crate) struct Connection {
    /// Port the transport was opened on.
    port: String,
    /// Write handle.
    transport: Arc<dyn Transport>,
    /// Mode controller.
    repl: RawRepl,
    /// Paced script writer.
    writer: PacedWriter,
    /// Pipeline state and in-flight execution.
    exec: Mutex<ExecSlot>,
    /// Held across the raw-mode exit and around each claim, so a new
    /// execution never lands between an exit decision and its write.
    handoff: tokio::sync::Mutex<()>,
    /// Output received since the last list/load.
    scratch: Mutex<String>,
    /// Signal pump task.
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    fn new(port: &str, transport: Arc<dyn Transport>, options: &SessionOptions) -> Self {
        Self {
            port: port.to_string(),
            repl: RawRepl::new(Arc::clone(&transport)),
            writer: PacedWriter::new(
                Arc::clone(&transport),
                options.slice_size,
                options.pacing_unit(),
            ),
            transport,
            exec: Mutex::new(ExecSlot::default()),
            handoff: tokio::sync::Mutex::new(()),
            scratch: Mutex::new(String::new()),
            pump: Mutex::new(None),
        }
    }

    fn state(&self) -> ConnectionState {
        self.exec.lock().state
    }

    /// Takes the slot for `id`, returning the execution it displaced.
    fn claim(
        &self,
        id: ExecutionId,
        cancel: CancellationToken,
        overlap: OverlapPolicy,
    ) -> Result<Option<Inflight>> {
        let mut slot = self.exec.lock();
        if slot.state.is_busy() && overlap == OverlapPolicy::Reject {
            warn!(state = %slot.state, "Execution rejected, session busy");
            return Err(Error::busy(slot.state));
        }

        slot.state = ConnectionState::RawEntering;
        Ok(slot.current.replace(Inflight { id, cancel }))
    }

    /// Moves to `state` if `id` still holds the slot.
    fn advance(&self, id: ExecutionId, state: ConnectionState) -> bool {
        let mut slot = self.exec.lock();
        if slot.current.as_ref().is_some_and(|c| c.id == id) {
            slot.state = state;
            true
        } else {
            false
        }
    }

    /// Frees the slot if `id` still holds it.
    fn release(&self, id: ExecutionId) {
        let mut slot = self.exec.lock();
        if slot.current.as_ref().is_some_and(|c| c.id == id) {
            slot.current = None;
            slot.state = ConnectionState::Idle;
        }
    }

    /// Cancels the in-flight execution, leaving it to exit raw mode.
    fn cancel_current(&self) {
        if let Some(current) = self.exec.lock().current.as_ref() {
            debug!(id = %current.id, "Cancelling execution");
            current.cancel.cancel();
        }
    }

    /// Cancels the in-flight execution and takes the slot away from it.
    fn detach_current(&self) {
        let mut slot = self.exec.lock();
        if let Some(current) = slot.current.take() {
            debug!(id = %current.id, "Detaching execution");
            current.cancel.cancel();
        }
        slot.state = ConnectionState::Idle;
    }

    fn shutdown_tasks(&self) {
        self.detach_current();
        if let Some(pump) = self.pump.lock().take() {
            pump.abort();
        }
    }
}

// ============================================================================
// ExecutionRequest
// ============================================================================

/// A script to run and what to do around it.
pub(crate) struct ExecutionRequest {
    script: String,
    /// Path announced with `file-saved` once the script is transmitted.
    saves: Option<String>,
    /// Clear the scratch buffer once the connection is claimed.
    clears_scratch: bool,
}

impl ExecutionRequest {
    pub(crate) fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            saves: None,
            clears_scratch: false,
        }
    }

    pub(crate) fn saving(mut self, path: impl Into<String>) -> Self {
        self.saves = Some(path.into());
        self
    }

    pub(crate) fn clearing_scratch(mut self) -> Self {
        self.clears_scratch = true;
        self
    }
}

// ============================================================================
// Session
// ============================================================================

/// Shared session state.
struct SessionInner {
    options: SessionOptions,
    events: broadcast::Sender<SessionEvent>,
    connection: Mutex<Option<Arc<Connection>>>,
}

impl SessionInner {
    fn emit(&self, event: SessionEvent) {
        trace!(event = event.name(), "Publishing event");
        // no subscribers is not an error
        let _ = self.events.send(event);
    }

    /// Drops `connection` after the transport reported it ended.
    fn handle_remote_close(&self, connection: &Arc<Connection>) {
        let was_current = {
            let mut guard = self.connection.lock();
            if guard.as_ref().is_some_and(|c| Arc::ptr_eq(c, connection)) {
                guard.take();
                true
            } else {
                false
            }
        };

        connection.detach_current();

        if was_current {
            info!(port = %connection.port, "Transport closed by remote");
            self.emit(SessionEvent::Disconnected);
        }
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        // The transport itself needs an async close; only tasks are stopped here.
        if let Some(connection) = self.connection.get_mut().take() {
            connection.shutdown_tasks();
        }
    }
}

/// A control session with one device.
///
/// # Example
///
/// ```no_run
/// use board_repl::{Session, SessionEvent, SessionOptions, TcpConnector};
///
/// # async fn example() -> board_repl::Result<()> {
/// let session = Session::new(SessionOptions::default())?;
/// let mut events = session.subscribe();
///
/// session.open(&TcpConnector, "192.168.4.1:2217").await?;
/// session.execute("print(1 + 1)").await?;
///
/// while let Ok(event) = events.recv().await {
///     if let SessionEvent::Output { text } = event {
///         print!("{text}");
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("port", &self.port())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Session - Constructor & Accessors
// ============================================================================

impl Session {
    /// Creates a closed session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `options` fail validation.
    pub fn new(options: SessionOptions) -> Result<Self> {
        options.validate()?;
        let (events, _) = broadcast::channel(options.event_capacity);

        Ok(Self {
            inner: Arc::new(SessionInner {
                options,
                events,
                connection: Mutex::new(None),
            }),
        })
    }

    /// Returns the session options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &SessionOptions {
        &self.inner.options
    }

    /// Subscribes to session events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Returns session events as a stream. Lagged events are skipped.
    pub fn events(&self) -> impl Stream<Item = SessionEvent> + Send + use<> {
        stream::unfold(self.subscribe(), |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => return Some((event, receiver)),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event subscriber lagged");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
    }

    /// Returns `true` while a connection is held.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.connection.lock().is_some()
    }

    /// Returns `true` while an execution is in flight.
    #[inline]
    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.state().is_busy()
    }

    /// Returns `true` if raw mode was requested and not yet exited.
    #[must_use]
    pub fn raw_mode_active(&self) -> bool {
        self.current_connection()
            .is_some_and(|c| c.repl.is_raw())
    }

    /// Returns the pipeline state, `Idle` when closed.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.current_connection()
            .map(|c| c.state())
            .unwrap_or_default()
    }

    /// Returns the port of the open connection.
    #[must_use]
    pub fn port(&self) -> Option<String> {
        self.current_connection().map(|c| c.port.clone())
    }

    /// Returns output received since the last `list_files`/`load_file`.
    #[must_use]
    pub fn scratch(&self) -> String {
        self.current_connection()
            .map(|c| c.scratch.lock().clone())
            .unwrap_or_default()
    }

    fn current_connection(&self) -> Option<Arc<Connection>> {
        self.inner.connection.lock().clone()
    }

    fn connection(&self) -> Result<Arc<Connection>> {
        self.current_connection().ok_or(Error::NotConnected)
    }

}

// ============================================================================
// Session - Lifecycle
// ============================================================================

impl Session {
    /// Opens `port` through `connector`.
    ///
    /// `connected` is published once the transport signals it is open,
    /// followed by a wake carriage return. An already open connection is
    /// closed first.
    ///
    /// # Errors
    ///
    /// Connector errors are returned unchanged.
    pub async fn open(&self, connector: &dyn Connector, port: &str) -> Result<()> {
        if self.is_open() {
            debug!("Replacing open connection");
            self.close().await?;
        }

        let baud_rate = self.inner.options.baud_rate;
        let TransportLink { transport, signals } = connector.connect(port, baud_rate).await?;

        let connection = Arc::new(Connection::new(port, transport, &self.inner.options));
        *self.inner.connection.lock() = Some(Arc::clone(&connection));

        let pump = tokio::spawn(run_signal_pump(
            Arc::downgrade(&self.inner),
            Arc::clone(&connection),
            signals,
        ));
        *connection.pump.lock() = Some(pump);

        info!(port, baud_rate, "Session opened");
        Ok(())
    }

    /// Publishes `disconnected` and closes the transport if one is open.
    ///
    /// Safe to call on a closed session.
    ///
    /// # Errors
    ///
    /// Transport close errors are returned unchanged.
    pub async fn close(&self) -> Result<()> {
        self.inner.emit(SessionEvent::Disconnected);

        let connection = self.inner.connection.lock().take();
        let Some(connection) = connection else {
            return Ok(());
        };

        connection.shutdown_tasks();
        connection.transport.close().await?;

        info!(port = %connection.port, "Session closed");
        Ok(())
    }
}

// ============================================================================
// Session - Execution
// ============================================================================

impl Session {
    /// Runs `code` on the device in raw mode.
    ///
    /// Returns once the interrupt and raw-mode entry have been written; the
    /// script itself is transmitted in the background. Completion is
    /// observable through the returned [`Execution`] or the
    /// `execution-finished` event.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no connection is open
    /// - [`Error::Busy`] if another execution is in flight and the overlap
    ///   policy is [`OverlapPolicy::Reject`]
    /// - Transport errors from the preamble writes
    pub async fn execute(&self, code: &str) -> Result<Execution> {
        self.start_execution(ExecutionRequest::new(code)).await
    }

    /// Claims the connection and starts transmitting `request`.
    pub(crate) async fn start_execution(&self, request: ExecutionRequest) -> Result<Execution> {
        let ExecutionRequest {
            script,
            saves,
            clears_scratch,
        } = request;

        let connection = self.connection()?;
        let id = ExecutionId::generate();
        let cancel = CancellationToken::new();

        let previous = {
            let _handoff = connection.handoff.lock().await;
            connection.claim(id, cancel.clone(), self.inner.options.overlap)?
        };
        if let Some(previous) = previous {
            debug!(%id, previous = %previous.id, "Preempting execution");
            previous.cancel.cancel();
        }

        if clears_scratch {
            connection.scratch.lock().clear();
        }

        self.inner.emit(SessionEvent::ExecutionStarted { id });

        if let Err(e) = enter_raw(&connection).await {
            warn!(%id, error = %e, "Raw mode entry failed");
            connection.release(id);
            self.inner.emit(SessionEvent::ExecutionCancelled { id });
            return Err(e);
        }
        connection.advance(id, ConnectionState::Transmitting);

        debug!(%id, bytes = script.len(), "Execution started");

        let task = tokio::spawn(run_execution(
            self.inner.events.clone(),
            connection,
            id,
            cancel.clone(),
            script,
            saves,
        ));

        Ok(Execution::new(id, cancel, task))
    }

    /// Writes `command` as-is, outside the raw-mode protocol.
    ///
    /// Meant for single interactive lines; include the line ending.
    pub async fn evaluate(&self, command: &str) -> Result<()> {
        let connection = self.connection()?;
        debug!(bytes = command.len(), "Evaluating command");
        connection.transport.write(command.as_bytes()).await
    }

    /// Interrupts the device and cancels any in-flight schedule.
    pub async fn stop(&self) -> Result<()> {
        let connection = self.connection()?;
        connection.cancel_current();
        connection.repl.interrupt().await
    }

    /// Interrupts, then soft-resets the device interpreter.
    ///
    /// Any in-flight schedule is cancelled without exiting raw mode.
    pub async fn soft_reset(&self) -> Result<()> {
        let connection = self.connection()?;
        connection.detach_current();
        connection.repl.soft_reset().await
    }

    /// Lists ports that report a vendor identifier, in enumeration order.
    ///
    /// # Errors
    ///
    /// - [`Error::NoPortsAvailable`] if no port reports a vendor identifier
    /// - Enumerator errors are returned unchanged
    pub async fn list_available(enumerator: &dyn PortEnumerator) -> Result<Vec<PortInfo>> {
        let ports: Vec<PortInfo> = enumerator
            .list_ports()
            .await?
            .into_iter()
            .filter(PortInfo::has_vendor_id)
            .collect();

        if ports.is_empty() {
            debug!("No ports with a vendor identifier");
            return Err(Error::NoPortsAvailable);
        }

        debug!(count = ports.len(), "Ports available");
        Ok(ports)
    }
}

// ============================================================================
// Background Tasks
// ============================================================================

/// Interrupt, then enter raw mode.
async fn enter_raw(connection: &Connection) -> Result<()> {
    connection.repl.interrupt().await?;
    connection.repl.enter().await
}

/// Transmits one script and runs the finish sequence.
async fn run_execution(
    events: broadcast::Sender<SessionEvent>,
    connection: Arc<Connection>,
    id: ExecutionId,
    cancel: CancellationToken,
    script: String,
    saves: Option<String>,
) -> Result<ExecutionOutcome> {
    let paced = match connection.writer.run(script.as_bytes(), &cancel).await {
        Ok(paced) => paced,
        Err(e) => {
            warn!(%id, error = %e, "Transmission failed");
            connection.release(id);
            return Err(e);
        }
    };

    let _handoff = connection.handoff.lock().await;

    let outcome = match paced {
        PacedOutcome::Completed => {
            let _ = events.send(SessionEvent::ExecutionFinished { id });
            if let Some(path) = saves {
                info!(%id, path = %path, "File saved");
                let _ = events.send(SessionEvent::FileSaved { path });
            }
            ExecutionOutcome::Finished
        }
        PacedOutcome::Cancelled => {
            let _ = events.send(SessionEvent::ExecutionCancelled { id });
            ExecutionOutcome::Cancelled
        }
    };

    // A preempting execution or soft reset owns the device now.
    if connection.advance(id, ConnectionState::RawExiting) {
        let exited = match outcome {
            ExecutionOutcome::Finished => connection.repl.exit().await,
            ExecutionOutcome::Cancelled => connection.repl.abort().await,
        };
        connection.release(id);
        exited?;
    }

    debug!(%id, ?outcome, "Execution ended");
    Ok(outcome)
}

/// Drains transport signals into session events.
async fn run_signal_pump(
    session: Weak<SessionInner>,
    connection: Arc<Connection>,
    mut signals: mpsc::UnboundedReceiver<TransportSignal>,
) {
    let mut decoder = Utf8Decoder::new();

    while let Some(signal) = signals.recv().await {
        let Some(inner) = session.upgrade() else {
            break;
        };

        match signal {
            TransportSignal::Opened => {
                inner.emit(SessionEvent::Connected);
                if let Err(e) = connection.repl.wake().await {
                    warn!(error = %e, "Wake failed");
                    inner.emit(SessionEvent::TransportError {
                        message: e.to_string(),
                    });
                }
            }

            TransportSignal::Data(bytes) => {
                let text = decoder.decode(&bytes);
                if !text.is_empty() {
                    connection.scratch.lock().push_str(&text);
                    inner.emit(SessionEvent::Output { text });
                }
            }

            TransportSignal::Error(message) => {
                warn!(port = %connection.port, error = %message, "Transport error");
                inner.emit(SessionEvent::TransportError { message });
            }

            TransportSignal::Closed => {
                let text = decoder.finish();
                if !text.is_empty() {
                    connection.scratch.lock().push_str(&text);
                    inner.emit(SessionEvent::Output { text });
                }
                inner.handle_remote_close(&connection);
                break;
            }
        }
    }

    debug!(port = %connection.port, "Signal pump terminated");
}

// ============================================================================
// Tests
// ============================================================================
