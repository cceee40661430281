// file: src/client.rs
// description: live feed client that keeps one websocket to the triage backend and fans records out
// reference: https://docs.rs/tokio/latest/tokio/time/fn.sleep.html

use crate::{
    client_state::{ConnectionState, FeedHandler, FeedState, FeedStats, PendingReconnect},
    config::FeedConfig,
    error::TriageError,
    events::{ClientEvent, EventSender},
    monitoring::{
        CONNECTED_GAUGE, DECODE_ERROR_COUNTER, FRAMES_RECEIVED_COUNTER, RECONNECT_COUNTER,
        RECORDS_RECEIVED_COUNTER,
    },
    transport::{Transport, TransportConnection, WsTransport},
    types::{FeedbackRecord, decode_frame},
};
use futures_util::{SinkExt, StreamExt, future::BoxFuture};
use serde::Serialize;
use std::{
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};
use tokio::{sync::mpsc, time::sleep};
use tracing::{debug, error, info, trace, warn};

/// Handle to the live feed.
///
/// Cloning is cheap and every clone drives the same connection and the same
/// subscriber list, so an application builds one and hands clones to the
/// parts that need live records. Connection and timer tasks only hold weak
/// references: once the last handle is dropped they wind down on their own.
///
/// `connect` spawns onto the ambient Tokio runtime and must be called from
/// within one.
#[derive(Clone)]
pub struct FeedbackFeedClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: FeedConfig,
    transport: Arc<dyn Transport>,
    state: Mutex<FeedState>,
}

/// Registration returned by [`FeedbackFeedClient::subscribe`].
#[must_use = "dropping a Subscription keeps the handler registered; call unsubscribe() to remove it"]
pub struct Subscription {
    inner: Weak<Inner>,
    handler: FeedHandler,
}

impl FeedbackFeedClient {
    pub fn new(config: FeedConfig) -> Self {
        Self::with_transport(config, Arc::new(WsTransport))
    }

    pub fn with_transport(config: FeedConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                state: Mutex::new(FeedState::new()),
            }),
        }
    }

    /// Routes lifecycle events (connecting, reconnecting, ...) to a UI.
    pub fn with_events(self, events: EventSender) -> Self {
        self.inner.lock().events = Some(events);
        self
    }

    pub fn config(&self) -> &FeedConfig {
        &self.inner.config
    }

    /// Starts a connection attempt and returns immediately. The consecutive
    /// failure count behind `max_reconnects` starts over.
    ///
    /// A live connection is replaced. A pending reconnect timer is left alone
    /// here; it is cancelled once the new connection opens.
    pub fn connect(&self) {
        self.inner.lock().reset_reconnect_attempts();
        self.inner.connect();
    }

    /// Cancels any pending reconnect and closes the connection. Nothing
    /// reconnects automatically until the next [`connect`](Self::connect).
    pub fn disconnect(&self) {
        self.inner.disconnect();
    }

    /// Registers `handler` for every record decoded from now on.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(Arc<FeedbackRecord>) + Send + Sync + 'static,
    {
        self.subscribe_handler(Arc::new(handler))
    }

    /// Registers an already shared handler. Registering the same `Arc` twice
    /// delivers twice; unsubscribing either registration removes both.
    pub fn subscribe_handler(&self, handler: FeedHandler) -> Subscription {
        let mut state = self.inner.lock();
        state.handlers.push(Arc::clone(&handler));
        debug!("Live feed subscriber added ({} total)", state.handlers.len());
        Subscription {
            inner: Arc::downgrade(&self.inner),
            handler,
        }
    }

    /// Fire-and-forget JSON text frame. Dropped silently unless a connection
    /// is open.
    pub fn send<T: Serialize + ?Sized>(&self, payload: &T) {
        let state = self.inner.lock();
        match &state.connection {
            Some(conn) if conn.ready => match serde_json::to_string(payload) {
                Ok(text) => {
                    if conn.outbound.send(text).is_err() {
                        debug!("Live feed connection closing; outbound payload dropped");
                    }
                }
                Err(e) => warn!("Dropping unserializable live feed payload: {}", e),
            },
            _ => debug!("Live feed not open; outbound payload dropped"),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state()
    }

    pub fn stats(&self) -> FeedStats {
        self.inner.lock().snapshot()
    }
}

impl fmt::Debug for FeedbackFeedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedbackFeedClient")
            .field("config", &self.inner.config)
            .field("state", &self.state())
            .finish()
    }
}

impl Subscription {
    /// Removes every registration of this subscription's handler.
    pub fn unsubscribe(self) {
        if let Some(inner) = self.inner.upgrade() {
            let mut state = inner.lock();
            state.handlers.retain(|h| !Arc::ptr_eq(h, &self.handler));
            debug!("Live feed subscriber removed ({} left)", state.handlers.len());
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn connect(self: &Arc<Self>) {
        let endpoint = match self.config.endpoint() {
            Ok(endpoint) => endpoint,
            Err(e) => {
                error!("Error creating live feed connection: {}", e);
                self.schedule_reconnect();
                return;
            }
        };

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let generation = {
            let mut state = self.lock();
            let generation = state.next_generation();
            let (connection_id, replaced) = state.replace_connection(generation, outbound_tx);
            if let Some(old) = replaced {
                debug!("Replacing live feed connection {}", old.connection_id);
            }
            state.emit(ClientEvent::Connecting {
                url: endpoint.to_string(),
                connection_id,
            });
            generation
        };

        info!("Connecting live feed to {}", endpoint);
        let open = self.transport.open(endpoint);
        tokio::spawn(run_connection(
            Arc::downgrade(self),
            generation,
            open,
            outbound_rx,
        ));
    }

    fn disconnect(&self) {
        let mut state = self.lock();
        let pending = state.reconnect.take();
        let connection = state.clear_connection();

        if let Some(pending) = &pending {
            pending.task.abort();
        }
        if pending.is_none() && connection.is_none() {
            return;
        }

        // dropping the handle closes its outbound channel, which closes the socket
        drop(connection);
        CONNECTED_GAUGE.set(0.0);
        info!("Live feed disconnected");
        state.emit(ClientEvent::Disconnected);
    }

    /// Returns false when `generation` was replaced or disconnected while the
    /// transport was opening.
    fn handle_open(&self, generation: u64) -> bool {
        let mut state = self.lock();
        if !state.is_current(generation) {
            return false;
        }

        if let Some(pending) = state.reconnect.take() {
            pending.task.abort();
        }
        if let Some(connection_id) = state.mark_open() {
            info!("Live feed connected (connection {})", connection_id);
            state.emit(ClientEvent::Connected { connection_id });
        }
        CONNECTED_GAUGE.set(1.0);
        true
    }

    fn handle_message(&self, generation: u64, text: &str) {
        {
            let mut state = self.lock();
            if !state.is_current(generation) {
                return;
            }
            state.record_message();
        }
        FRAMES_RECEIVED_COUNTER.increment(1);

        let record = match decode_frame(text) {
            Ok(Some(record)) => Arc::new(record),
            Ok(None) => {
                trace!("Ignoring live feed frame: {}", preview(text));
                return;
            }
            Err(e) => {
                self.lock().record_decode_error();
                DECODE_ERROR_COUNTER.increment(1);
                error!(
                    "Error parsing live feed message: {}. Message: {}",
                    e,
                    preview(text)
                );
                return;
            }
        };

        // taken after decoding so an unsubscribe that already returned is honored
        let handlers = self.lock().handlers.clone();
        debug!(
            "Delivering feedback {} to {} subscribers",
            record.id,
            handlers.len()
        );
        RECORDS_RECEIVED_COUNTER.increment(1);

        let mut delivered = 0;
        for handler in &handlers {
            let delivery = Arc::clone(&record);
            match catch_unwind(AssertUnwindSafe(|| handler(delivery))) {
                Ok(()) => delivered += 1,
                Err(_) => error!("Live feed subscriber panicked on feedback {}", record.id),
            }
        }
        self.lock().record_delivery(delivered);
    }

    fn handle_close(self: &Arc<Self>, generation: u64) {
        {
            let mut state = self.lock();
            if !state.is_current(generation) {
                debug!("Ignoring close of a replaced live feed connection");
                return;
            }
            state.clear_connection();
            state.emit(ClientEvent::Disconnected);
        }
        CONNECTED_GAUGE.set(0.0);
        warn!("Live feed connection closed");
        self.schedule_reconnect();
    }

    /// At most one reconnect is ever pending; a second call is a no-op.
    fn schedule_reconnect(self: &Arc<Self>) {
        let mut state = self.lock();
        if state.reconnect.is_some() {
            debug!("Live feed reconnect already pending");
            return;
        }

        let max_reconnects = self.config.max_reconnects;
        if max_reconnects > 0 && state.reconnect_attempts() >= max_reconnects {
            error!(
                "Maximum live feed reconnection attempts ({}) reached",
                max_reconnects
            );
            state.emit(ClientEvent::ReconnectsExhausted {
                attempts: state.reconnect_attempts(),
            });
            return;
        }

        let attempt = state.increment_reconnect();
        let generation = state.next_generation();
        let delay = self.config.reconnect_delay;
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        let weak = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.fire_reconnect(generation);
            }
        });
        state.reconnect = Some(PendingReconnect { generation, task });

        RECONNECT_COUNTER.increment(1);
        warn!(
            "Reconnecting live feed in {} ms (attempt {})",
            delay_ms, attempt
        );
        state.emit(ClientEvent::Reconnecting { attempt, delay_ms });
    }

    fn fire_reconnect(self: &Arc<Self>, generation: u64) {
        {
            let mut state = self.lock();
            match &state.reconnect {
                Some(pending) if pending.generation == generation => state.reconnect = None,
                // cancelled after the timer had already fired
                _ => return,
            }
        }
        info!("Attempting to reconnect live feed...");
        self.connect();
    }
}

/// Owns one transport from open to close.
async fn run_connection(
    inner: Weak<Inner>,
    generation: u64,
    open: BoxFuture<'static, Result<TransportConnection, TriageError>>,
    mut outbound: mpsc::UnboundedReceiver<String>,
) {
    let TransportConnection {
        mut sink,
        mut stream,
    } = match open.await {
        Ok(connection) => connection,
        Err(e) => {
            error!("Live feed transport error: {}", e);
            if let Some(inner) = inner.upgrade() {
                inner.handle_close(generation);
            }
            return;
        }
    };

    match inner.upgrade() {
        Some(client) if client.handle_open(generation) => {}
        _ => {
            let _ = sink.close().await;
            return;
        }
    }

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(text)) => match inner.upgrade() {
                    Some(client) => client.handle_message(generation, &text),
                    None => break,
                },
                Some(Err(e)) => {
                    // the close that follows an error is what reconnects
                    error!("Live feed transport error: {}", e);
                    break;
                }
                None => break,
            },
            payload = outbound.recv() => match payload {
                Some(text) => {
                    if let Err(e) = sink.send(text).await {
                        warn!("Failed to send on live feed: {}", e);
                    }
                }
                None => {
                    // handle dropped by disconnect() or a newer connect()
                    debug!("Closing live feed connection");
                    let _ = sink.close().await;
                    return;
                }
            },
        }
    }

    let _ = sink.close().await;
    if let Some(inner) = inner.upgrade() {
        inner.handle_close(generation);
    }
}

fn preview(text: &str) -> String {
    text.chars().take(100).collect()
}
