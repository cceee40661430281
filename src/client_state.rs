/// file: src/client_state.rs
/// description: Connection, reconnect timer and subscriber state owned by the live feed client
use crate::{
    events::{ClientEvent, EventSender},
    types::FeedbackRecord,
};
use std::sync::Arc;
use tokio::{sync::mpsc, task::JoinHandle, time::Instant};
use tracing::debug;

/// Callback invoked once per decoded record.
pub type FeedHandler = Arc<dyn Fn(Arc<FeedbackRecord>) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    ReconnectPending,
}

/// The one live transport. Dropping it drops `outbound`, which tells the
/// connection task to close the socket.
#[derive(Debug)]
pub(crate) struct ActiveConnection {
    pub generation: u64,
    pub connection_id: String,
    pub outbound: mpsc::UnboundedSender<String>,
    pub ready: bool,
}

#[derive(Debug)]
pub(crate) struct PendingReconnect {
    pub generation: u64,
    pub task: JoinHandle<()>,
}

/// Read-only snapshot of the client's counters.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedStats {
    pub state: ConnectionState,
    pub connection_id: Option<String>,
    /// Reconnects scheduled since the last successful open.
    pub reconnect_attempts: u32,
    pub total_reconnects: u64,
    pub frames_received: u64,
    pub records_delivered: u64,
    pub decode_errors: u64,
    pub subscribers: usize,
    pub last_message_time: Option<Instant>,
    pub last_disconnection_time: Option<Instant>,
}

pub(crate) struct FeedState {
    pub connection: Option<ActiveConnection>,
    pub reconnect: Option<PendingReconnect>,
    pub handlers: Vec<FeedHandler>,
    pub events: Option<EventSender>,
    next_generation: u64,
    reconnect_attempts: u32,
    total_reconnects: u64,
    frames_received: u64,
    records_delivered: u64,
    decode_errors: u64,
    last_message_time: Option<Instant>,
    last_disconnection_time: Option<Instant>,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            connection: None,
            reconnect: None,
            handlers: Vec::new(),
            events: None,
            next_generation: 0,
            reconnect_attempts: 0,
            total_reconnects: 0,
            frames_received: 0,
            records_delivered: 0,
            decode_errors: 0,
            last_message_time: None,
            last_disconnection_time: None,
        }
    }
}

impl FeedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every connection and every timer gets its own generation so late
    /// callbacks from a replaced one can be recognised and ignored.
    pub fn next_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    pub fn state(&self) -> ConnectionState {
        match (&self.connection, &self.reconnect) {
            (Some(conn), _) if conn.ready => ConnectionState::Connected,
            (Some(_), _) => ConnectionState::Connecting,
            (None, Some(_)) => ConnectionState::ReconnectPending,
            (None, None) => ConnectionState::Disconnected,
        }
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|conn| conn.generation == generation)
    }

    /// Installs a new connection, returning the one it replaces.
    pub fn replace_connection(
        &mut self,
        generation: u64,
        outbound: mpsc::UnboundedSender<String>,
    ) -> (String, Option<ActiveConnection>) {
        let connection_id = uuid::Uuid::new_v4().to_string();
        let replaced = self.connection.replace(ActiveConnection {
            generation,
            connection_id: connection_id.clone(),
            outbound,
            ready: false,
        });
        (connection_id, replaced)
    }

    /// Marks the current connection open and returns its id.
    pub fn mark_open(&mut self) -> Option<String> {
        let conn = self.connection.as_mut()?;
        conn.ready = true;
        self.reconnect_attempts = 0;
        Some(conn.connection_id.clone())
    }

    pub fn clear_connection(&mut self) -> Option<ActiveConnection> {
        let conn = self.connection.take();
        if conn.is_some() {
            self.last_disconnection_time = Some(Instant::now());
        }
        conn
    }

    /// Gives an explicit connect a fresh retry budget.
    pub fn reset_reconnect_attempts(&mut self) {
        self.reconnect_attempts = 0;
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    pub fn increment_reconnect(&mut self) -> u32 {
        self.reconnect_attempts += 1;
        self.total_reconnects += 1;
        self.reconnect_attempts
    }

    pub fn record_message(&mut self) {
        self.last_message_time = Some(Instant::now());
        self.frames_received += 1;
    }

    pub fn record_delivery(&mut self, handlers: usize) {
        self.records_delivered += handlers as u64;
    }

    pub fn record_decode_error(&mut self) {
        self.decode_errors += 1;
    }

    /// Best effort: a full or closed event channel drops the event.
    pub fn emit(&self, event: ClientEvent) {
        if let Some(events) = &self.events
            && let Err(e) = events.try_send(event)
        {
            debug!("Dropping client event: {}", e);
        }
    }

    pub fn snapshot(&self) -> FeedStats {
        FeedStats {
            state: self.state(),
            connection_id: self
                .connection
                .as_ref()
                .map(|conn| conn.connection_id.clone()),
            reconnect_attempts: self.reconnect_attempts,
            total_reconnects: self.total_reconnects,
            frames_received: self.frames_received,
            records_delivered: self.records_delivered,
            decode_errors: self.decode_errors,
            subscribers: self.handlers.len(),
            last_message_time: self.last_message_time,
            last_disconnection_time: self.last_disconnection_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_follows_connection_and_timer() {
        let mut state = FeedState::new();
        assert_eq!(state.state(), ConnectionState::Disconnected);

        let (tx, _rx) = mpsc::unbounded_channel();
        let generation = state.next_generation();
        let (id, replaced) = state.replace_connection(generation, tx);
        assert!(replaced.is_none());
        assert_eq!(state.state(), ConnectionState::Connecting);
        assert!(state.is_current(generation));
        assert!(!state.is_current(generation + 1));

        assert_eq!(state.mark_open(), Some(id));
        assert_eq!(state.state(), ConnectionState::Connected);

        assert!(state.clear_connection().is_some());
        assert_eq!(state.state(), ConnectionState::Disconnected);
        assert!(state.snapshot().last_disconnection_time.is_some());
    }

    #[test]
    fn replacing_returns_previous_connection() {
        let mut state = FeedState::new();
        let (first_tx, _first_rx) = mpsc::unbounded_channel();
        let (second_tx, _second_rx) = mpsc::unbounded_channel();

        let first = state.next_generation();
        state.replace_connection(first, first_tx);
        let second = state.next_generation();
        let (_, replaced) = state.replace_connection(second, second_tx);

        assert_eq!(replaced.map(|conn| conn.generation), Some(first));
        assert!(state.is_current(second));
    }

    #[test]
    fn open_resets_consecutive_reconnects_only() {
        let mut state = FeedState::new();
        state.increment_reconnect();
        state.increment_reconnect();
        assert_eq!(state.reconnect_attempts(), 2);

        let (tx, _rx) = mpsc::unbounded_channel();
        let generation = state.next_generation();
        state.replace_connection(generation, tx);
        state.mark_open();

        let stats = state.snapshot();
        assert_eq!(stats.reconnect_attempts, 0);
        assert_eq!(stats.total_reconnects, 2);
    }

    #[test]
    fn emit_without_channel_is_a_no_op() {
        let state = FeedState::new();
        state.emit(ClientEvent::Disconnected);

        let (tx, mut rx) = crate::events::create_event_channel();
        let state = FeedState {
            events: Some(tx),
            ..FeedState::new()
        };
        state.emit(ClientEvent::Disconnected);
        assert!(matches!(rx.try_recv(), Ok(ClientEvent::Disconnected)));
    }
}
