/// file: src/events.rs
/// description: Event system to decouple the live feed client from UI presentation
use crate::types::FeedbackRecord;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum ClientEvent {
    Connecting { url: String, connection_id: String },
    Connected { connection_id: String },
    RecordReceived(Arc<FeedbackRecord>),
    Reconnecting { attempt: u32, delay_ms: u64 },
    ReconnectsExhausted { attempts: u32 },
    Disconnected,
    Stopping,
}

// Bounded so a stalled UI cannot grow memory; the client drops events when full.
const EVENT_CHANNEL_CAPACITY: usize = 1_000;

pub type EventSender = mpsc::Sender<ClientEvent>;
pub type EventReceiver = mpsc::Receiver<ClientEvent>;

pub fn create_event_channel() -> (EventSender, EventReceiver) {
    mpsc::channel(EVENT_CHANNEL_CAPACITY)
}
