/// file: src/ui.rs
/// description: terminal presentation of the live feed, driven by client events
use crate::{
    events::{ClientEvent, EventReceiver},
    formatter::{Colors, OutputFormat, RecordFormatter},
    types::{FeedbackFilters, FeedbackRecord, TriageSummary},
};
use std::sync::Arc;
use tracing::debug;

pub struct UIOptions {
    pub colored: bool,
    pub quiet: bool,
    pub filters: FeedbackFilters,
    /// Stop after this many matching records; 0 watches until interrupted.
    pub max_records: u64,
}

pub struct UIController {
    event_receiver: EventReceiver,
    formatter: RecordFormatter,
    filters: FeedbackFilters,
    colored: bool,
    quiet_mode: bool,
    header_printed: bool,
    max_records: Option<u64>,
    shown: Vec<Arc<FeedbackRecord>>,
}

impl UIController {
    pub fn new(event_receiver: EventReceiver, format: OutputFormat, options: UIOptions) -> Self {
        Self {
            event_receiver,
            formatter: RecordFormatter::new(format, options.colored, options.quiet),
            filters: options.filters,
            colored: options.colored,
            quiet_mode: options.quiet,
            header_printed: false,
            max_records: (options.max_records > 0).then_some(options.max_records),
            shown: Vec::new(),
        }
    }

    /// Consumes events until the client stops, the record limit is reached,
    /// or the channel closes. Returns the summary of the records shown.
    pub async fn run(&mut self) -> TriageSummary {
        while let Some(event) = self.event_receiver.recv().await {
            if !self.handle_event(event) {
                break;
            }
        }

        let summary = TriageSummary::from_records(self.shown.iter().map(|record| &**record));
        self.formatter.print_summary(&summary);
        summary
    }

    pub fn records_shown(&self) -> usize {
        self.shown.len()
    }

    fn handle_event(&mut self, event: ClientEvent) -> bool {
        match event {
            ClientEvent::Connecting { url, connection_id } => {
                debug!("Connection {} opening", connection_id);
                self.print_connection_status("CONNECTING", &url);
            }
            ClientEvent::Connected { connection_id } => {
                self.print_connection_status("CONNECTED", &format!("ID: {}", connection_id));
                if !self.header_printed {
                    self.formatter.print_header();
                    self.header_printed = true;
                }
            }
            ClientEvent::RecordReceived(record) => {
                if !self.filters.matches(&record) {
                    debug!("Record {} filtered out", record.id);
                    return true;
                }
                if !self.header_printed {
                    self.formatter.print_header();
                    self.header_printed = true;
                }
                self.formatter.print_record(&record);
                self.shown.push(record);

                if let Some(max_records) = self.max_records
                    && self.formatter.record_count() >= max_records
                {
                    self.print_connection_status(
                        "STOPPING",
                        &format!("Reached configured max records ({max_records})"),
                    );
                    return false;
                }
            }
            ClientEvent::Reconnecting { attempt, delay_ms } => {
                self.print_reconnect_info(attempt, delay_ms);
            }
            ClientEvent::ReconnectsExhausted { attempts } => {
                self.print_error(
                    "GIVING UP",
                    &format!("No connection after {attempts} reconnect attempts"),
                );
                return false;
            }
            ClientEvent::Disconnected => {
                self.print_connection_status("DISCONNECTED", "Connection closed");
            }
            ClientEvent::Stopping => {
                self.print_connection_status("STOPPING", "Client shutting down");
                return false;
            }
        }

        true
    }

    fn print_connection_status(&self, status: &str, message: &str) {
        if self.quiet_mode {
            return;
        }

        let (color, symbol) = match status {
            "CONNECTING" => (Colors::BRIGHT_YELLOW, "*"),
            "CONNECTED" => (Colors::BRIGHT_GREEN, "+"),
            "DISCONNECTED" => (Colors::BRIGHT_RED, "X"),
            "STOPPING" => (Colors::BRIGHT_MAGENTA, "!"),
            _ => (Colors::WHITE, "-"),
        };

        if self.colored {
            eprintln!(
                "{}{}[{}]{} {} {}",
                Colors::BOLD,
                color,
                status,
                Colors::RESET,
                symbol,
                message
            );
        } else {
            eprintln!("[{}] {} {}", status, symbol, message);
        }
    }

    fn print_error(&self, error_type: &str, message: &str) {
        if self.colored {
            eprintln!(
                "{}{}[{}]{} ! {}{}{}",
                Colors::BOLD,
                Colors::BRIGHT_RED,
                error_type,
                Colors::RESET,
                Colors::RED,
                message,
                Colors::RESET
            );
        } else {
            eprintln!("[{}] ! {}", error_type, message);
        }
    }

    fn print_reconnect_info(&self, attempt: u32, delay_ms: u64) {
        if self.quiet_mode {
            return;
        }
        eprintln!(
            "{}[RECONNECTING]{} > Attempt {} in {:.1}s...",
            if self.colored { Colors::BRIGHT_YELLOW } else { "" },
            if self.colored { Colors::RESET } else { "" },
            attempt,
            delay_ms as f64 / 1000.0
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        events::create_event_channel,
        types::{FeedbackAnalysis, Sentiment, Urgency},
    };

    fn record(id: &str, urgency: Urgency) -> Arc<FeedbackRecord> {
        Arc::new(FeedbackRecord {
            id: id.to_string(),
            customer_name: "Demo User".to_string(),
            email: "demo@example.com".to_string(),
            message: "Checkout keeps failing".to_string(),
            created_at: "2024-03-01T10:15:00Z".to_string(),
            analysis: Some(FeedbackAnalysis {
                sentiment: Sentiment::Negative,
                urgency_level: urgency,
                category: "Bug".to_string(),
                summary: "Checkout failure".to_string(),
                recommended_action: "Escalate".to_string(),
            }),
            analysis_error: None,
            agent_success: Some(true),
            overrides: Vec::new(),
        })
    }

    fn controller(rx: EventReceiver, filters: FeedbackFilters, max_records: u64) -> UIController {
        UIController::new(
            rx,
            OutputFormat::Minimal,
            UIOptions {
                colored: false,
                quiet: true,
                filters,
                max_records,
            },
        )
    }

    #[tokio::test]
    async fn stops_after_max_records() {
        let (tx, rx) = create_event_channel();
        for id in ["a", "b", "c"] {
            tx.send(ClientEvent::RecordReceived(record(id, Urgency::High)))
                .await
                .unwrap();
        }

        let mut ui = controller(rx, FeedbackFilters::default(), 2);
        let summary = ui.run().await;

        assert_eq!(ui.records_shown(), 2);
        assert_eq!(summary.total, 2);
        assert_eq!(summary.high_urgency, 2);
    }

    #[tokio::test]
    async fn filters_records_and_stops_on_shutdown() {
        let (tx, rx) = create_event_channel();
        tx.send(ClientEvent::Connected {
            connection_id: "c-1".to_string(),
        })
        .await
        .unwrap();
        tx.send(ClientEvent::RecordReceived(record("a", Urgency::Low)))
            .await
            .unwrap();
        tx.send(ClientEvent::RecordReceived(record("b", Urgency::High)))
            .await
            .unwrap();
        tx.send(ClientEvent::Stopping).await.unwrap();
        tx.send(ClientEvent::RecordReceived(record("c", Urgency::High)))
            .await
            .unwrap();

        let filters = FeedbackFilters {
            urgency: Some(Urgency::High),
            ..FeedbackFilters::default()
        };
        let mut ui = controller(rx, filters, 0);
        let summary = ui.run().await;

        assert_eq!(ui.records_shown(), 1);
        assert_eq!(summary.total, 1);
    }

    #[tokio::test]
    async fn gives_up_when_reconnects_are_exhausted() {
        let (tx, rx) = create_event_channel();
        tx.send(ClientEvent::ReconnectsExhausted { attempts: 3 })
            .await
            .unwrap();
        drop(tx);

        let mut ui = controller(rx, FeedbackFilters::default(), 0);
        assert_eq!(ui.run().await.total, 0);
    }
}
