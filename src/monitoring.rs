use crate::{client_state::FeedStats, error::TriageError};
use anyhow::Result;
use metrics::{Counter, Gauge, counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::{net::SocketAddr, sync::LazyLock};
use tracing::{error, info};

// Global metrics
pub static FRAMES_RECEIVED_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("triage_feed_frames_received_total"));
pub static RECORDS_RECEIVED_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("triage_feed_records_total"));
pub static DECODE_ERROR_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("triage_feed_decode_errors_total"));
pub static RECONNECT_COUNTER: LazyLock<Counter> =
    LazyLock::new(|| counter!("triage_feed_reconnects_total"));
pub static CONNECTED_GAUGE: LazyLock<Gauge> = LazyLock::new(|| gauge!("triage_feed_connected"));

pub async fn setup_metrics(port: u16) -> Result<()> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    let builder = PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label("service", "triage-feed")
        .add_global_label("version", env!("CARGO_PKG_VERSION"));

    match builder.install() {
        Ok(_handle) => {
            info!(
                "Prometheus metrics server started on http://{}/metrics",
                addr
            );

            FRAMES_RECEIVED_COUNTER.absolute(0);
            RECORDS_RECEIVED_COUNTER.absolute(0);
            DECODE_ERROR_COUNTER.absolute(0);
            RECONNECT_COUNTER.absolute(0);
            CONNECTED_GAUGE.set(0.0);

            Ok(())
        }
        Err(e) => {
            error!("Failed to start metrics server: {}", e);
            Err(TriageError::MetricsError(e.to_string()).into())
        }
    }
}

#[derive(Debug)]
pub struct HealthStatus {
    pub is_healthy: bool,
    pub connection_id: Option<String>,
    pub seconds_since_last_message: Option<u64>,
    pub total_frames: u64,
    pub total_records: u64,
    pub decode_errors: u64,
    pub reconnect_count: u64,
    pub uptime: chrono::Duration,
}

impl HealthStatus {
    pub fn from_stats(stats: &FeedStats, uptime: chrono::Duration) -> Self {
        Self {
            is_healthy: stats.state == crate::client_state::ConnectionState::Connected,
            connection_id: stats.connection_id.clone(),
            seconds_since_last_message: stats.last_message_time.map(|t| t.elapsed().as_secs()),
            total_frames: stats.frames_received,
            total_records: stats.records_delivered,
            decode_errors: stats.decode_errors,
            reconnect_count: stats.total_reconnects,
            uptime,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "status": if self.is_healthy { "healthy" } else { "unhealthy" },
            "connection_id": self.connection_id,
            "seconds_since_last_message": self.seconds_since_last_message,
            "total_frames": self.total_frames,
            "total_records": self.total_records,
            "decode_errors": self.decode_errors,
            "reconnect_count": self.reconnect_count,
            "uptime_seconds": self.uptime.num_seconds(),
            "timestamp": chrono::Utc::now()
        })
    }
}
