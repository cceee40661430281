// file: src/tracing_setup.rs
// description: log output for the feed client, kept on stderr so stdout stays free for records

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Filter used when `RUST_LOG` is unset: the crate at `log_level`, its
/// websocket and http dependencies held at `warn`.
pub fn default_filter(log_level: &str) -> String {
    format!("warn,triage_feed={log_level}")
}

pub fn setup_tracing(log_level: &str, json_logs: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(log_level)))
        .unwrap_or_else(|_| EnvFilter::new("warn,triage_feed=info"));

    let fmt_layer = if json_logs {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(false)
            .with_target(true)
            .with_thread_names(true)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_line_number(true)
            .compact()
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses() {
        let filter = default_filter("debug");
        assert_eq!(filter, "warn,triage_feed=debug");
        assert!(EnvFilter::try_new(filter).is_ok());
    }
}
