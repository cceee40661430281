/// file: src/config.rs
/// description: runtime configuration for the live feed, the rest api and terminal output
use crate::{cli::Args, error::TriageError, formatter::OutputFormat};
use anyhow::Result;
use std::time::Duration;
use url::Url;

/// Path of the push endpoint, appended to the configured base address.
pub const FEED_PATH: &str = "/ws/feedbacks";
pub const DEFAULT_WS_BASE: &str = "ws://localhost:8000";
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone)]
pub struct Config {
    pub feed: FeedConfig,
    pub api: ApiConfig,
    pub metrics: MetricsConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Kept as text; the endpoint is built on every connection attempt.
    pub base_url: String,
    pub reconnect_delay: Duration,
    /// 0 retries forever.
    pub max_reconnects: u32,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub colored: bool,
    pub quiet: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WS_BASE.to_string(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_reconnects: 0,
        }
    }
}

impl FeedConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Full push endpoint URL: the base address with [`FEED_PATH`] appended.
    pub fn endpoint(&self) -> Result<Url, TriageError> {
        let url = Url::parse(&format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            FEED_PATH
        ))?;

        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(TriageError::InvalidEndpoint(format!(
                "unsupported scheme '{other}' in {url}"
            ))),
        }
    }
}

impl Config {
    pub fn from_args(args: &Args) -> Result<Self> {
        let feed = FeedConfig {
            base_url: args.ws_url.clone(),
            reconnect_delay: Duration::from_millis(args.reconnect_delay_ms),
            max_reconnects: args.max_reconnects,
        };
        // Fail fast on a bad address instead of retrying it forever.
        feed.endpoint()?;

        Ok(Config {
            feed,
            api: ApiConfig {
                base_url: Url::parse(&args.api_url)?,
                timeout: Duration::from_secs(args.timeout),
            },
            metrics: MetricsConfig {
                enabled: args.metrics,
                port: args.metrics_port,
            },
            output: OutputConfig {
                format: OutputFormat::from(args.format.as_str()),
                colored: !args.no_color,
                quiet: args.quiet,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn default_endpoint_points_at_local_backend() {
        let endpoint = FeedConfig::default().endpoint().unwrap();
        assert_eq!(endpoint.as_str(), "ws://localhost:8000/ws/feedbacks");
    }

    #[test]
    fn endpoint_keeps_base_path_and_drops_trailing_slash() {
        let endpoint = FeedConfig::new("wss://triage.example.com/live/").endpoint().unwrap();
        assert_eq!(endpoint.as_str(), "wss://triage.example.com/live/ws/feedbacks");
    }

    #[test]
    fn endpoint_rejects_garbage_and_http() {
        assert!(matches!(
            FeedConfig::new("not a url").endpoint(),
            Err(TriageError::UrlError(_))
        ));
        assert!(matches!(
            FeedConfig::new("http://localhost:8000").endpoint(),
            Err(TriageError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn from_args_builds_typed_sections() {
        let args = Args::try_parse_from([
            "triage-feed",
            "--reconnect-delay-ms",
            "1500",
            "--max-reconnects",
            "4",
            "--format",
            "json",
            "--no-color",
            "get",
            "42",
        ])
        .unwrap();
        let config = Config::from_args(&args).unwrap();

        assert_eq!(config.feed.reconnect_delay, Duration::from_millis(1500));
        assert_eq!(config.feed.max_reconnects, 4);
        assert_eq!(config.api.base_url.as_str(), "http://localhost:8000/");
        assert!(matches!(config.output.format, OutputFormat::Json));
        assert!(!config.output.colored);
    }

    #[test]
    fn from_args_rejects_bad_ws_url() {
        let args = Args::try_parse_from(["triage-feed", "--ws-url", "ftp://x", "watch"]).unwrap();
        assert!(Config::from_args(&args).is_err());
    }
}
