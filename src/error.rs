use thiserror::Error;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("WebSocket connection error: {0}")]
    WebSocketError(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// For `Transport` implementations whose peer went away mid-operation.
    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),

    #[error("Invalid feedback request: {0}")]
    InvalidRequest(String),

    #[error("API error ({status}): {detail}")]
    Api { status: u16, detail: String },

    #[error("Metrics server error: {0}")]
    MetricsError(String),
}
