// file: src/api.rs
// description: one-shot request client for the feedback rest api (no retry, no caching)

use crate::{
    config::ApiConfig,
    error::TriageError,
    types::{CreateFeedbackRequest, FeedbackFilters, FeedbackListResponse, FeedbackRecord},
};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

/// Largest page the backend serves.
pub const MAX_PAGE_SIZE: u32 = 100;

const CREATE_FALLBACK: &str = "Failed to submit feedback";
const LIST_FALLBACK: &str = "Failed to load feedbacks";
const GET_FALLBACK: &str = "Failed to load feedback";

#[derive(Debug, Clone)]
pub struct FeedbackApi {
    client: Client,
    base_url: Url,
}

impl FeedbackApi {
    pub fn new(config: &ApiConfig) -> Result<Self, TriageError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// `POST /api/feedback`. The request is validated before anything is sent.
    pub async fn create(&self, request: &CreateFeedbackRequest) -> Result<FeedbackRecord, TriageError> {
        request.validate()?;
        let url = self.url(&["api", "feedback"])?;
        debug!("Submitting feedback to {}", url);

        let response = self.client.post(url).json(request).send().await?;
        decode(response, CREATE_FALLBACK).await
    }

    /// `GET /api/feedback`, one page. `limit` is clamped to what the backend accepts.
    pub async fn list(
        &self,
        filters: &FeedbackFilters,
        limit: u32,
        skip: u32,
    ) -> Result<FeedbackListResponse, TriageError> {
        let url = self.url(&["api", "feedback"])?;
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        debug!("Listing feedback from {} (limit {}, skip {})", url, limit, skip);

        let response = self
            .client
            .get(url)
            .query(&[("limit", limit), ("skip", skip)])
            .query(&filters.query_pairs())
            .send()
            .await?;
        decode(response, LIST_FALLBACK).await
    }

    /// `GET /api/feedback/{id}`.
    pub async fn get(&self, id: &str) -> Result<FeedbackRecord, TriageError> {
        let url = self.url(&["api", "feedback", id])?;
        debug!("Fetching feedback from {}", url);

        let response = self.client.get(url).send().await?;
        decode(response, GET_FALLBACK).await
    }

    fn url(&self, segments: &[&str]) -> Result<Url, TriageError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                TriageError::InvalidEndpoint(format!("{} cannot be a base url", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

async fn decode<T: DeserializeOwned>(response: Response, fallback: &str) -> Result<T, TriageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = error_detail(&body).unwrap_or_else(|| fallback.to_string());
    warn!("Feedback api request failed ({}): {}", status, detail);
    Err(TriageError::Api {
        status: status.as_u16(),
        detail,
    })
}

/// The backend reports failures as `{"detail": ...}`; validation failures
/// carry a structured detail, which is passed through as JSON text.
fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::Null => None,
        Value::String(detail) if detail.is_empty() => None,
        Value::String(detail) => Some(detail.clone()),
        other => Some(other.to_string()),
    }
}
