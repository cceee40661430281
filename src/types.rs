/// file: src/types.rs
/// description: feedback records, live feed frames and request/response types for the triage api
use crate::error::TriageError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::BTreeSet, fmt, str::FromStr};

/// Frame tag the server uses when it broadcasts a newly created record.
pub const NEW_FEEDBACK_EVENT: &str = "feedbacks:new";

/// Upper bound the submission form places on a feedback message.
pub const MAX_MESSAGE_CHARS: usize = 8000;
pub const MAX_CUSTOMER_NAME_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "positive" => Ok(Sentiment::Positive),
            "neutral" => Ok(Sentiment::Neutral),
            "negative" => Ok(Sentiment::Negative),
            other => Err(format!(
                "unknown sentiment '{other}' (expected positive, neutral or negative)"
            )),
        }
    }
}

impl FromStr for Urgency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Urgency::Low),
            "medium" => Ok(Urgency::Medium),
            "high" => Ok(Urgency::High),
            other => Err(format!(
                "unknown urgency '{other}' (expected low, medium or high)"
            )),
        }
    }
}

/// AI triage result attached to a record once analysis succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackAnalysis {
    pub sentiment: Sentiment,
    pub urgency_level: Urgency,
    pub category: String,
    pub summary: String,
    pub recommended_action: String,
}

/// Human correction of one analysis field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRecord {
    pub field: String,
    #[serde(default)]
    pub old_value: Option<String>,
    pub new_value: String,
    pub reason: String,
    pub overridden_by: String,
    pub overridden_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: String,
    pub customer_name: String,
    pub email: String,
    pub message: String,
    pub created_at: String,
    #[serde(default)]
    pub analysis: Option<FeedbackAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_success: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overrides: Vec<OverrideRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackStatus {
    Analyzed,
    Failed,
    Pending,
}

impl FeedbackRecord {
    /// Analyzed when an analysis is attached, failed when only an error is,
    /// pending when neither is present yet.
    pub fn status(&self) -> FeedbackStatus {
        match (&self.analysis, &self.analysis_error) {
            (Some(_), _) => FeedbackStatus::Analyzed,
            (None, Some(_)) => FeedbackStatus::Failed,
            (None, None) => FeedbackStatus::Pending,
        }
    }

    /// Creation time as UTC. Timestamps without an offset are read as UTC.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(&self.created_at) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&self.created_at, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn sentiment(&self) -> Option<Sentiment> {
        self.analysis.as_ref().map(|a| a.sentiment)
    }

    pub fn urgency(&self) -> Option<Urgency> {
        self.analysis.as_ref().map(|a| a.urgency_level)
    }

    pub fn category(&self) -> Option<&str> {
        self.analysis.as_ref().map(|a| a.category.as_str())
    }
}

/// Decodes one live feed text frame.
///
/// Returns `Ok(None)` for frames that are valid JSON but not a new-record
/// broadcast (other tags, missing or falsy `data`). Returns an error for
/// frames that are not JSON at all, or whose `feedbacks:new` payload is not a
/// record.
pub fn decode_frame(text: &str) -> Result<Option<FeedbackRecord>, TriageError> {
    let frame: Value = serde_json::from_str(text)?;

    if frame.get("type").and_then(Value::as_str) != Some(NEW_FEEDBACK_EVENT) {
        return Ok(None);
    }

    match frame.get("data") {
        Some(data) if is_truthy(data) => serde_json::from_value(data.clone())
            .map(Some)
            .map_err(|e| TriageError::InvalidMessage(format!("bad {NEW_FEEDBACK_EVENT} payload: {e}"))),
        _ => Ok(None),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Body of `POST /api/feedback`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateFeedbackRequest {
    pub customer_name: String,
    pub email: String,
    pub message: String,
}

impl CreateFeedbackRequest {
    pub fn new(
        customer_name: impl Into<String>,
        email: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            customer_name: customer_name.into(),
            email: email.into(),
            message: message.into(),
        }
    }

    /// Applies the same bounds the backend enforces, so obviously bad input
    /// never leaves the process.
    pub fn validate(&self) -> Result<(), TriageError> {
        let name_len = self.customer_name.chars().count();
        if name_len == 0 || name_len > MAX_CUSTOMER_NAME_CHARS {
            return Err(TriageError::InvalidRequest(format!(
                "customer_name must be 1-{MAX_CUSTOMER_NAME_CHARS} characters"
            )));
        }

        if !looks_like_email(&self.email) {
            return Err(TriageError::InvalidRequest(format!(
                "'{}' is not a valid email address",
                self.email
            )));
        }

        let message_len = self.message.chars().count();
        if message_len == 0 || message_len > MAX_MESSAGE_CHARS {
            return Err(TriageError::InvalidRequest(format!(
                "message must be 1-{MAX_MESSAGE_CHARS} characters"
            )));
        }

        Ok(())
    }
}

fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Body of `GET /api/feedback`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackListResponse {
    pub feedbacks: Vec<FeedbackRecord>,
    pub total: u64,
}

/// List filters, shared by the REST query and live record filtering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedbackFilters {
    pub urgency: Option<Urgency>,
    pub category: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub unresolved_only: bool,
}

impl FeedbackFilters {
    pub fn is_empty(&self) -> bool {
        self.urgency.is_none()
            && self.category.is_none()
            && self.sentiment.is_none()
            && !self.unresolved_only
    }

    /// Query parameters for the filters that are set, in a stable order.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(urgency) = self.urgency {
            pairs.push(("urgency", urgency.to_string()));
        }
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        if let Some(sentiment) = self.sentiment {
            pairs.push(("sentiment", sentiment.to_string()));
        }
        if self.unresolved_only {
            pairs.push(("unresolved_only", "true".to_string()));
        }
        pairs
    }

    /// Mirrors the backend query: urgency and sentiment must equal the
    /// filter, category matches as a case-insensitive substring, and
    /// `unresolved_only` keeps records that already carry an analysis.
    pub fn matches(&self, record: &FeedbackRecord) -> bool {
        if self.unresolved_only && record.analysis.is_none() {
            return false;
        }
        if let Some(urgency) = self.urgency
            && record.urgency() != Some(urgency)
        {
            return false;
        }
        if let Some(sentiment) = self.sentiment
            && record.sentiment() != Some(sentiment)
        {
            return false;
        }
        if let Some(category) = &self.category
            && !record
                .category()
                .is_some_and(|c| c.to_lowercase().contains(&category.to_lowercase()))
        {
            return false;
        }
        true
    }
}

/// Headline numbers shown above a record listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriageSummary {
    pub total: usize,
    pub high_urgency: usize,
    pub negative_percentage: f64,
    pub categories: Vec<String>,
}

impl TriageSummary {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a FeedbackRecord>,
    {
        let mut total = 0;
        let mut high_urgency = 0;
        let mut negative = 0;
        let mut categories = BTreeSet::new();

        for record in records {
            total += 1;
            if record.urgency() == Some(Urgency::High) {
                high_urgency += 1;
            }
            if record.sentiment() == Some(Sentiment::Negative) {
                negative += 1;
            }
            if let Some(category) = record.category()
                && !category.is_empty()
            {
                categories.insert(category.to_string());
            }
        }

        let negative_percentage = if total > 0 {
            (negative as f64 / total as f64 * 1000.0).round() / 10.0
        } else {
            0.0
        };

        Self {
            total,
            high_urgency,
            negative_percentage,
            categories: categories.into_iter().collect(),
        }
    }
}
