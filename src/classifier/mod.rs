pub mod dto;

use std::env;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppError;
use crate::recurrence::Frequency;
use crate::temporal::resolve_timezone;

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// What the classifier made of a piece of free text. Date fields are raw strings; they
/// still have to go through the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Classification {
    #[serde(alias = "thought")]
    Note { content: String },

    #[serde(alias = "todo")]
    DueItem {
        title: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        due_date: Option<String>,
    },

    #[serde(alias = "habit")]
    RecurringItem {
        title: String,
        #[serde(default)]
        description: Option<String>,
        frequency: Frequency,
        #[serde(default)]
        start_date: Option<String>,
        #[serde(default)]
        due_time: Option<String>,
    },
}

#[derive(Clone, Debug)]
pub struct ClassifierConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
}

impl ClassifierConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let api_key = env::var("CLASSIFIER_API_KEY")
            .map_err(|_| AppError::Config("CLASSIFIER_API_KEY is not set".to_string()))?;
        let model = env::var("CLASSIFIER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let endpoint =
            env::var("CLASSIFIER_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());

        Ok(Self {
            api_key,
            model,
            endpoint,
        })
    }
}

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Relative phrases ("tomorrow", "next week") are resolved against `now` as seen in
    /// `reference_timezone`.
    async fn classify(
        &self,
        text: &str,
        reference_timezone: &str,
        now: DateTime<Utc>,
    ) -> Result<Classification, AppError>;
}

/// Treats every input as a note. Used when no classifier is configured.
pub struct NoopClassifier;

#[async_trait]
impl Classifier for NoopClassifier {
    async fn classify(
        &self,
        text: &str,
        _reference_timezone: &str,
        _now: DateTime<Utc>,
    ) -> Result<Classification, AppError> {
        Ok(Classification::Note {
            content: text.to_string(),
        })
    }
}

pub struct HttpClassifier {
    client: Client,
    config: ClassifierConfig,
}

impl HttpClassifier {
    pub fn new(config: ClassifierConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(
        &self,
        text: &str,
        reference_timezone: &str,
        now: DateTime<Utc>,
    ) -> Result<Classification, AppError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        );

        let request_body = dto::GenerateContentRequest {
            contents: vec![dto::Content {
                parts: vec![dto::Part {
                    text: build_prompt(text, reference_timezone, now),
                }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| AppError::Classifier(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Classifier(format!("API error {}: {}", status, body)));
        }

        let parsed: dto::GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::Classifier(format!("unreadable response: {}", e)))?;

        let reply = parsed
            .first_text()
            .ok_or_else(|| AppError::Classifier("empty response".to_string()))?;
        debug!("classifier reply: {}", reply);

        parse_classification(reply)
    }
}

/// Parses the model's JSON reply, tolerating a surrounding markdown code fence.
pub fn parse_classification(reply: &str) -> Result<Classification, AppError> {
    let mut body = reply.trim();
    if let Some(rest) = body.strip_prefix("```json") {
        body = rest;
    } else if let Some(rest) = body.strip_prefix("```") {
        body = rest;
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }

    serde_json::from_str(body.trim())
        .map_err(|e| AppError::Classifier(format!("unparseable classification: {}", e)))
}

fn build_prompt(text: &str, reference_timezone: &str, now: DateTime<Utc>) -> String {
    let local_now = now.with_timezone(&resolve_timezone(reference_timezone));
    let today = local_now.format("%Y-%m-%d");
    let time = local_now.format("%H:%M:%S");
    let tomorrow = (local_now + TimeDelta::days(1)).format("%Y-%m-%d");
    let next_week = (local_now + TimeDelta::days(7)).format("%Y-%m-%d");

    format!(
        r#"Classify the following text as a note, a due item, or a recurring item.

For a NOTE respond with:
{{"type": "note", "content": "[original text]"}}

For a DUE ITEM (a one-off task) respond with:
{{"type": "due_item", "title": "[concise title]", "description": "[short description]", "due_date": "[date or null]"}}

For a RECURRING ITEM (something done every day, week or month) respond with:
{{"type": "recurring_item", "title": "[concise title]", "description": "[short description]", "frequency": "daily|weekly|monthly", "start_date": "[YYYY-MM-DD or null]", "due_time": "[HH:MM or null]"}}

Date rules:
- Today is {today} and the local time is {time} ({reference_timezone}).
- A date with a time uses "YYYY-MM-DDThh:mm:ss"; a date alone uses "YYYY-MM-DD".
- Do not add a timezone offset; times are local.
- "tomorrow" is {tomorrow}; "next week" is {next_week}.
- Use null when no date is mentioned. Never invent dates.

Text: {text}

Respond ONLY with the JSON object."#
    )
}
