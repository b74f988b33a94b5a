use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::classifier::{Classification, Classifier};
use crate::db::repository;
use crate::error::AppError;
use crate::models::{DueItem, NewRecurringRequest, Note, RecurringDefinition};
use crate::services::materializer::MaterializeReport;
use crate::services::recurrence_service::RecurrenceService;
use crate::temporal::{normalize, normalize_lenient, normalize_to_local_date, parse_time_of_day};

/// Turns free text into a note, a due item or a recurring definition.
pub struct IntakeService {
    db: SqlitePool,
    classifier: Arc<dyn Classifier>,
    recurrence: RecurrenceService,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum IntakeOutcome {
    Note(Note),
    DueItem(DueItem),
    RecurringItem {
        definition: RecurringDefinition,
        occurrences: MaterializeReport,
    },
}

/// One row of the combined content listing.
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ContentEntry {
    Note(Note),
    DueItem(DueItem),
    RecurringItem(RecurringDefinition),
}

impl ContentEntry {
    fn created_at(&self) -> DateTime<Utc> {
        match self {
            ContentEntry::Note(note) => note.created_at,
            ContentEntry::DueItem(item) => item.created_at,
            ContentEntry::RecurringItem(definition) => definition.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ParsedDate {
    pub original: String,
    pub parsed: Option<DateTime<Utc>>,
    pub valid: bool,
}

#[derive(Debug, Serialize)]
pub struct IntakePreview {
    pub classification: Classification,
    pub parsed_date: Option<ParsedDate>,
}

impl IntakeService {
    pub fn new(db: SqlitePool, classifier: Arc<dyn Classifier>, recurrence: RecurrenceService) -> Self {
        Self {
            db,
            classifier,
            recurrence,
        }
    }

    pub async fn ingest(
        &self,
        owner_id: &str,
        text: &str,
        reference_timezone: &str,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<IntakeOutcome, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::BadRequest("Text content is required".to_string()));
        }

        match self.classify_or_note(text, reference_timezone, now).await {
            Classification::Note { content } => {
                let note = repository::insert_note(&self.db, owner_id, &content, now).await?;
                Ok(IntakeOutcome::Note(note))
            }
            Classification::DueItem {
                title,
                description,
                due_date,
            } => {
                let due_date = due_date
                    .as_deref()
                    .and_then(|raw| normalize_lenient(raw, reference_timezone));
                debug!("due item '{}' normalized due date: {:?}", title, due_date);

                let item = DueItem {
                    id: Uuid::new_v4().to_string(),
                    owner_id: owner_id.to_string(),
                    title,
                    description,
                    completed: false,
                    due_date,
                    created_at: now,
                    updated_at: now,
                };
                repository::insert_due_item(&self.db, &item).await?;
                Ok(IntakeOutcome::DueItem(item))
            }
            Classification::RecurringItem {
                title,
                description,
                frequency,
                start_date,
                due_time,
            } => {
                // Never start in the past.
                let start_date = start_date
                    .as_deref()
                    .and_then(|raw| normalize_to_local_date(raw, reference_timezone))
                    .filter(|date| *date >= today)
                    .unwrap_or(today);
                let due_time = due_time.as_deref().and_then(parse_time_of_day);

                let req = NewRecurringRequest {
                    title,
                    description,
                    frequency,
                    frequency_data: None,
                    start_date: Some(start_date),
                    end_date: None,
                    due_time,
                };
                let (definition, occurrences) = self
                    .recurrence
                    .create_definition(owner_id, req, today, now)
                    .await?;
                Ok(IntakeOutcome::RecurringItem {
                    definition,
                    occurrences,
                })
            }
        }
    }

    /// Notes, due items and active recurring definitions of the owner, newest first.
    pub async fn list_content(&self, owner_id: &str) -> Result<Vec<ContentEntry>, AppError> {
        let notes = repository::fetch_notes(&self.db, owner_id).await?;
        let items = repository::fetch_due_items(&self.db, owner_id, None).await?;
        let definitions = repository::fetch_definitions(&self.db, owner_id, Some(true)).await?;

        let mut entries: Vec<ContentEntry> = notes
            .into_iter()
            .map(ContentEntry::Note)
            .chain(items.into_iter().map(ContentEntry::DueItem))
            .chain(definitions.into_iter().map(ContentEntry::RecurringItem))
            .collect();
        entries.sort_by(|a, b| b.created_at().cmp(&a.created_at()));

        Ok(entries)
    }

    /// Classifies and normalizes without storing anything.
    pub async fn preview(
        &self,
        text: &str,
        reference_timezone: &str,
        now: DateTime<Utc>,
    ) -> Result<IntakePreview, AppError> {
        let classification = self.classify_or_note(text.trim(), reference_timezone, now).await;

        let parsed_date = match &classification {
            Classification::DueItem {
                due_date: Some(raw), ..
            } => {
                let parsed = normalize(raw, reference_timezone).ok().flatten();
                Some(ParsedDate {
                    original: raw.clone(),
                    parsed,
                    valid: parsed.is_some(),
                })
            }
            _ => None,
        };

        Ok(IntakePreview {
            classification,
            parsed_date,
        })
    }

    // A classifier failure never loses the user's text: it becomes a note.
    async fn classify_or_note(&self, text: &str, reference_timezone: &str, now: DateTime<Utc>) -> Classification {
        match self.classifier.classify(text, reference_timezone, now).await {
            Ok(Classification::Note { content }) if content.trim().is_empty() => Classification::Note {
                content: text.to_string(),
            },
            Ok(classification) => {
                info!("classified input as {}", kind(&classification));
                classification
            }
            Err(err) => {
                warn!("classification failed, storing as note: {}", err);
                Classification::Note {
                    content: text.to_string(),
                }
            }
        }
    }
}

fn kind(classification: &Classification) -> &'static str {
    match classification {
        Classification::Note { .. } => "note",
        Classification::DueItem { .. } => "due_item",
        Classification::RecurringItem { .. } => "recurring_item",
    }
}
