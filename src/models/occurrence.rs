use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Occurrence {
    pub id: String,
    pub definition_id: String,
    pub owner_id: String,
    pub due_date: NaiveDate,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub skipped: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Occurrence {
    pub fn pending(definition_id: &str, owner_id: &str, due_date: NaiveDate, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            definition_id: definition_id.to_string(),
            owner_id: owner_id.to_string(),
            due_date,
            completed: false,
            completed_at: None,
            skipped: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a completion toggle. Completing clears `skipped`.
    pub fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        self.completed = completed;
        if completed {
            self.completed_at = Some(now);
            self.skipped = false;
        } else {
            self.completed_at = None;
        }
        self.updated_at = now;
    }

    /// Applies a skip toggle. Skipping clears `completed` and `completed_at`.
    pub fn set_skipped(&mut self, skipped: bool, now: DateTime<Utc>) {
        self.skipped = skipped;
        if skipped {
            self.completed = false;
            self.completed_at = None;
        }
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateOccurrenceRequest {
    pub completed: Option<bool>,
    pub skipped: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OccurrenceFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub completed: Option<bool>,
}
