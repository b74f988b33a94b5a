use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

use crate::recurrence::{Frequency, FrequencyData, RecurrenceRule};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecurringDefinition {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub description: Option<String>,
    pub frequency: Frequency,
    pub frequency_data: Option<Json<FrequencyData>>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecurringDefinition {
    pub fn rule(&self) -> RecurrenceRule {
        RecurrenceRule {
            frequency: self.frequency,
            interval: self
                .frequency_data
                .as_ref()
                .map(|data| data.interval())
                .unwrap_or(1),
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecurringRequest {
    pub title: String,
    pub description: Option<String>,
    pub frequency: Frequency,
    pub frequency_data: Option<FrequencyData>,
    /// Defaults to today in the caller's zone.
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub due_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRecurringRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Absent leaves the end date alone; `null` removes it.
    #[serde(default, deserialize_with = "present")]
    pub end_date: Option<Option<NaiveDate>>,
    pub due_time: Option<NaiveTime>,
}

// A field that is present (even as null) deserializes to `Some`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
