use std::sync::Arc;

use sqlx::SqlitePool;

use crate::classifier::Classifier;
use crate::services::{IntakeService, RecurrenceService};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub classifier: Arc<dyn Classifier>,
    pub horizon_days: u32,
}

impl AppState {
    pub fn recurrence(&self) -> RecurrenceService {
        RecurrenceService::new(self.db.clone(), self.horizon_days)
    }

    pub fn intake(&self) -> IntakeService {
        IntakeService::new(self.db.clone(), self.classifier.clone(), self.recurrence())
    }
}
