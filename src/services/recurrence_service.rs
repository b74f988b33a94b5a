use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use sqlx::types::Json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{
    NewRecurringRequest, Occurrence, OccurrenceFilter, RecurringDefinition, UpdateOccurrenceRequest,
    UpdateRecurringRequest,
};
use crate::services::materializer::{MaterializeReport, materialize};

/// Recurring definitions and their occurrences for one owner at a time.
#[derive(Clone)]
pub struct RecurrenceService {
    db: SqlitePool,
    horizon_days: u32,
}

#[derive(Debug, Default, Serialize)]
pub struct RegenerateStats {
    pub definitions: usize,
    pub removed: u64,
    pub created: usize,
}

impl RecurrenceService {
    pub fn new(db: SqlitePool, horizon_days: u32) -> Self {
        Self { db, horizon_days }
    }

    /// Stores a new definition and materializes its first horizon in the same transaction.
    pub async fn create_definition(
        &self,
        owner_id: &str,
        req: NewRecurringRequest,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(RecurringDefinition, MaterializeReport), AppError> {
        let title = req.title.trim();
        if title.is_empty() {
            return Err(AppError::BadRequest("Title is required".to_string()));
        }
        if let Some(data) = &req.frequency_data {
            if data.interval == Some(0) {
                return Err(AppError::BadRequest("interval must be at least 1".to_string()));
            }
        }

        let start_date = req.start_date.unwrap_or(today);
        if let Some(end_date) = req.end_date {
            if end_date < start_date {
                return Err(AppError::BadRequest(
                    "end_date must not be before start_date".to_string(),
                ));
            }
        }

        let definition = RecurringDefinition {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            title: title.to_string(),
            description: req.description,
            frequency: req.frequency,
            frequency_data: req.frequency_data.map(Json),
            start_date,
            end_date: req.end_date,
            due_time: req.due_time,
            active: true,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db.begin().await?;
        repository::insert_definition(&mut *tx, &definition).await?;
        let report = materialize(&mut tx, &definition, today, self.horizon_days, now).await?;
        tx.commit().await?;

        info!(
            "created recurring definition {} ({:?}) with {} occurrences",
            definition.id,
            definition.frequency,
            report.created.len()
        );
        Ok((definition, report))
    }

    pub async fn list_definitions(
        &self,
        owner_id: &str,
        active: Option<bool>,
    ) -> Result<Vec<RecurringDefinition>, AppError> {
        Ok(repository::fetch_definitions(&self.db, owner_id, active).await?)
    }

    pub async fn get_definition(&self, owner_id: &str, id: &str) -> Result<RecurringDefinition, AppError> {
        repository::find_definition(&self.db, owner_id, id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Applies edits. A new `end_date` drops not-yet-past occurrences beyond it, a cleared
    /// one lets the series run open-ended again, and the horizon is topped up either way.
    pub async fn update_definition(
        &self,
        owner_id: &str,
        id: &str,
        req: UpdateRecurringRequest,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<RecurringDefinition, AppError> {
        let mut tx = self.db.begin().await?;
        let mut definition = repository::find_definition(&mut *tx, owner_id, id)
            .await?
            .ok_or(AppError::NotFound)?;

        if let Some(title) = req.title {
            if !title.trim().is_empty() {
                definition.title = title.trim().to_string();
            }
        }
        if let Some(description) = req.description {
            definition.description = Some(description);
        }
        if let Some(due_time) = req.due_time {
            definition.due_time = Some(due_time);
        }
        match req.end_date {
            Some(Some(end_date)) => {
                if end_date < definition.start_date {
                    return Err(AppError::BadRequest(
                        "end_date must not be before start_date".to_string(),
                    ));
                }
                definition.end_date = Some(end_date);

                let yesterday = today.pred_opt().unwrap_or(today);
                let cutoff = end_date.max(yesterday);
                let removed =
                    repository::delete_occurrences_after(&mut *tx, &definition.id, cutoff).await?;
                if removed > 0 {
                    info!("removed {} occurrences past the new end of {}", removed, definition.id);
                }
            }
            Some(None) => definition.end_date = None,
            None => {}
        }
        definition.updated_at = now;

        repository::update_definition(&mut *tx, &definition).await?;
        materialize(&mut tx, &definition, today, self.horizon_days, now).await?;
        tx.commit().await?;

        Ok(definition)
    }

    pub async fn materialize_definition(
        &self,
        owner_id: &str,
        id: &str,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<MaterializeReport, AppError> {
        let mut tx = self.db.begin().await?;
        let definition = repository::find_definition(&mut *tx, owner_id, id)
            .await?
            .ok_or(AppError::NotFound)?;
        let report = materialize(&mut tx, &definition, today, self.horizon_days, now).await?;
        tx.commit().await?;

        Ok(report)
    }

    /// Rebuilds the forward schedule of every active definition: occurrences due today or
    /// later are deleted and materialized again. Earlier history is not touched.
    pub async fn regenerate(
        &self,
        owner_id: &str,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<RegenerateStats, AppError> {
        let mut stats = RegenerateStats::default();

        let mut tx = self.db.begin().await?;
        let definitions = repository::fetch_definitions(&mut *tx, owner_id, Some(true)).await?;

        for definition in &definitions {
            stats.removed += repository::delete_occurrences_from(&mut *tx, &definition.id, today).await?;
        }
        for definition in &definitions {
            let report = materialize(&mut tx, definition, today, self.horizon_days, now).await?;
            stats.created += report.created.len();
        }
        tx.commit().await?;

        stats.definitions = definitions.len();
        info!("regenerated occurrences for owner {}: {:?}", owner_id, stats);
        Ok(stats)
    }

    /// Materializes active definitions that have nothing left on or after `today`.
    pub async fn ensure_upcoming(
        &self,
        owner_id: &str,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<usize, AppError> {
        let mut created = 0;

        let mut tx = self.db.begin().await?;
        let definitions = repository::fetch_definitions(&mut *tx, owner_id, Some(true)).await?;
        for definition in &definitions {
            if repository::has_occurrence_on_or_after(&mut *tx, &definition.id, today).await? {
                continue;
            }
            let report = materialize(&mut tx, definition, today, self.horizon_days, now).await?;
            created += report.created.len();
        }
        tx.commit().await?;

        if created > 0 {
            info!("topped up {} occurrences for owner {}", created, owner_id);
        }
        Ok(created)
    }

    /// "Stop from today": deactivates the definition and drops occurrences after today.
    pub async fn soft_delete(
        &self,
        owner_id: &str,
        id: &str,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<RecurringDefinition, AppError> {
        let mut tx = self.db.begin().await?;
        let mut definition = repository::find_definition(&mut *tx, owner_id, id)
            .await?
            .ok_or(AppError::NotFound)?;

        if !definition.active {
            debug!("definition {} is already stopped", definition.id);
            return Ok(definition);
        }

        definition.active = false;
        // A definition that has not started yet still needs end_date >= start_date.
        definition.end_date = Some(today.max(definition.start_date));
        definition.updated_at = now;

        repository::update_definition(&mut *tx, &definition).await?;
        let removed = repository::delete_occurrences_after(&mut *tx, &definition.id, today).await?;
        tx.commit().await?;

        info!("stopped definition {} ({} future occurrences removed)", definition.id, removed);
        Ok(definition)
    }

    /// Removes the definition together with every occurrence it ever produced.
    pub async fn hard_delete(&self, owner_id: &str, id: &str) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;
        let definition = repository::find_definition(&mut *tx, owner_id, id)
            .await?
            .ok_or(AppError::NotFound)?;

        let removed = repository::delete_occurrences_for_definition(&mut *tx, &definition.id).await?;
        repository::delete_definition(&mut *tx, owner_id, &definition.id).await?;
        tx.commit().await?;

        info!("deleted definition {} and {} occurrences", definition.id, removed);
        Ok(())
    }

    pub async fn list_occurrences(
        &self,
        owner_id: &str,
        filter: &OccurrenceFilter,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<Occurrence>, AppError> {
        self.ensure_upcoming(owner_id, today, now).await?;
        Ok(repository::fetch_occurrences(&self.db, owner_id, filter).await?)
    }

    pub async fn update_occurrence(
        &self,
        owner_id: &str,
        id: &str,
        req: UpdateOccurrenceRequest,
        now: DateTime<Utc>,
    ) -> Result<Occurrence, AppError> {
        let mut tx = self.db.begin().await?;
        let mut occurrence = repository::find_occurrence(&mut *tx, owner_id, id)
            .await?
            .ok_or(AppError::NotFound)?;

        if let Some(completed) = req.completed {
            occurrence.set_completed(completed, now);
        }
        if let Some(skipped) = req.skipped {
            occurrence.set_skipped(skipped, now);
        }

        repository::update_occurrence_status(&mut *tx, &occurrence).await?;
        tx.commit().await?;

        Ok(occurrence)
    }

    pub async fn delete_occurrence(&self, owner_id: &str, id: &str) -> Result<(), AppError> {
        if repository::delete_occurrence(&self.db, owner_id, id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound)
        }
    }

    /// Deletes the occurrence and every later one of its definition, then stops the
    /// definition on that occurrence's date.
    pub async fn delete_occurrence_and_future(
        &self,
        owner_id: &str,
        id: &str,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let mut tx = self.db.begin().await?;
        let occurrence = repository::find_occurrence(&mut *tx, owner_id, id)
            .await?
            .ok_or(AppError::NotFound)?;

        let removed =
            repository::delete_occurrences_from(&mut *tx, &occurrence.definition_id, occurrence.due_date)
                .await?;

        match repository::find_definition(&mut *tx, owner_id, &occurrence.definition_id).await? {
            Some(mut definition) => {
                definition.active = false;
                definition.end_date = Some(occurrence.due_date.max(definition.start_date));
                definition.updated_at = now;
                repository::update_definition(&mut *tx, &definition).await?;
            }
            None => warn!(
                "occurrence {} points at missing definition {}",
                occurrence.id, occurrence.definition_id
            ),
        }
        tx.commit().await?;

        info!(
            "deleted {} occurrences of {} from {}",
            removed, occurrence.definition_id, occurrence.due_date
        );
        Ok(removed)
    }
}
