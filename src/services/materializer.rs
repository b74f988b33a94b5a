use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::db::repository;
use crate::error::AppError;
use crate::models::{Occurrence, RecurringDefinition};
use crate::recurrence::occurrence_dates;

#[derive(Debug, Default, Serialize)]
pub struct MaterializeReport {
    pub created: Vec<Occurrence>,
    pub skipped_existing: usize,
}

/// Inserts the occurrences of `definition` that are missing between `today` and the horizon.
///
/// Run it inside the caller's transaction: either the whole horizon lands or nothing does.
/// Existing rows (completed or skipped ones included) are left alone, so calling it again
/// with the same `today` creates nothing. Inactive definitions produce an empty report.
pub async fn materialize(
    conn: &mut SqliteConnection,
    definition: &RecurringDefinition,
    today: NaiveDate,
    horizon_days: u32,
    now: DateTime<Utc>,
) -> Result<MaterializeReport, AppError> {
    let mut report = MaterializeReport::default();
    if !definition.active {
        debug!("definition {} is inactive, nothing to materialize", definition.id);
        return Ok(report);
    }

    for due_date in occurrence_dates(&definition.rule(), today, horizon_days) {
        if repository::occurrence_exists(&mut *conn, &definition.id, due_date).await? {
            report.skipped_existing += 1;
            continue;
        }

        let occurrence = Occurrence::pending(&definition.id, &definition.owner_id, due_date, now);
        repository::insert_occurrence(&mut *conn, &occurrence).await?;
        report.created.push(occurrence);
    }

    debug!(
        "materialized definition {}: {} created, {} already present",
        definition.id,
        report.created.len(),
        report.skipped_existing
    );
    Ok(report)
}
