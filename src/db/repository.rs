use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, QueryBuilder, Sqlite};
use uuid::Uuid;

use crate::models::{DueItem, Note, Occurrence, OccurrenceFilter, RecurringDefinition};

const DUE_ITEM_COLUMNS: &str =
    "id, owner_id, title, description, completed, due_date, created_at, updated_at";

const DEFINITION_COLUMNS: &str = "id, owner_id, title, description, frequency, frequency_data, \
     start_date, end_date, due_time, active, created_at, updated_at";

const OCCURRENCE_COLUMNS: &str =
    "id, definition_id, owner_id, due_date, completed, completed_at, skipped, created_at, updated_at";

// Notes

pub async fn insert_note<'e, E>(
    db: E,
    owner_id: &str,
    content: &str,
    now: DateTime<Utc>,
) -> Result<Note, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let note = Note {
        id: Uuid::new_v4().to_string(),
        owner_id: owner_id.to_string(),
        content: content.to_string(),
        created_at: now,
    };

    sqlx::query("INSERT INTO notes (id, owner_id, content, created_at) VALUES (?1, ?2, ?3, ?4)")
        .bind(&note.id)
        .bind(&note.owner_id)
        .bind(&note.content)
        .bind(note.created_at)
        .execute(db)
        .await?;

    Ok(note)
}

pub async fn fetch_notes<'e, E>(db: E, owner_id: &str) -> Result<Vec<Note>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Note>(
        "SELECT id, owner_id, content, created_at FROM notes WHERE owner_id = ?1 ORDER BY created_at DESC",
    )
    .bind(owner_id)
    .fetch_all(db)
    .await
}

pub async fn find_note<'e, E>(db: E, owner_id: &str, id: &str) -> Result<Option<Note>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Note>(
        "SELECT id, owner_id, content, created_at FROM notes WHERE id = ?1 AND owner_id = ?2",
    )
    .bind(id)
    .bind(owner_id)
    .fetch_optional(db)
    .await
}

pub async fn update_note<'e, E>(db: E, note: &Note) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE notes SET content = ?1 WHERE id = ?2 AND owner_id = ?3")
        .bind(&note.content)
        .bind(&note.id)
        .bind(&note.owner_id)
        .execute(db)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_note<'e, E>(db: E, owner_id: &str, id: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM notes WHERE id = ?1 AND owner_id = ?2")
        .bind(id)
        .bind(owner_id)
        .execute(db)
        .await?;

    Ok(result.rows_affected() > 0)
}

// Due items

pub async fn insert_due_item<'e, E>(db: E, item: &DueItem) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO due_items
            (id, owner_id, title, description, completed, due_date, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&item.id)
    .bind(&item.owner_id)
    .bind(&item.title)
    .bind(&item.description)
    .bind(item.completed)
    .bind(item.due_date)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(db)
    .await?;

    Ok(())
}

/// Incomplete first, dated before undated, earliest due first, newest first.
pub async fn fetch_due_items<'e, E>(
    db: E,
    owner_id: &str,
    completed: Option<bool>,
) -> Result<Vec<DueItem>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        r#"
        SELECT {DUE_ITEM_COLUMNS}
        FROM due_items
        WHERE owner_id = ?1 AND (?2 IS NULL OR completed = ?2)
        ORDER BY completed ASC, due_date IS NULL, due_date ASC, created_at DESC
        "#
    );

    sqlx::query_as::<_, DueItem>(&sql)
        .bind(owner_id)
        .bind(completed)
        .fetch_all(db)
        .await
}

pub async fn find_due_item<'e, E>(
    db: E,
    owner_id: &str,
    id: &str,
) -> Result<Option<DueItem>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {DUE_ITEM_COLUMNS} FROM due_items WHERE id = ?1 AND owner_id = ?2");

    sqlx::query_as::<_, DueItem>(&sql)
        .bind(id)
        .bind(owner_id)
        .fetch_optional(db)
        .await
}

pub async fn update_due_item<'e, E>(db: E, item: &DueItem) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE due_items
        SET title = ?1,
            description = ?2,
            completed = ?3,
            due_date = ?4,
            updated_at = ?5
        WHERE id = ?6 AND owner_id = ?7
        "#,
    )
    .bind(&item.title)
    .bind(&item.description)
    .bind(item.completed)
    .bind(item.due_date)
    .bind(item.updated_at)
    .bind(&item.id)
    .bind(&item.owner_id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn delete_due_item<'e, E>(db: E, owner_id: &str, id: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM due_items WHERE id = ?1 AND owner_id = ?2")
        .bind(id)
        .bind(owner_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

// Recurring definitions

pub async fn insert_definition<'e, E>(db: E, definition: &RecurringDefinition) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO recurring_definitions
            (id, owner_id, title, description, frequency, frequency_data,
            start_date, end_date, due_time, active, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&definition.id)
    .bind(&definition.owner_id)
    .bind(&definition.title)
    .bind(&definition.description)
    .bind(definition.frequency)
    .bind(&definition.frequency_data)
    .bind(definition.start_date)
    .bind(definition.end_date)
    .bind(definition.due_time)
    .bind(definition.active)
    .bind(definition.created_at)
    .bind(definition.updated_at)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn find_definition<'e, E>(
    db: E,
    owner_id: &str,
    id: &str,
) -> Result<Option<RecurringDefinition>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {DEFINITION_COLUMNS} FROM recurring_definitions WHERE id = ?1 AND owner_id = ?2"
    );

    sqlx::query_as::<_, RecurringDefinition>(&sql)
        .bind(id)
        .bind(owner_id)
        .fetch_optional(db)
        .await
}

pub async fn fetch_definitions<'e, E>(
    db: E,
    owner_id: &str,
    active: Option<bool>,
) -> Result<Vec<RecurringDefinition>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        r#"
        SELECT {DEFINITION_COLUMNS}
        FROM recurring_definitions
        WHERE owner_id = ?1 AND (?2 IS NULL OR active = ?2)
        ORDER BY created_at DESC
        "#
    );

    sqlx::query_as::<_, RecurringDefinition>(&sql)
        .bind(owner_id)
        .bind(active)
        .fetch_all(db)
        .await
}

pub async fn update_definition<'e, E>(db: E, definition: &RecurringDefinition) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE recurring_definitions
        SET title = ?1,
            description = ?2,
            end_date = ?3,
            due_time = ?4,
            active = ?5,
            updated_at = ?6
        WHERE id = ?7 AND owner_id = ?8
        "#,
    )
    .bind(&definition.title)
    .bind(&definition.description)
    .bind(definition.end_date)
    .bind(definition.due_time)
    .bind(definition.active)
    .bind(definition.updated_at)
    .bind(&definition.id)
    .bind(&definition.owner_id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn delete_definition<'e, E>(db: E, owner_id: &str, id: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM recurring_definitions WHERE id = ?1 AND owner_id = ?2")
        .bind(id)
        .bind(owner_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

// Occurrences

pub async fn occurrence_exists<'e, E>(
    db: E,
    definition_id: &str,
    due_date: NaiveDate,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM occurrences WHERE definition_id = ?1 AND due_date = ?2",
    )
    .bind(definition_id)
    .bind(due_date)
    .fetch_optional(db)
    .await?;

    Ok(found.is_some())
}

pub async fn has_occurrence_on_or_after<'e, E>(
    db: E,
    definition_id: &str,
    date: NaiveDate,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM occurrences WHERE definition_id = ?1 AND due_date >= ?2 LIMIT 1",
    )
    .bind(definition_id)
    .bind(date)
    .fetch_optional(db)
    .await?;

    Ok(found.is_some())
}

pub async fn insert_occurrence<'e, E>(db: E, occurrence: &Occurrence) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO occurrences
            (id, definition_id, owner_id, due_date, completed, completed_at,
            skipped, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&occurrence.id)
    .bind(&occurrence.definition_id)
    .bind(&occurrence.owner_id)
    .bind(occurrence.due_date)
    .bind(occurrence.completed)
    .bind(occurrence.completed_at)
    .bind(occurrence.skipped)
    .bind(occurrence.created_at)
    .bind(occurrence.updated_at)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn find_occurrence<'e, E>(
    db: E,
    owner_id: &str,
    id: &str,
) -> Result<Option<Occurrence>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {OCCURRENCE_COLUMNS} FROM occurrences WHERE id = ?1 AND owner_id = ?2");

    sqlx::query_as::<_, Occurrence>(&sql)
        .bind(id)
        .bind(owner_id)
        .fetch_optional(db)
        .await
}

/// Owner's occurrences, latest due date first.
pub async fn fetch_occurrences<'e, E>(
    db: E,
    owner_id: &str,
    filter: &OccurrenceFilter,
) -> Result<Vec<Occurrence>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let mut query = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {OCCURRENCE_COLUMNS} FROM occurrences WHERE owner_id = "
    ));
    query.push_bind(owner_id);

    if let Some(start_date) = filter.start_date {
        query.push(" AND due_date >= ").push_bind(start_date);
    }
    if let Some(end_date) = filter.end_date {
        query.push(" AND due_date <= ").push_bind(end_date);
    }
    if let Some(completed) = filter.completed {
        query.push(" AND completed = ").push_bind(completed);
    }
    query.push(" ORDER BY due_date DESC");

    query.build_query_as::<Occurrence>().fetch_all(db).await
}

pub async fn update_occurrence_status<'e, E>(db: E, occurrence: &Occurrence) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE occurrences
        SET completed = ?1,
            completed_at = ?2,
            skipped = ?3,
            updated_at = ?4
        WHERE id = ?5 AND owner_id = ?6
        "#,
    )
    .bind(occurrence.completed)
    .bind(occurrence.completed_at)
    .bind(occurrence.skipped)
    .bind(occurrence.updated_at)
    .bind(&occurrence.id)
    .bind(&occurrence.owner_id)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result > 0)
}

pub async fn delete_occurrence<'e, E>(db: E, owner_id: &str, id: &str) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM occurrences WHERE id = ?1 AND owner_id = ?2")
        .bind(id)
        .bind(owner_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn delete_occurrences_for_definition<'e, E>(
    db: E,
    definition_id: &str,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM occurrences WHERE definition_id = ?1")
        .bind(definition_id)
        .execute(db)
        .await?;

    Ok(result.rows_affected())
}

/// Deletes occurrences with `due_date > date`.
pub async fn delete_occurrences_after<'e, E>(
    db: E,
    definition_id: &str,
    date: NaiveDate,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM occurrences WHERE definition_id = ?1 AND due_date > ?2")
        .bind(definition_id)
        .bind(date)
        .execute(db)
        .await?;

    Ok(result.rows_affected())
}

/// Deletes occurrences with `due_date >= date`.
pub async fn delete_occurrences_from<'e, E>(
    db: E,
    definition_id: &str,
    date: NaiveDate,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM occurrences WHERE definition_id = ?1 AND due_date >= ?2")
        .bind(definition_id)
        .bind(date)
        .execute(db)
        .await?;

    Ok(result.rows_affected())
}
