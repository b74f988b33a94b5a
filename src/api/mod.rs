pub mod extract;

use axum::Json;
use axum::extract::{Path, Query};
use axum::routing::{patch, post};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::repository;
use crate::error::AppError;
use crate::models::*;
use crate::services::{ContentEntry, IntakeOutcome, IntakePreview, MaterializeReport, RegenerateStats};
use crate::state::AppState;
use crate::temporal::{normalize, normalize_lenient};

pub use extract::{Owner, RequestZone};

#[derive(Deserialize)]
struct ContentRequest {
    text: String,
}

#[derive(Deserialize)]
struct DueItemQueryParams {
    completed: Option<bool>,
}

#[derive(Deserialize)]
struct DefinitionQueryParams {
    active: Option<bool>,
}

#[derive(Deserialize)]
struct DeleteParams {
    #[serde(default)]
    delete_all_future: bool,
}

#[derive(Serialize)]
struct CreatedDefinition {
    definition: RecurringDefinition,
    occurrences: MaterializeReport,
}

#[derive(Serialize)]
struct DeletedOccurrences {
    removed: u64,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/content", get(list_content).post(create_content))
        .route("/content/preview", post(preview_content))
        .route("/notes", get(list_notes))
        .route(
            "/notes/{id}",
            get(get_note).patch(update_note).delete(delete_note),
        )
        .route("/todos", get(list_due_items).post(create_due_item))
        .route(
            "/todos/{id}",
            get(get_due_item).patch(update_due_item).delete(delete_due_item),
        )
        .route("/recurring", get(list_definitions).post(create_definition))
        .route("/recurring/regenerate", post(regenerate))
        .route("/recurring/occurrences", get(list_occurrences))
        .route(
            "/recurring/occurrences/{id}",
            patch(update_occurrence).delete(delete_occurrence),
        )
        .route(
            "/recurring/{id}",
            get(get_definition)
                .patch(update_definition)
                .delete(delete_definition),
        )
        .route("/recurring/{id}/materialize", post(materialize_definition))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn create_content(
    State(state): State<AppState>,
    Owner(owner): Owner,
    zone: RequestZone,
    Json(req): Json<ContentRequest>,
) -> Result<(StatusCode, Json<IntakeOutcome>), AppError> {
    let now = Utc::now();
    let outcome = state
        .intake()
        .ingest(&owner, &req.text, &zone.name, zone.today(now), now)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

async fn list_content(
    State(state): State<AppState>,
    Owner(owner): Owner,
) -> Result<Json<Vec<ContentEntry>>, AppError> {
    let entries = state.intake().list_content(&owner).await?;
    Ok(Json(entries))
}

async fn preview_content(
    State(state): State<AppState>,
    zone: RequestZone,
    Json(req): Json<ContentRequest>,
) -> Result<Json<IntakePreview>, AppError> {
    let preview = state.intake().preview(&req.text, &zone.name, Utc::now()).await?;
    Ok(Json(preview))
}

async fn list_notes(
    State(state): State<AppState>,
    Owner(owner): Owner,
) -> Result<Json<Vec<Note>>, AppError> {
    let notes = repository::fetch_notes(&state.db, &owner).await?;
    Ok(Json(notes))
}

async fn get_note(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<Note>, AppError> {
    let note = repository::find_note(&state.db, &owner, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(note))
}

async fn update_note(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    Json(req): Json<UpdateNoteRequest>,
) -> Result<Json<Note>, AppError> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest("Content is required".to_string()));
    }

    let mut note = repository::find_note(&state.db, &owner, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    note.content = content.to_string();

    if !repository::update_note(&state.db, &note).await? {
        return Err(AppError::NotFound);
    }
    Ok(Json(note))
}

async fn delete_note(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if repository::delete_note(&state.db, &owner, &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn list_due_items(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Query(params): Query<DueItemQueryParams>,
) -> Result<Json<Vec<DueItem>>, AppError> {
    let items = repository::fetch_due_items(&state.db, &owner, params.completed).await?;
    Ok(Json(items))
}

async fn create_due_item(
    State(state): State<AppState>,
    Owner(owner): Owner,
    zone: RequestZone,
    Json(req): Json<NewDueItemRequest>,
) -> Result<(StatusCode, Json<DueItem>), AppError> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("Title is required".to_string()));
    }

    let now = Utc::now();
    let item = DueItem {
        id: Uuid::new_v4().to_string(),
        owner_id: owner,
        title: title.to_string(),
        description: req.description,
        completed: false,
        due_date: req
            .due_date
            .as_deref()
            .and_then(|raw| normalize_lenient(raw, &zone.name)),
        created_at: now,
        updated_at: now,
    };
    repository::insert_due_item(&state.db, &item).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn get_due_item(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<DueItem>, AppError> {
    let item = repository::find_due_item(&state.db, &owner, &id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(item))
}

async fn update_due_item(
    State(state): State<AppState>,
    Owner(owner): Owner,
    zone: RequestZone,
    Path(id): Path<String>,
    Json(req): Json<UpdateDueItemRequest>,
) -> Result<Json<DueItem>, AppError> {
    let mut item = repository::find_due_item(&state.db, &owner, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    if let Some(title) = req.title {
        if !title.trim().is_empty() {
            item.title = title.trim().to_string();
        }
    }
    if let Some(description) = req.description {
        item.description = Some(description);
    }
    if let Some(completed) = req.completed {
        item.completed = completed;
    }
    // An empty string clears the due date; anything unparseable is rejected.
    if let Some(raw) = req.due_date {
        item.due_date = normalize(&raw, &zone.name)
            .map_err(|err| AppError::BadRequest(format!("Invalid due date: {}", err.raw)))?;
    }
    item.updated_at = Utc::now();

    if !repository::update_due_item(&state.db, &item).await? {
        return Err(AppError::NotFound);
    }
    Ok(Json(item))
}

async fn delete_due_item(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if repository::delete_due_item(&state.db, &owner, &id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

async fn list_definitions(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Query(params): Query<DefinitionQueryParams>,
) -> Result<Json<Vec<RecurringDefinition>>, AppError> {
    let definitions = state.recurrence().list_definitions(&owner, params.active).await?;
    Ok(Json(definitions))
}

async fn create_definition(
    State(state): State<AppState>,
    Owner(owner): Owner,
    zone: RequestZone,
    Json(req): Json<NewRecurringRequest>,
) -> Result<(StatusCode, Json<CreatedDefinition>), AppError> {
    let now = Utc::now();
    let (definition, occurrences) = state
        .recurrence()
        .create_definition(&owner, req, zone.today(now), now)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedDefinition {
            definition,
            occurrences,
        }),
    ))
}

async fn get_definition(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<RecurringDefinition>, AppError> {
    let definition = state.recurrence().get_definition(&owner, &id).await?;
    Ok(Json(definition))
}

async fn update_definition(
    State(state): State<AppState>,
    Owner(owner): Owner,
    zone: RequestZone,
    Path(id): Path<String>,
    Json(req): Json<UpdateRecurringRequest>,
) -> Result<Json<RecurringDefinition>, AppError> {
    let now = Utc::now();
    let definition = state
        .recurrence()
        .update_definition(&owner, &id, req, zone.today(now), now)
        .await?;
    Ok(Json(definition))
}

/// `?delete_all_future=true` removes the definition and its history; otherwise the
/// definition is stopped from today.
async fn delete_definition(
    State(state): State<AppState>,
    Owner(owner): Owner,
    zone: RequestZone,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<StatusCode, AppError> {
    let recurrence = state.recurrence();
    if params.delete_all_future {
        recurrence.hard_delete(&owner, &id).await?;
    } else {
        let now = Utc::now();
        recurrence.soft_delete(&owner, &id, zone.today(now), now).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn materialize_definition(
    State(state): State<AppState>,
    Owner(owner): Owner,
    zone: RequestZone,
    Path(id): Path<String>,
) -> Result<Json<MaterializeReport>, AppError> {
    let now = Utc::now();
    let report = state
        .recurrence()
        .materialize_definition(&owner, &id, zone.today(now), now)
        .await?;
    Ok(Json(report))
}

async fn regenerate(
    State(state): State<AppState>,
    Owner(owner): Owner,
    zone: RequestZone,
) -> Result<Json<RegenerateStats>, AppError> {
    let now = Utc::now();
    let stats = state.recurrence().regenerate(&owner, zone.today(now), now).await?;
    Ok(Json(stats))
}

async fn list_occurrences(
    State(state): State<AppState>,
    Owner(owner): Owner,
    zone: RequestZone,
    Query(filter): Query<OccurrenceFilter>,
) -> Result<Json<Vec<Occurrence>>, AppError> {
    let now = Utc::now();
    let occurrences = state
        .recurrence()
        .list_occurrences(&owner, &filter, zone.today(now), now)
        .await?;
    Ok(Json(occurrences))
}

async fn update_occurrence(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    Json(req): Json<UpdateOccurrenceRequest>,
) -> Result<Json<Occurrence>, AppError> {
    let occurrence = state
        .recurrence()
        .update_occurrence(&owner, &id, req, Utc::now())
        .await?;
    Ok(Json(occurrence))
}

async fn delete_occurrence(
    State(state): State<AppState>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<DeletedOccurrences>, AppError> {
    let recurrence = state.recurrence();
    let removed = if params.delete_all_future {
        recurrence
            .delete_occurrence_and_future(&owner, &id, Utc::now())
            .await?
    } else {
        recurrence.delete_occurrence(&owner, &id).await?;
        1
    };
    Ok(Json(DeletedOccurrences { removed }))
}
