use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::authz::{self, Action};
use crate::database::{DatabaseManager, Repository};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, SessionUser};
use crate::models::{Timetable, TimetableEntry, WEEKDAYS};
use crate::types::ObjectId;
use crate::validate::{FieldKind, FieldRule, Schema};

use super::{validated, ListQuery};

fn timetable_schema() -> Schema {
    Schema::new()
        .field(FieldRule::new("class_id", FieldKind::ObjectId).required())
        .field(FieldRule::new("name", FieldKind::String { min: 1, max: 120 }).required())
        .field(FieldRule::new("effective_from", FieldKind::DateTime))
        .field(FieldRule::new("entries", FieldKind::Array))
}

fn entry_schema() -> Schema {
    Schema::new()
        .field(FieldRule::new("timetable_id", FieldKind::ObjectId).required())
        .field(FieldRule::new("day", FieldKind::Enum(WEEKDAYS)).required())
        .field(FieldRule::new("period_number", FieldKind::Int { min: 1, max: 20 }).required())
        .field(FieldRule::new("subject_id", FieldKind::ObjectId).required())
        .field(FieldRule::new("teacher_id", FieldKind::ObjectId))
        .field(FieldRule::new("starts_at", FieldKind::String { min: 0, max: 16 }))
        .field(FieldRule::new("ends_at", FieldKind::String { min: 0, max: 16 }))
}

// Inline entries on timetable creation carry no timetable_id; the
// parent is the one being created.
fn inline_entry_schema() -> Schema {
    Schema::new()
        .field(FieldRule::new("day", FieldKind::Enum(WEEKDAYS)).required())
        .field(FieldRule::new("period_number", FieldKind::Int { min: 1, max: 20 }).required())
        .field(FieldRule::new("subject_id", FieldKind::ObjectId).required())
        .field(FieldRule::new("teacher_id", FieldKind::ObjectId))
        .field(FieldRule::new("starts_at", FieldKind::String { min: 0, max: 16 }))
        .field(FieldRule::new("ends_at", FieldKind::String { min: 0, max: 16 }))
}

#[derive(Debug, Deserialize)]
struct TimetableInput {
    class_id: ObjectId,
    name: String,
    effective_from: Option<String>,
    entries: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct EntryInput {
    timetable_id: Option<ObjectId>,
    day: String,
    period_number: i32,
    subject_id: ObjectId,
    teacher_id: Option<ObjectId>,
    starts_at: Option<String>,
    ends_at: Option<String>,
}

/// GET /api/timetables
pub async fn list(
    Extension(user): Extension<SessionUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Timetable>> {
    authz::require(&user, Action::ViewTimetables)?;

    let pool = DatabaseManager::pool().await?;
    let timetables = Repository::<Timetable>::new("timetables", pool)
        .list(&user.school_id, query.limit(), query.offset())
        .await?;
    Ok(ApiResponse::success(timetables))
}

/// POST /api/timetables - create a timetable, bulk-inserting any
/// inline entries in the same transaction so a failed entry never
/// leaves an orphaned parent.
pub async fn create(
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<Value>,
) -> ApiResult<Value> {
    authz::require(&user, Action::ManageTimetables)?;
    let input: TimetableInput = validated(&timetable_schema(), &payload)?;

    // Validate every inline entry before touching the database
    let inline_schema = inline_entry_schema();
    let mut entries = Vec::new();
    for entry_payload in input.entries.unwrap_or_default() {
        let entry: EntryInput = validated(&inline_schema, &entry_payload)?;
        entries.push(entry);
    }

    let pool = DatabaseManager::pool().await?;
    let mut tx = pool.begin().await?;

    let timetable_id = ObjectId::new();
    sqlx::query(
        "INSERT INTO timetables (id, school_id, class_id, name, effective_from) \
         VALUES ($1, $2, $3, $4, $5::timestamptz)",
    )
    .bind(&timetable_id)
    .bind(&user.school_id)
    .bind(&input.class_id)
    .bind(&input.name)
    .bind(&input.effective_from)
    .execute(&mut *tx)
    .await?;

    let mut entry_ids = Vec::with_capacity(entries.len());
    for entry in &entries {
        let entry_id = ObjectId::new();
        sqlx::query(
            "INSERT INTO timetable_entries \
             (id, school_id, timetable_id, day, period_number, subject_id, teacher_id, starts_at, ends_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(&entry_id)
        .bind(&user.school_id)
        .bind(&timetable_id)
        .bind(&entry.day)
        .bind(entry.period_number)
        .bind(&entry.subject_id)
        .bind(&entry.teacher_id)
        .bind(&entry.starts_at)
        .bind(&entry.ends_at)
        .execute(&mut *tx)
        .await
        .map_err(duplicate_entry_error)?;
        entry_ids.push(entry_id);
    }

    tx.commit().await?;

    Ok(ApiResponse::created(json!({
        "id": timetable_id,
        "entry_ids": entry_ids,
    })))
}

/// GET /api/timetables/:id - the timetable with its entries.
pub async fn get(
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    authz::require(&user, Action::ViewTimetables)?;
    let id: ObjectId = id.parse()?;

    let pool = DatabaseManager::pool().await?;
    let timetable = Repository::<Timetable>::new("timetables", pool.clone())
        .fetch_by_id(&user.school_id, &id)
        .await?;

    let entries: Vec<TimetableEntry> = sqlx::query_as(
        "SELECT * FROM timetable_entries WHERE school_id = $1 AND timetable_id = $2 \
         ORDER BY day, period_number",
    )
    .bind(&user.school_id)
    .bind(&id)
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::success(json!({
        "timetable": timetable,
        "entries": entries,
    })))
}

/// PUT /api/timetables/:id
pub async fn update(
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> ApiResult<Timetable> {
    authz::require(&user, Action::ManageTimetables)?;
    let id: ObjectId = id.parse()?;
    let input: TimetableInput = validated(&timetable_schema(), &payload)?;

    let pool = DatabaseManager::pool().await?;
    let updated: Option<Timetable> = sqlx::query_as(
        "UPDATE timetables SET class_id = $1, name = $2, effective_from = $3::timestamptz \
         WHERE school_id = $4 AND id = $5 RETURNING *",
    )
    .bind(&input.class_id)
    .bind(&input.name)
    .bind(&input.effective_from)
    .bind(&user.school_id)
    .bind(&id)
    .fetch_optional(&pool)
    .await?;

    let updated = updated.ok_or_else(|| ApiError::not_found("Timetable not found"))?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/timetables/:id - entries go with the parent.
pub async fn delete(
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    authz::require(&user, Action::ManageTimetables)?;
    let id: ObjectId = id.parse()?;

    let pool = DatabaseManager::pool().await?;
    let deleted = Repository::<Timetable>::new("timetables", pool)
        .delete_by_id(&user.school_id, &id)
        .await?;

    if deleted == 0 {
        return Err(ApiError::not_found("Timetable not found"));
    }
    Ok(ApiResponse::success(json!({ "deleted": true })))
}

#[derive(Debug, Deserialize)]
pub struct EntryListQuery {
    timetable_id: String,
}

/// GET /api/timetables/entries?timetable_id=...
pub async fn entries_list(
    Extension(user): Extension<SessionUser>,
    Query(query): Query<EntryListQuery>,
) -> ApiResult<Vec<TimetableEntry>> {
    authz::require(&user, Action::ViewTimetables)?;
    let timetable_id: ObjectId = query.timetable_id.parse()?;

    let pool = DatabaseManager::pool().await?;
    let entries: Vec<TimetableEntry> = sqlx::query_as(
        "SELECT * FROM timetable_entries WHERE school_id = $1 AND timetable_id = $2 \
         ORDER BY day, period_number",
    )
    .bind(&user.school_id)
    .bind(&timetable_id)
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::success(entries))
}

/// POST /api/timetables/entries - a duplicate `(timetable, day,
/// period)` tuple yields 409.
pub async fn entries_create(
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<Value>,
) -> ApiResult<TimetableEntry> {
    authz::require(&user, Action::ManageTimetables)?;
    let input: EntryInput = validated(&entry_schema(), &payload)?;
    let timetable_id = input
        .timetable_id
        .ok_or_else(|| ApiError::bad_request("timetable_id is required"))?;

    let pool = DatabaseManager::pool().await?;

    // Parent must exist within the caller's school
    Repository::<Timetable>::new("timetables", pool.clone())
        .fetch_by_id(&user.school_id, &timetable_id)
        .await?;

    let entry: TimetableEntry = sqlx::query_as(
        "INSERT INTO timetable_entries \
         (id, school_id, timetable_id, day, period_number, subject_id, teacher_id, starts_at, ends_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
    )
    .bind(ObjectId::new())
    .bind(&user.school_id)
    .bind(&timetable_id)
    .bind(&input.day)
    .bind(input.period_number)
    .bind(&input.subject_id)
    .bind(&input.teacher_id)
    .bind(&input.starts_at)
    .bind(&input.ends_at)
    .fetch_one(&pool)
    .await
    .map_err(duplicate_entry_error)?;

    Ok(ApiResponse::created(entry))
}

/// GET /api/timetables/entries/:id
pub async fn entry_get(
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
) -> ApiResult<TimetableEntry> {
    authz::require(&user, Action::ViewTimetables)?;
    let id: ObjectId = id.parse()?;

    let pool = DatabaseManager::pool().await?;
    let entry = Repository::<TimetableEntry>::new("timetable_entries", pool)
        .fetch_by_id(&user.school_id, &id)
        .await?;
    Ok(ApiResponse::success(entry))
}

/// PUT /api/timetables/entries/:id
pub async fn entry_update(
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> ApiResult<TimetableEntry> {
    authz::require(&user, Action::ManageTimetables)?;
    let id: ObjectId = id.parse()?;
    let input: EntryInput = validated(&entry_schema(), &payload)?;
    let timetable_id = input
        .timetable_id
        .ok_or_else(|| ApiError::bad_request("timetable_id is required"))?;

    let pool = DatabaseManager::pool().await?;
    let updated: Option<TimetableEntry> = sqlx::query_as(
        "UPDATE timetable_entries SET timetable_id = $1, day = $2, period_number = $3, \
         subject_id = $4, teacher_id = $5, starts_at = $6, ends_at = $7 \
         WHERE school_id = $8 AND id = $9 RETURNING *",
    )
    .bind(&timetable_id)
    .bind(&input.day)
    .bind(input.period_number)
    .bind(&input.subject_id)
    .bind(&input.teacher_id)
    .bind(&input.starts_at)
    .bind(&input.ends_at)
    .bind(&user.school_id)
    .bind(&id)
    .fetch_optional(&pool)
    .await
    .map_err(duplicate_entry_error)?;

    let updated = updated.ok_or_else(|| ApiError::not_found("Timetable entry not found"))?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /api/timetables/entries/:id
pub async fn entry_delete(
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    authz::require(&user, Action::ManageTimetables)?;
    let id: ObjectId = id.parse()?;

    let pool = DatabaseManager::pool().await?;
    let deleted = Repository::<TimetableEntry>::new("timetable_entries", pool)
        .delete_by_id(&user.school_id, &id)
        .await?;

    if deleted == 0 {
        return Err(ApiError::not_found("Timetable entry not found"));
    }
    Ok(ApiResponse::success(json!({ "deleted": true })))
}

/// Give the `(timetable, day, period)` unique violation a specific
/// message; everything else falls through to the standard mapping.
fn duplicate_entry_error(err: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return ApiError::conflict("An entry already exists for this day and period");
        }
    }
    err.into()
}
