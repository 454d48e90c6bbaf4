use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::auth::{generate_salt, hash_password};
use crate::authz::{self, Action};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, SessionUser};
use crate::models::{Assignment, User};
use crate::types::{ObjectId, Role};
use crate::validate::{FieldKind, FieldRule, Schema};

use super::{validated, ListQuery};

fn teacher_schema() -> Schema {
    Schema::new()
        .field(FieldRule::new("name", FieldKind::String { min: 1, max: 120 }).required())
        .field(FieldRule::new("email", FieldKind::Email).required())
        .field(FieldRule::new("password", FieldKind::String { min: 8, max: 128 }).required())
}

#[derive(Debug, Deserialize)]
struct TeacherInput {
    name: String,
    email: String,
    password: String,
}

fn teacher_update_schema() -> Schema {
    Schema::new()
        .field(FieldRule::new("name", FieldKind::String { min: 1, max: 120 }).required())
        .field(FieldRule::new("email", FieldKind::Email).required())
}

#[derive(Debug, Deserialize)]
struct TeacherUpdateInput {
    name: String,
    email: String,
}

/// GET /api/teachers
pub async fn list(
    Extension(user): Extension<SessionUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<User>> {
    authz::require(&user, Action::ViewTeachers)?;

    let pool = DatabaseManager::pool().await?;
    let teachers: Vec<User> = sqlx::query_as(
        "SELECT * FROM users WHERE school_id = $1 AND role = 'teacher' \
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(&user.school_id)
    .bind(query.limit())
    .bind(query.offset())
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::success(teachers))
}

/// POST /api/teachers
pub async fn create(
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<Value>,
) -> ApiResult<User> {
    authz::require(&user, Action::ManageTeachers)?;
    let input: TeacherInput = validated(&teacher_schema(), &payload)?;

    let salt = generate_salt();
    let password_hash = hash_password(&input.password, &salt);

    let pool = DatabaseManager::pool().await?;
    let teacher: User = sqlx::query_as(
        "INSERT INTO users (id, school_id, name, email, password_hash, password_salt, role) \
         VALUES ($1, $2, $3, $4, $5, $6, 'teacher') RETURNING *",
    )
    .bind(ObjectId::new())
    .bind(&user.school_id)
    .bind(&input.name)
    .bind(&input.email)
    .bind(&password_hash)
    .bind(&salt)
    .fetch_one(&pool)
    .await
    .map_err(duplicate_email_error)?;

    Ok(ApiResponse::created(teacher))
}

/// PUT /api/teachers/:id
pub async fn update(
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> ApiResult<User> {
    authz::require(&user, Action::ManageTeachers)?;
    let id: ObjectId = id.parse()?;
    let input: TeacherUpdateInput = validated(&teacher_update_schema(), &payload)?;

    let pool = DatabaseManager::pool().await?;
    let updated: Option<User> = sqlx::query_as(
        "UPDATE users SET name = $1, email = $2 \
         WHERE school_id = $3 AND id = $4 AND role = 'teacher' RETURNING *",
    )
    .bind(&input.name)
    .bind(&input.email)
    .bind(&user.school_id)
    .bind(&id)
    .fetch_optional(&pool)
    .await
    .map_err(duplicate_email_error)?;

    let updated = updated.ok_or_else(|| ApiError::not_found("Teacher not found"))?;
    Ok(ApiResponse::success(updated))
}

fn assignment_schema() -> Schema {
    Schema::new()
        .field(FieldRule::new("class_id", FieldKind::ObjectId).required())
        .field(FieldRule::new("subject_id", FieldKind::ObjectId).required())
        .field(FieldRule::new("title", FieldKind::String { min: 1, max: 200 }).required())
        .field(FieldRule::new("description", FieldKind::String { min: 0, max: 5000 }).sanitized())
        .field(FieldRule::new("due_date", FieldKind::DateTime))
}

#[derive(Debug, Deserialize)]
struct AssignmentInput {
    class_id: ObjectId,
    subject_id: ObjectId,
    title: String,
    description: Option<String>,
    due_date: Option<String>,
}

/// GET /api/teachers/:id/assignments
pub async fn assignments_list(
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Assignment>> {
    authz::require(&user, Action::ViewAssignments)?;
    let teacher_id: ObjectId = id.parse()?;

    let pool = DatabaseManager::pool().await?;
    let assignments: Vec<Assignment> = sqlx::query_as(
        "SELECT * FROM assignments WHERE school_id = $1 AND teacher_id = $2 \
         ORDER BY created_at DESC",
    )
    .bind(&user.school_id)
    .bind(&teacher_id)
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::success(assignments))
}

/// POST /api/teachers/:id/assignments - teachers create under their
/// own id; admins may create for any teacher.
pub async fn assignments_create(
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> ApiResult<Assignment> {
    authz::require(&user, Action::CreateAssignments)?;
    let teacher_id: ObjectId = id.parse()?;

    if user.role == Role::Teacher && user.user_id != teacher_id {
        return Err(ApiError::forbidden("You may only create your own assignments"));
    }

    let input: AssignmentInput = validated(&assignment_schema(), &payload)?;

    let pool = DatabaseManager::pool().await?;
    let assignment: Assignment = sqlx::query_as(
        "INSERT INTO assignments \
         (id, school_id, class_id, subject_id, teacher_id, title, description, due_date) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8::timestamptz) RETURNING *",
    )
    .bind(ObjectId::new())
    .bind(&user.school_id)
    .bind(&input.class_id)
    .bind(&input.subject_id)
    .bind(&teacher_id)
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.due_date)
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::created(assignment))
}

fn duplicate_email_error(err: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return ApiError::conflict("A user with this email already exists");
        }
    }
    err.into()
}
