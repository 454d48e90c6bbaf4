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
use crate::models::{Submission, SubmissionStatus, User};
use crate::types::{ObjectId, Role};
use crate::validate::{FieldKind, FieldRule, Schema};

use super::{validated, ListQuery};

fn student_schema() -> Schema {
    Schema::new()
        .field(FieldRule::new("name", FieldKind::String { min: 1, max: 120 }).required())
        .field(FieldRule::new("email", FieldKind::Email).required())
        .field(FieldRule::new("password", FieldKind::String { min: 8, max: 128 }).required())
        .field(FieldRule::new("class_id", FieldKind::ObjectId))
}

#[derive(Debug, Deserialize)]
struct StudentInput {
    name: String,
    email: String,
    password: String,
    class_id: Option<ObjectId>,
}

/// GET /api/students
pub async fn list(
    Extension(user): Extension<SessionUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<User>> {
    authz::require(&user, Action::ViewStudents)?;

    let pool = DatabaseManager::pool().await?;
    let students: Vec<User> = sqlx::query_as(
        "SELECT * FROM users WHERE school_id = $1 AND role = 'student' \
         ORDER BY created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(&user.school_id)
    .bind(query.limit())
    .bind(query.offset())
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::success(students))
}

/// POST /api/students - a duplicate email yields 409.
pub async fn create(
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<Value>,
) -> ApiResult<User> {
    authz::require(&user, Action::ManageStudents)?;
    let input: StudentInput = validated(&student_schema(), &payload)?;

    let salt = generate_salt();
    let password_hash = hash_password(&input.password, &salt);

    let pool = DatabaseManager::pool().await?;
    let student: User = sqlx::query_as(
        "INSERT INTO users (id, school_id, name, email, password_hash, password_salt, role, class_id) \
         VALUES ($1, $2, $3, $4, $5, $6, 'student', $7) RETURNING *",
    )
    .bind(ObjectId::new())
    .bind(&user.school_id)
    .bind(&input.name)
    .bind(&input.email)
    .bind(&password_hash)
    .bind(&salt)
    .bind(&input.class_id)
    .fetch_one(&pool)
    .await
    .map_err(duplicate_email_error)?;

    Ok(ApiResponse::created(student))
}

/// GET /api/students/:id
pub async fn get(
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
) -> ApiResult<User> {
    authz::require(&user, Action::ViewStudents)?;
    let id: ObjectId = id.parse()?;

    let pool = DatabaseManager::pool().await?;
    let student: Option<User> = sqlx::query_as(
        "SELECT * FROM users WHERE school_id = $1 AND id = $2 AND role = 'student'",
    )
    .bind(&user.school_id)
    .bind(&id)
    .fetch_optional(&pool)
    .await?;

    let student = student.ok_or_else(|| ApiError::not_found("Student not found"))?;
    Ok(ApiResponse::success(student))
}

fn submission_schema() -> Schema {
    Schema::new()
        .field(FieldRule::new("test_id", FieldKind::ObjectId))
        .field(FieldRule::new("assignment_id", FieldKind::ObjectId))
        .field(FieldRule::new("answers", FieldKind::Array).required())
}

#[derive(Debug, Deserialize)]
struct SubmissionInput {
    test_id: Option<ObjectId>,
    assignment_id: Option<ObjectId>,
    answers: Value,
}

/// GET /api/students/:id/submissions - students may only read their
/// own submissions; teachers and admins see any student's.
pub async fn submissions_list(
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Submission>> {
    authz::require(&user, Action::ViewSubmissions)?;
    let student_id: ObjectId = id.parse()?;

    if user.role == Role::Student && user.user_id != student_id {
        return Err(ApiError::forbidden("You may only view your own submissions"));
    }

    let pool = DatabaseManager::pool().await?;
    let submissions: Vec<Submission> = sqlx::query_as(
        "SELECT * FROM submissions WHERE school_id = $1 AND student_id = $2 \
         ORDER BY created_at DESC",
    )
    .bind(&user.school_id)
    .bind(&student_id)
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::success(submissions))
}

/// POST /api/students/:id/submissions - a student submits an answer
/// set for exactly one test or assignment.
pub async fn submissions_create(
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> ApiResult<Submission> {
    authz::require(&user, Action::SubmitWork)?;
    let student_id: ObjectId = id.parse()?;

    if user.user_id != student_id {
        return Err(ApiError::forbidden("You may only submit your own work"));
    }

    let input: SubmissionInput = validated(&submission_schema(), &payload)?;
    if input.test_id.is_some() == input.assignment_id.is_some() {
        return Err(ApiError::bad_request(
            "Provide exactly one of test_id or assignment_id",
        ));
    }

    let pool = DatabaseManager::pool().await?;
    let submission: Submission = sqlx::query_as(
        "INSERT INTO submissions (id, school_id, student_id, test_id, assignment_id, answers, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING *",
    )
    .bind(ObjectId::new())
    .bind(&user.school_id)
    .bind(&student_id)
    .bind(&input.test_id)
    .bind(&input.assignment_id)
    .bind(sqlx::types::Json(&input.answers))
    .bind(SubmissionStatus::Submitted.as_str())
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::created(submission))
}

fn duplicate_email_error(err: sqlx::Error) -> ApiError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return ApiError::conflict("A user with this email already exists");
        }
    }
    err.into()
}
