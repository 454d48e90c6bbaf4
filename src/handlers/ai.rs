// AI helper endpoints: validate, build a prompt, relay the provider's
// answer. Provider failures surface as a generic 500; the detail is
// logged server-side only.

use axum::{extract::Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::ai::{self, AiProvider, HttpAiProvider};
use crate::authz::{self, Action};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, SessionUser};
use crate::types::{ObjectId, Role};
use crate::validate::{FieldKind, FieldRule, Schema};

use super::validated;

fn lesson_plan_schema() -> Schema {
    Schema::new()
        .field(FieldRule::new("subject", FieldKind::String { min: 1, max: 100 }).required())
        .field(FieldRule::new("topic", FieldKind::String { min: 1, max: 200 }).required())
        .field(FieldRule::new("grade", FieldKind::Int { min: 1, max: 12 }).required())
        .field(FieldRule::new("duration_minutes", FieldKind::Int { min: 10, max: 240 }))
        .field(FieldRule::new("subject_id", FieldKind::ObjectId))
}

#[derive(Debug, Deserialize)]
struct LessonPlanInput {
    subject: String,
    topic: String,
    grade: i64,
    duration_minutes: Option<i64>,
    subject_id: Option<ObjectId>,
}

/// POST /api/ai/lesson-plan - generate a lesson plan; teachers get a
/// saved copy under their lesson plans.
pub async fn lesson_plan(
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<Value>,
) -> ApiResult<Value> {
    authz::require(&user, Action::UseAiTools)?;
    let input: LessonPlanInput = validated(&lesson_plan_schema(), &payload)?;

    let prompt = ai::lesson_plan_prompt(
        &input.subject,
        &input.topic,
        input.grade,
        input.duration_minutes.unwrap_or(40),
    );
    let content = HttpAiProvider::new()
        .generate(ai::TUTOR_SYSTEM_PROMPT, &prompt)
        .await
        .map_err(|e| ApiError::upstream("AI", e))?;

    let mut saved_id = None;
    if user.role == Role::Teacher {
        if let Some(subject_id) = &input.subject_id {
            let pool = DatabaseManager::pool().await?;
            let id = ObjectId::new();
            sqlx::query(
                "INSERT INTO lesson_plans (id, school_id, teacher_id, subject_id, title, content) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(&id)
            .bind(&user.school_id)
            .bind(&user.user_id)
            .bind(subject_id)
            .bind(format!("{}: {}", input.subject, input.topic))
            .bind(&content)
            .execute(&pool)
            .await?;
            saved_id = Some(id);
        }
    }

    Ok(ApiResponse::success(json!({
        "content": content,
        "lesson_plan_id": saved_id,
    })))
}

fn flashcards_schema() -> Schema {
    Schema::new()
        .field(FieldRule::new("subject", FieldKind::String { min: 1, max: 100 }).required())
        .field(FieldRule::new("topic", FieldKind::String { min: 1, max: 200 }).required())
        .field(FieldRule::new("count", FieldKind::Int { min: 1, max: 50 }))
}

#[derive(Debug, Deserialize)]
struct FlashcardsInput {
    subject: String,
    topic: String,
    count: Option<i64>,
}

/// POST /api/ai/flashcards
pub async fn flashcards(
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<Value>,
) -> ApiResult<Value> {
    authz::require(&user, Action::UseAiTools)?;
    let input: FlashcardsInput = validated(&flashcards_schema(), &payload)?;

    let prompt = ai::flashcards_prompt(&input.subject, &input.topic, input.count.unwrap_or(10));
    let content = HttpAiProvider::new()
        .generate(ai::TUTOR_SYSTEM_PROMPT, &prompt)
        .await
        .map_err(|e| ApiError::upstream("AI", e))?;

    Ok(ApiResponse::success(json!({ "content": content })))
}

fn questions_schema() -> Schema {
    Schema::new()
        .field(FieldRule::new("subject", FieldKind::String { min: 1, max: 100 }).required())
        .field(FieldRule::new("topic", FieldKind::String { min: 1, max: 200 }).required())
        .field(FieldRule::new("difficulty", FieldKind::Enum(&["easy", "medium", "hard"])).required())
        .field(FieldRule::new("count", FieldKind::Int { min: 1, max: 30 }))
}

#[derive(Debug, Deserialize)]
struct QuestionsInput {
    subject: String,
    topic: String,
    difficulty: String,
    count: Option<i64>,
}

/// POST /api/ai/questions - adaptive test questions at a requested
/// difficulty.
pub async fn questions(
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<Value>,
) -> ApiResult<Value> {
    authz::require(&user, Action::UseAiTools)?;
    let input: QuestionsInput = validated(&questions_schema(), &payload)?;

    let prompt = ai::adaptive_questions_prompt(
        &input.subject,
        &input.topic,
        &input.difficulty,
        input.count.unwrap_or(5),
    );
    let content = HttpAiProvider::new()
        .generate(ai::TUTOR_SYSTEM_PROMPT, &prompt)
        .await
        .map_err(|e| ApiError::upstream("AI", e))?;

    Ok(ApiResponse::success(json!({ "content": content })))
}

fn timetable_schema() -> Schema {
    Schema::new()
        .field(FieldRule::new("grade", FieldKind::Int { min: 1, max: 12 }).required())
        .field(FieldRule::new("subjects", FieldKind::Array).required())
        .field(FieldRule::new("periods_per_day", FieldKind::Int { min: 1, max: 12 }))
}

#[derive(Debug, Deserialize)]
struct TimetableSuggestionInput {
    grade: i64,
    subjects: Vec<String>,
    periods_per_day: Option<i64>,
}

/// POST /api/ai/timetable - a weekly timetable suggestion.
pub async fn timetable(
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<Value>,
) -> ApiResult<Value> {
    authz::require(&user, Action::UseAiTools)?;
    let input: TimetableSuggestionInput = validated(&timetable_schema(), &payload)?;

    if input.subjects.is_empty() || input.subjects.len() > 20 {
        return Err(ApiError::bad_request("Provide between 1 and 20 subjects"));
    }

    let prompt = ai::timetable_suggestion_prompt(
        input.grade,
        &input.subjects,
        input.periods_per_day.unwrap_or(8),
    );
    let content = HttpAiProvider::new()
        .generate(ai::TUTOR_SYSTEM_PROMPT, &prompt)
        .await
        .map_err(|e| ApiError::upstream("AI", e))?;

    Ok(ApiResponse::success(json!({ "content": content })))
}
