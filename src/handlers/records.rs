// School content and finance records: events, posts, notifications,
// messages, feedback, expenses, fee structures, academic config. All
// list/create pairs over the shared tenant-scoped plumbing; free-text
// fields are sanitized at validation time.

use axum::{
    extract::{Extension, Query},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::authz::{self, Action};
use crate::database::{DatabaseManager, Repository};
use crate::middleware::{ApiResponse, ApiResult, SessionUser};
use crate::models::{
    AcademicConfig, Event, Expense, Feedback, FeeStructure, Message, Notification, Post,
};
use crate::types::ObjectId;
use crate::validate::{FieldKind, FieldRule, Schema};

use super::{validated, ListQuery};

fn event_schema() -> Schema {
    Schema::new()
        .field(FieldRule::new("title", FieldKind::String { min: 1, max: 200 }).required())
        .field(FieldRule::new("description", FieldKind::String { min: 0, max: 5000 }).sanitized())
        .field(FieldRule::new("starts_at", FieldKind::DateTime).required())
        .field(FieldRule::new("ends_at", FieldKind::DateTime))
}

#[derive(Debug, Deserialize)]
struct EventInput {
    title: String,
    description: Option<String>,
    starts_at: String,
    ends_at: Option<String>,
}

/// GET /api/events
pub async fn events_list(
    Extension(user): Extension<SessionUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Event>> {
    authz::require(&user, Action::ViewContent)?;

    let pool = DatabaseManager::pool().await?;
    let events = Repository::<Event>::new("events", pool)
        .list(&user.school_id, query.limit(), query.offset())
        .await?;
    Ok(ApiResponse::success(events))
}

/// POST /api/events
pub async fn events_create(
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<Value>,
) -> ApiResult<Event> {
    authz::require(&user, Action::PublishContent)?;
    let input: EventInput = validated(&event_schema(), &payload)?;

    let pool = DatabaseManager::pool().await?;
    let event: Event = sqlx::query_as(
        "INSERT INTO events (id, school_id, title, description, starts_at, ends_at) \
         VALUES ($1, $2, $3, $4, $5::timestamptz, $6::timestamptz) RETURNING *",
    )
    .bind(ObjectId::new())
    .bind(&user.school_id)
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.starts_at)
    .bind(&input.ends_at)
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::created(event))
}

fn post_schema() -> Schema {
    Schema::new()
        .field(FieldRule::new("title", FieldKind::String { min: 1, max: 200 }).required())
        .field(FieldRule::new("body", FieldKind::String { min: 1, max: 10_000 }).required().sanitized())
}

#[derive(Debug, Deserialize)]
struct PostInput {
    title: String,
    body: String,
}

/// GET /api/posts
pub async fn posts_list(
    Extension(user): Extension<SessionUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Post>> {
    authz::require(&user, Action::ViewContent)?;

    let pool = DatabaseManager::pool().await?;
    let posts = Repository::<Post>::new("posts", pool)
        .list(&user.school_id, query.limit(), query.offset())
        .await?;
    Ok(ApiResponse::success(posts))
}

/// POST /api/posts - the author is always the caller.
pub async fn posts_create(
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<Value>,
) -> ApiResult<Post> {
    authz::require(&user, Action::PublishContent)?;
    let input: PostInput = validated(&post_schema(), &payload)?;

    let pool = DatabaseManager::pool().await?;
    let post: Post = sqlx::query_as(
        "INSERT INTO posts (id, school_id, author_id, title, body) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(ObjectId::new())
    .bind(&user.school_id)
    .bind(&user.user_id)
    .bind(&input.title)
    .bind(&input.body)
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::created(post))
}

fn notification_schema() -> Schema {
    Schema::new()
        .field(FieldRule::new("user_id", FieldKind::ObjectId).required())
        .field(FieldRule::new("title", FieldKind::String { min: 1, max: 200 }).required())
        .field(FieldRule::new("body", FieldKind::String { min: 0, max: 2000 }).sanitized())
}

#[derive(Debug, Deserialize)]
struct NotificationInput {
    user_id: ObjectId,
    title: String,
    body: Option<String>,
}

/// GET /api/notifications - the caller's own, unread first is left to
/// the client; newest first here.
pub async fn notifications_list(
    Extension(user): Extension<SessionUser>,
) -> ApiResult<Vec<Notification>> {
    authz::require(&user, Action::ViewContent)?;

    let pool = DatabaseManager::pool().await?;
    let notifications: Vec<Notification> = sqlx::query_as(
        "SELECT * FROM notifications WHERE school_id = $1 AND user_id = $2 \
         ORDER BY created_at DESC",
    )
    .bind(&user.school_id)
    .bind(&user.user_id)
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::success(notifications))
}

/// POST /api/notifications
pub async fn notifications_create(
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<Value>,
) -> ApiResult<Notification> {
    authz::require(&user, Action::PublishContent)?;
    let input: NotificationInput = validated(&notification_schema(), &payload)?;

    let pool = DatabaseManager::pool().await?;
    let notification: Notification = sqlx::query_as(
        "INSERT INTO notifications (id, school_id, user_id, title, body) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(ObjectId::new())
    .bind(&user.school_id)
    .bind(&input.user_id)
    .bind(&input.title)
    .bind(&input.body)
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::created(notification))
}

fn message_schema() -> Schema {
    Schema::new()
        .field(FieldRule::new("recipient_id", FieldKind::ObjectId).required())
        .field(FieldRule::new("body", FieldKind::String { min: 1, max: 5000 }).required().sanitized())
}

#[derive(Debug, Deserialize)]
struct MessageInput {
    recipient_id: ObjectId,
    body: String,
}

/// GET /api/messages - conversations the caller is part of, either
/// side.
pub async fn messages_list(
    Extension(user): Extension<SessionUser>,
) -> ApiResult<Vec<Message>> {
    authz::require(&user, Action::SendMessages)?;

    let pool = DatabaseManager::pool().await?;
    let messages: Vec<Message> = sqlx::query_as(
        "SELECT * FROM messages WHERE school_id = $1 AND (sender_id = $2 OR recipient_id = $2) \
         ORDER BY created_at DESC",
    )
    .bind(&user.school_id)
    .bind(&user.user_id)
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::success(messages))
}

/// POST /api/messages - the sender is always the caller.
pub async fn messages_create(
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<Value>,
) -> ApiResult<Message> {
    authz::require(&user, Action::SendMessages)?;
    let input: MessageInput = validated(&message_schema(), &payload)?;

    let pool = DatabaseManager::pool().await?;
    let message: Message = sqlx::query_as(
        "INSERT INTO messages (id, school_id, sender_id, recipient_id, body) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(ObjectId::new())
    .bind(&user.school_id)
    .bind(&user.user_id)
    .bind(&input.recipient_id)
    .bind(&input.body)
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::created(message))
}

fn feedback_schema() -> Schema {
    Schema::new()
        .field(FieldRule::new("body", FieldKind::String { min: 1, max: 5000 }).required().sanitized())
        .field(FieldRule::new("rating", FieldKind::Int { min: 1, max: 5 }))
}

#[derive(Debug, Deserialize)]
struct FeedbackInput {
    body: String,
    rating: Option<i64>,
}

/// GET /api/feedback - admins review what the school has submitted.
pub async fn feedback_list(
    Extension(user): Extension<SessionUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Feedback>> {
    authz::require(&user, Action::ViewFeedback)?;

    let pool = DatabaseManager::pool().await?;
    let feedback = Repository::<Feedback>::new("feedback", pool)
        .list(&user.school_id, query.limit(), query.offset())
        .await?;
    Ok(ApiResponse::success(feedback))
}

/// POST /api/feedback - any signed-in user may submit.
pub async fn feedback_create(
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<Value>,
) -> ApiResult<Feedback> {
    authz::require(&user, Action::GiveFeedback)?;
    let input: FeedbackInput = validated(&feedback_schema(), &payload)?;

    let pool = DatabaseManager::pool().await?;
    let feedback: Feedback = sqlx::query_as(
        "INSERT INTO feedback (id, school_id, author_id, body, rating) \
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(ObjectId::new())
    .bind(&user.school_id)
    .bind(&user.user_id)
    .bind(&input.body)
    .bind(input.rating.map(|r| r as i32))
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::created(feedback))
}

fn expense_schema() -> Schema {
    Schema::new()
        .field(FieldRule::new("category", FieldKind::String { min: 1, max: 100 }).required())
        .field(FieldRule::new("amount", FieldKind::Int { min: 1, max: 1_000_000_000 }).required())
        .field(FieldRule::new("note", FieldKind::String { min: 0, max: 1000 }).sanitized())
        .field(FieldRule::new("incurred_at", FieldKind::DateTime).required())
}

#[derive(Debug, Deserialize)]
struct ExpenseInput {
    category: String,
    amount: i64,
    note: Option<String>,
    incurred_at: String,
}

/// GET /api/expenses
pub async fn expenses_list(
    Extension(user): Extension<SessionUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Expense>> {
    authz::require(&user, Action::ViewTransactions)?;

    let pool = DatabaseManager::pool().await?;
    let expenses = Repository::<Expense>::new("expenses", pool)
        .list(&user.school_id, query.limit(), query.offset())
        .await?;
    Ok(ApiResponse::success(expenses))
}

/// POST /api/expenses
pub async fn expenses_create(
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<Value>,
) -> ApiResult<Expense> {
    authz::require(&user, Action::RecordTransactions)?;
    let input: ExpenseInput = validated(&expense_schema(), &payload)?;

    let pool = DatabaseManager::pool().await?;
    let expense: Expense = sqlx::query_as(
        "INSERT INTO expenses (id, school_id, category, amount_minor, note, incurred_at) \
         VALUES ($1, $2, $3, $4, $5, $6::timestamptz) RETURNING *",
    )
    .bind(ObjectId::new())
    .bind(&user.school_id)
    .bind(&input.category)
    .bind(input.amount)
    .bind(&input.note)
    .bind(&input.incurred_at)
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::created(expense))
}

fn fee_structure_schema() -> Schema {
    Schema::new()
        .field(FieldRule::new("class_id", FieldKind::ObjectId).required())
        .field(FieldRule::new("name", FieldKind::String { min: 1, max: 200 }).required())
        .field(FieldRule::new("amount", FieldKind::Int { min: 1, max: 1_000_000_000 }).required())
        .field(FieldRule::new("due_date", FieldKind::DateTime))
}

#[derive(Debug, Deserialize)]
struct FeeStructureInput {
    class_id: ObjectId,
    name: String,
    amount: i64,
    due_date: Option<String>,
}

/// GET /api/fee-structures - fee schedules are visible to everyone in
/// the school.
pub async fn fee_structures_list(
    Extension(user): Extension<SessionUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<FeeStructure>> {
    authz::require(&user, Action::ViewFees)?;

    let pool = DatabaseManager::pool().await?;
    let fee_structures = Repository::<FeeStructure>::new("fee_structures", pool)
        .list(&user.school_id, query.limit(), query.offset())
        .await?;
    Ok(ApiResponse::success(fee_structures))
}

/// POST /api/fee-structures
pub async fn fee_structures_create(
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<Value>,
) -> ApiResult<FeeStructure> {
    authz::require(&user, Action::ManageFees)?;
    let input: FeeStructureInput = validated(&fee_structure_schema(), &payload)?;

    let pool = DatabaseManager::pool().await?;
    let fee_structure: FeeStructure = sqlx::query_as(
        "INSERT INTO fee_structures (id, school_id, class_id, name, amount_minor, due_date) \
         VALUES ($1, $2, $3, $4, $5, $6::timestamptz) RETURNING *",
    )
    .bind(ObjectId::new())
    .bind(&user.school_id)
    .bind(&input.class_id)
    .bind(&input.name)
    .bind(input.amount)
    .bind(&input.due_date)
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::created(fee_structure))
}

fn academic_config_schema() -> Schema {
    Schema::new()
        .field(FieldRule::new("academic_year", FieldKind::String { min: 4, max: 20 }).required())
        .field(FieldRule::new("term", FieldKind::String { min: 1, max: 50 }))
}

#[derive(Debug, Deserialize)]
struct AcademicConfigInput {
    academic_year: String,
    term: Option<String>,
}

/// GET /api/academic-config
pub async fn academic_config_list(
    Extension(user): Extension<SessionUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<AcademicConfig>> {
    authz::require(&user, Action::ViewContent)?;

    let pool = DatabaseManager::pool().await?;
    let configs = Repository::<AcademicConfig>::new("academic_configs", pool)
        .list(&user.school_id, query.limit(), query.offset())
        .await?;
    Ok(ApiResponse::success(configs))
}

/// POST /api/academic-config
pub async fn academic_config_create(
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<Value>,
) -> ApiResult<AcademicConfig> {
    authz::require(&user, Action::ManageAcademicConfig)?;
    let input: AcademicConfigInput = validated(&academic_config_schema(), &payload)?;

    let pool = DatabaseManager::pool().await?;
    let config: AcademicConfig = sqlx::query_as(
        "INSERT INTO academic_configs (id, school_id, academic_year, term) \
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(ObjectId::new())
    .bind(&user.school_id)
    .bind(&input.academic_year)
    .bind(&input.term)
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::created(config))
}
