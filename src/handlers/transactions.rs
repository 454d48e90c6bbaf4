use axum::{
    extract::{Extension, Query},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::authz::{self, Action};
use crate::database::{DatabaseManager, Repository};
use crate::middleware::{ApiResponse, ApiResult, SessionUser};
use crate::models::Transaction;
use crate::types::ObjectId;
use crate::validate::{FieldKind, FieldRule, Schema};

use super::{validated, ListQuery};

fn transaction_schema() -> Schema {
    Schema::new()
        .field(FieldRule::new("kind", FieldKind::Enum(&["income", "expense"])).required())
        .field(FieldRule::new("amount", FieldKind::Int { min: 1, max: 1_000_000_000 }).required())
        .field(FieldRule::new("category", FieldKind::String { min: 1, max: 100 }).required())
        .field(FieldRule::new("note", FieldKind::String { min: 0, max: 1000 }).sanitized())
}

#[derive(Debug, Deserialize)]
struct TransactionInput {
    kind: String,
    amount: i64,
    category: String,
    note: Option<String>,
}

/// GET /api/transactions - the school's income/expense ledger.
pub async fn list(
    Extension(user): Extension<SessionUser>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<Transaction>> {
    authz::require(&user, Action::ViewTransactions)?;

    let pool = DatabaseManager::pool().await?;
    let transactions = Repository::<Transaction>::new("transactions", pool)
        .list(&user.school_id, query.limit(), query.offset())
        .await?;
    Ok(ApiResponse::success(transactions))
}

/// POST /api/transactions - record a manual ledger entry. Entries
/// derived from payments are written by the payment verify flow, not
/// here.
pub async fn create(
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<Value>,
) -> ApiResult<Transaction> {
    authz::require(&user, Action::RecordTransactions)?;
    let input: TransactionInput = validated(&transaction_schema(), &payload)?;

    let pool = DatabaseManager::pool().await?;
    let transaction: Transaction = sqlx::query_as(
        "INSERT INTO transactions (id, school_id, kind, amount_minor, category, note) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
    )
    .bind(ObjectId::new())
    .bind(&user.school_id)
    .bind(&input.kind)
    .bind(input.amount)
    .bind(&input.category)
    .bind(&input.note)
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::created(transaction))
}
