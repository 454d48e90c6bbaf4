use axum::{extract::Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::authz::{self, Action};
use crate::config;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, SessionUser};
use crate::models::{Payment, PaymentStatus};
use crate::payment::{generate_receipt, verify_signature, HttpPaymentGateway, PaymentGateway};
use crate::types::ObjectId;
use crate::validate::{FieldKind, FieldRule, Schema};

use super::validated;

fn initiate_schema() -> Schema {
    Schema::new()
        .field(FieldRule::new("student_id", FieldKind::ObjectId).required())
        .field(FieldRule::new("amount", FieldKind::Int { min: 100, max: 100_000_000 }).required())
        .field(FieldRule::new("purpose", FieldKind::String { min: 1, max: 200 }).required())
}

#[derive(Debug, Deserialize)]
struct InitiateInput {
    student_id: ObjectId,
    /// Minor units (paise)
    amount: i64,
    purpose: String,
}

/// POST /api/payment/initiate - create a gateway order and a pending
/// payment record.
pub async fn initiate(
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<Value>,
) -> ApiResult<Value> {
    authz::require(&user, Action::InitiatePayment)?;
    let input: InitiateInput = validated(&initiate_schema(), &payload)?;

    let receipt = generate_receipt();
    let gateway = HttpPaymentGateway::new();
    let order = gateway
        .create_order(input.amount, "INR", &receipt)
        .await
        .map_err(|e| ApiError::upstream("payment", e))?;

    let pool = DatabaseManager::pool().await?;
    let payment_id = ObjectId::new();
    sqlx::query(
        "INSERT INTO payments \
         (id, school_id, student_id, order_id, amount_minor, currency, purpose, receipt, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(&payment_id)
    .bind(&user.school_id)
    .bind(&input.student_id)
    .bind(&order.id)
    .bind(input.amount)
    .bind(&order.currency)
    .bind(&input.purpose)
    .bind(&receipt)
    .bind(PaymentStatus::Pending.as_str())
    .execute(&pool)
    .await?;

    Ok(ApiResponse::created(json!({
        "payment_id": payment_id,
        "order_id": order.id,
        "amount": order.amount,
        "currency": order.currency,
        "receipt": receipt,
        "key_id": config::config().payment.key_id,
    })))
}

fn verify_schema() -> Schema {
    Schema::new()
        .field(FieldRule::new("order_id", FieldKind::String { min: 1, max: 100 }).required())
        .field(FieldRule::new("payment_id", FieldKind::String { min: 1, max: 100 }).required())
        .field(FieldRule::new("signature", FieldKind::String { min: 1, max: 200 }).required())
}

#[derive(Debug, Deserialize)]
struct VerifyInput {
    order_id: String,
    payment_id: String,
    signature: String,
}

/// POST /api/payment/verify - check the gateway signature and settle
/// the payment record.
///
/// On a valid signature the status change and the income ledger entry
/// commit atomically; on mismatch the payment is marked failed and no
/// ledger row is written.
pub async fn verify(
    Extension(user): Extension<SessionUser>,
    Json(payload): Json<Value>,
) -> ApiResult<Value> {
    authz::require(&user, Action::VerifyPayment)?;
    let input: VerifyInput = validated(&verify_schema(), &payload)?;

    let pool = DatabaseManager::pool().await?;
    let payment: Option<Payment> =
        sqlx::query_as("SELECT * FROM payments WHERE school_id = $1 AND order_id = $2")
            .bind(&user.school_id)
            .bind(&input.order_id)
            .fetch_optional(&pool)
            .await?;

    let payment = payment.ok_or_else(|| ApiError::not_found("Payment not found for this order"))?;

    if payment.status == PaymentStatus::Completed {
        return Err(ApiError::conflict("Payment is already completed"));
    }

    let secret = &config::config().payment.key_secret;
    if !verify_signature(&input.order_id, &input.payment_id, &input.signature, secret) {
        sqlx::query("UPDATE payments SET status = $1, updated_at = now() WHERE id = $2")
            .bind(PaymentStatus::Failed.as_str())
            .bind(&payment.id)
            .execute(&pool)
            .await?;

        tracing::warn!(payment = %payment.id, "payment signature mismatch");
        return Err(ApiError::bad_request("Payment signature verification failed"));
    }

    let mut tx = pool.begin().await?;

    sqlx::query(
        "UPDATE payments SET status = $1, gateway_payment_id = $2, updated_at = now() WHERE id = $3",
    )
    .bind(PaymentStatus::Completed.as_str())
    .bind(&input.payment_id)
    .bind(&payment.id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO transactions (id, school_id, kind, amount_minor, category, reference_id, note) \
         VALUES ($1, $2, 'income', $3, $4, $5, $6)",
    )
    .bind(ObjectId::new())
    .bind(&user.school_id)
    .bind(payment.amount_minor)
    .bind(&payment.purpose)
    .bind(&payment.id)
    .bind(format!("Payment {} via gateway order {}", payment.receipt, payment.order_id))
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(ApiResponse::success(json!({
        "payment_id": payment.id,
        "status": PaymentStatus::Completed,
        "receipt": payment.receipt,
    })))
}
