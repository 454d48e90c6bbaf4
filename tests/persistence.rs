// Persistence-backed tests for the transitions that only a real
// database can exercise: the duplicate timetable-entry conflict and
// the payment settle/fail paths. They need DATABASE_URL pointing at a
// Postgres instance and pass trivially (with a note) when it is not
// set. The schema is applied idempotently on first use.

use anyhow::Result;
use axum::extract::{Extension, Json};
use axum::http::StatusCode;
use serde_json::json;
use sqlx::PgPool;

use campus_api::config;
use campus_api::database::DatabaseManager;
use campus_api::handlers::{payment, timetables};
use campus_api::middleware::SessionUser;
use campus_api::payment::compute_signature;
use campus_api::types::{ObjectId, Role};

async fn test_pool() -> Result<Option<PgPool>> {
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("skipping: DATABASE_URL is not set");
        return Ok(None);
    }

    let pool = DatabaseManager::pool().await?;
    for statement in include_str!("../sql/schema.sql").split(';') {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        // Errors mean the schema is already in place
        let _ = sqlx::query(statement).execute(&pool).await;
    }
    Ok(Some(pool))
}

async fn seed_school(pool: &PgPool) -> Result<ObjectId> {
    let school_id = ObjectId::new();
    sqlx::query("INSERT INTO schools (id, name, email) VALUES ($1, $2, $3)")
        .bind(&school_id)
        .bind("Test School")
        .bind(format!("{}@example.org", ObjectId::new()))
        .execute(pool)
        .await?;
    Ok(school_id)
}

async fn seed_student(pool: &PgPool, school_id: &ObjectId) -> Result<ObjectId> {
    let student_id = ObjectId::new();
    sqlx::query(
        "INSERT INTO users (id, school_id, name, email, password_hash, password_salt, role) \
         VALUES ($1, $2, $3, $4, $5, $6, 'student')",
    )
    .bind(&student_id)
    .bind(school_id)
    .bind("Asha Rao")
    .bind(format!("{}@example.org", ObjectId::new()))
    .bind("hash")
    .bind("salt")
    .execute(pool)
    .await?;
    Ok(student_id)
}

async fn seed_pending_payment(
    pool: &PgPool,
    school_id: &ObjectId,
    student_id: &ObjectId,
    order_id: &str,
) -> Result<ObjectId> {
    let payment_id = ObjectId::new();
    sqlx::query(
        "INSERT INTO payments \
         (id, school_id, student_id, order_id, amount_minor, purpose, receipt, status) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending')",
    )
    .bind(&payment_id)
    .bind(school_id)
    .bind(student_id)
    .bind(order_id)
    .bind(50_000_i64)
    .bind("Term fees")
    .bind(format!("RCPT-{}", ObjectId::new()))
    .execute(pool)
    .await?;
    Ok(payment_id)
}

fn session(school_id: &ObjectId, user_id: ObjectId, role: Role) -> SessionUser {
    SessionUser {
        user_id,
        school_id: school_id.clone(),
        role,
        name: "test".to_string(),
    }
}

#[tokio::test]
async fn duplicate_timetable_entry_returns_conflict() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };

    let school_id = seed_school(&pool).await?;
    let class_id = ObjectId::new();
    sqlx::query("INSERT INTO classes (id, school_id, name, grade) VALUES ($1, $2, $3, $4)")
        .bind(&class_id)
        .bind(&school_id)
        .bind("5A")
        .bind(5)
        .execute(&pool)
        .await?;
    let subject_id = ObjectId::new();
    sqlx::query("INSERT INTO subjects (id, school_id, class_id, name) VALUES ($1, $2, $3, $4)")
        .bind(&subject_id)
        .bind(&school_id)
        .bind(&class_id)
        .bind("Mathematics")
        .execute(&pool)
        .await?;

    let admin = session(&school_id, ObjectId::new(), Role::SubAdmin);

    let created = timetables::create(
        Extension(admin.clone()),
        Json(json!({
            "class_id": class_id,
            "name": "Week A",
            "entries": [{
                "day": "monday",
                "period_number": 1,
                "subject_id": subject_id,
            }],
        })),
    )
    .await
    .expect("timetable with one inline entry");
    let timetable_id = created.data["id"].as_str().expect("timetable id").to_string();

    // Same (timetable, day, period) again
    let err = timetables::entries_create(
        Extension(admin),
        Json(json!({
            "timetable_id": timetable_id,
            "day": "monday",
            "period_number": 1,
            "subject_id": subject_id,
        })),
    )
    .await
    .expect_err("second entry for the same slot");

    assert_eq!(err.status_code(), StatusCode::CONFLICT);
    assert_eq!(err.error_code(), "DUPLICATE_KEY");
    Ok(())
}

#[tokio::test]
async fn signature_mismatch_marks_payment_failed_without_ledger_row() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };

    let school_id = seed_school(&pool).await?;
    let student_id = seed_student(&pool, &school_id).await?;
    let order_id = format!("order_{}", ObjectId::new());
    let payment_id = seed_pending_payment(&pool, &school_id, &student_id, &order_id).await?;

    let err = payment::verify(
        Extension(session(&school_id, student_id, Role::Student)),
        Json(json!({
            "order_id": order_id,
            "payment_id": "pay_bogus",
            "signature": "00ff00ff",
        })),
    )
    .await
    .expect_err("bogus signature");
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

    let status: String = sqlx::query_scalar("SELECT status FROM payments WHERE id = $1")
        .bind(&payment_id)
        .fetch_one(&pool)
        .await?;
    assert_eq!(status, "failed");

    // No income row was written for the failed payment
    let ledger_rows: i64 = sqlx::query_scalar(
        "SELECT count(*) FROM transactions WHERE school_id = $1 AND reference_id = $2",
    )
    .bind(&school_id)
    .bind(&payment_id)
    .fetch_one(&pool)
    .await?;
    assert_eq!(ledger_rows, 0);
    Ok(())
}

#[tokio::test]
async fn matching_signature_settles_payment_and_writes_ledger_row() -> Result<()> {
    let Some(pool) = test_pool().await? else {
        return Ok(());
    };

    let school_id = seed_school(&pool).await?;
    let student_id = seed_student(&pool, &school_id).await?;
    let order_id = format!("order_{}", ObjectId::new());
    let payment_id = seed_pending_payment(&pool, &school_id, &student_id, &order_id).await?;

    let secret = &config::config().payment.key_secret;
    let signature = compute_signature(&order_id, "pay_real", secret);

    let response = payment::verify(
        Extension(session(&school_id, student_id, Role::Student)),
        Json(json!({
            "order_id": order_id,
            "payment_id": "pay_real",
            "signature": signature,
        })),
    )
    .await
    .expect("valid signature settles the payment");
    assert_eq!(response.data["status"], "completed");

    let status: String = sqlx::query_scalar("SELECT status FROM payments WHERE id = $1")
        .bind(&payment_id)
        .fetch_one(&pool)
        .await?;
    assert_eq!(status, "completed");

    let ledger_rows: i64 = sqlx::query_scalar(
        "SELECT count(*) FROM transactions \
         WHERE school_id = $1 AND reference_id = $2 AND kind = 'income'",
    )
    .bind(&school_id)
    .bind(&payment_id)
    .fetch_one(&pool)
    .await?;
    assert_eq!(ledger_rows, 1);
    Ok(())
}
