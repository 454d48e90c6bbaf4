use axum::{
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::middleware::{
    classified_rate_limit_middleware, request_id_middleware, session_auth_middleware,
};

/// The full application router with the pipeline layers applied:
/// request-id stamping and rate limiting wrap everything; the session
/// authenticator guards `/api/*`.
pub fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(public_auth_routes())
        // Protected API
        .merge(api_routes())
        // Global middleware (bottom runs first)
        .layer(axum::middleware::from_fn(classified_rate_limit_middleware))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn public_auth_routes() -> Router {
    use axum::routing::delete;
    use handlers::auth;

    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/session", delete(auth::logout))
}

fn api_routes() -> Router {
    use axum::routing::{delete, put};
    use handlers::{ai, auth, payment, records, students, teachers, timetables, transactions};

    Router::new()
        .route("/api/auth/whoami", get(auth::whoami))
        // Payments
        .route("/api/payment/initiate", post(payment::initiate))
        .route("/api/payment/verify", post(payment::verify))
        // Timetables (the static /entries segment takes precedence
        // over /:id)
        .route("/api/timetables", get(timetables::list).post(timetables::create))
        .route(
            "/api/timetables/entries",
            get(timetables::entries_list).post(timetables::entries_create),
        )
        .route(
            "/api/timetables/entries/:id",
            get(timetables::entry_get)
                .put(timetables::entry_update)
                .delete(timetables::entry_delete),
        )
        .route(
            "/api/timetables/:id",
            get(timetables::get)
                .put(timetables::update)
                .delete(timetables::delete),
        )
        // Students
        .route("/api/students", get(students::list).post(students::create))
        .route("/api/students/:id", get(students::get))
        .route(
            "/api/students/:id/submissions",
            get(students::submissions_list).post(students::submissions_create),
        )
        // Teachers
        .route("/api/teachers", get(teachers::list).post(teachers::create))
        .route("/api/teachers/:id", put(teachers::update))
        .route(
            "/api/teachers/:id/assignments",
            get(teachers::assignments_list).post(teachers::assignments_create),
        )
        // Ledger and finance
        .route("/api/transactions", get(transactions::list).post(transactions::create))
        .route("/api/expenses", get(records::expenses_list).post(records::expenses_create))
        .route(
            "/api/fee-structures",
            get(records::fee_structures_list).post(records::fee_structures_create),
        )
        // School content
        .route("/api/events", get(records::events_list).post(records::events_create))
        .route("/api/posts", get(records::posts_list).post(records::posts_create))
        .route(
            "/api/notifications",
            get(records::notifications_list).post(records::notifications_create),
        )
        .route("/api/messages", get(records::messages_list).post(records::messages_create))
        .route("/api/feedback", get(records::feedback_list).post(records::feedback_create))
        .route(
            "/api/academic-config",
            get(records::academic_config_list).post(records::academic_config_create),
        )
        // AI helpers
        .route("/api/ai/lesson-plan", post(ai::lesson_plan))
        .route("/api/ai/flashcards", post(ai::flashcards))
        .route("/api/ai/questions", post(ai::questions))
        .route("/api/ai/timetable", post(ai::timetable))
        .route_layer(axum::middleware::from_fn(session_auth_middleware))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "Campus API",
            "version": version,
            "description": "Multi-tenant school management API",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "auth": "/auth/login, /auth/session (public), /api/auth/whoami (protected)",
                "payments": "/api/payment/initiate, /api/payment/verify (protected)",
                "timetables": "/api/timetables[/:id], /api/timetables/entries[/:id] (protected)",
                "students": "/api/students[/:id][/submissions] (protected)",
                "teachers": "/api/teachers[/:id][/assignments] (protected)",
                "transactions": "/api/transactions (protected)",
                "finance": "/api/expenses, /api/fee-structures (protected)",
                "content": "/api/events, /api/posts, /api/notifications, /api/messages, /api/feedback, /api/academic-config (protected)",
                "ai": "/api/ai/* (protected)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match crate::database::DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
