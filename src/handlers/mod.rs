// Resource handlers. Every handler runs the same pipeline: the route
// group's rate-limit and session middleware have already run; the
// handler itself applies the authorization gate, validates and
// sanitizes input, performs the persistence calls, and returns an
// `ApiResult` that the response/error envelopes shape.

pub mod ai;
pub mod auth;
pub mod payment;
pub mod records;
pub mod students;
pub mod teachers;
pub mod timetables;
pub mod transactions;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::validate::Schema;

/// Validate `payload` against `schema` and extract the coerced object
/// into a typed input struct.
pub(crate) fn validated<T: DeserializeOwned>(schema: &Schema, payload: &Value) -> Result<T, ApiError> {
    let coerced: Map<String, Value> = schema.validate(payload)?;
    serde_json::from_value(Value::Object(coerced)).map_err(|e| {
        tracing::debug!("coerced payload did not match input shape: {}", e);
        ApiError::bad_request("Request body does not match the expected shape")
    })
}

/// Standard pagination query for list endpoints.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(50)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0)
    }
}
