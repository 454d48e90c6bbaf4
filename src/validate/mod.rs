// Declarative request-payload validation.
//
// Handlers declare a `Schema` (field name -> rule) and get back either
// the coerced object or a structured list of field-level errors. No
// persistence call happens on failure; handlers convert
// `ValidationErrors` into a 400 via `ApiError`.

pub mod sanitize;

use chrono::DateTime;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::ObjectId;

pub use sanitize::sanitize_html;

/// One field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Non-empty list of field errors from a failed validation.
#[derive(Debug, thiserror::Error)]
#[error("request validation failed ({} field errors)", .0.len())]
pub struct ValidationErrors(pub Vec<FieldError>);

/// Expected type/format for a single field.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// UTF-8 string, trimmed, with inclusive length bounds.
    String { min: usize, max: usize },
    /// String that must look like an email address.
    Email,
    /// Integer; numeric strings are coerced.
    Int { min: i64, max: i64 },
    /// Floating point number; numeric strings are coerced.
    Number,
    /// Boolean; "true"/"false" strings are coerced.
    Bool,
    /// 24-character hex identifier, normalized to lowercase.
    ObjectId,
    /// String restricted to an enumerated set.
    Enum(&'static [&'static str]),
    /// RFC 3339 timestamp string.
    DateTime,
    /// JSON array, passed through as-is.
    Array,
}

#[derive(Debug, Clone)]
pub struct FieldRule {
    name: &'static str,
    kind: FieldKind,
    required: bool,
    sanitize: bool,
}

impl FieldRule {
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind, required: false, sanitize: false }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Strip unsafe HTML from this free-text field before persistence.
    pub fn sanitized(mut self) -> Self {
        self.sanitize = true;
        self
    }
}

/// Declarative schema: an ordered list of field rules. Unknown payload
/// fields are dropped rather than rejected.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    rules: Vec<FieldRule>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Validate and coerce a JSON payload against this schema.
    pub fn validate(&self, payload: &Value) -> Result<Map<String, Value>, ValidationErrors> {
        let object = match payload.as_object() {
            Some(object) => object,
            None => {
                return Err(ValidationErrors(vec![FieldError {
                    field: "$".to_string(),
                    message: "Expected a JSON object".to_string(),
                }]))
            }
        };

        let mut coerced = Map::new();
        let mut errors = Vec::new();

        for rule in &self.rules {
            let value = object.get(rule.name).filter(|v| !v.is_null());

            let value = match value {
                Some(value) => value,
                None => {
                    if rule.required {
                        errors.push(FieldError {
                            field: rule.name.to_string(),
                            message: "This field is required".to_string(),
                        });
                    }
                    continue;
                }
            };

            match coerce(rule, value) {
                Ok(value) => {
                    coerced.insert(rule.name.to_string(), value);
                }
                Err(message) => {
                    errors.push(FieldError { field: rule.name.to_string(), message });
                }
            }
        }

        if errors.is_empty() {
            Ok(coerced)
        } else {
            Err(ValidationErrors(errors))
        }
    }
}

fn coerce(rule: &FieldRule, value: &Value) -> Result<Value, String> {
    match &rule.kind {
        FieldKind::String { min, max } => {
            let s = value.as_str().ok_or("Expected a string")?.trim();
            if s.len() < *min {
                return Err(format!("Must be at least {} characters", min));
            }
            if s.len() > *max {
                return Err(format!("Must be at most {} characters", max));
            }
            let s = if rule.sanitize { sanitize_html(s) } else { s.to_string() };
            Ok(Value::String(s))
        }
        FieldKind::Email => {
            let s = value.as_str().ok_or("Expected a string")?.trim();
            if !looks_like_email(s) {
                return Err("Must be a valid email address".to_string());
            }
            Ok(Value::String(s.to_ascii_lowercase()))
        }
        FieldKind::Int { min, max } => {
            let n = match value {
                Value::Number(n) => n.as_i64().ok_or("Must be an integer")?,
                Value::String(s) => s.trim().parse::<i64>().map_err(|_| "Must be an integer")?,
                _ => return Err("Must be an integer".to_string()),
            };
            if n < *min || n > *max {
                return Err(format!("Must be between {} and {}", min, max));
            }
            Ok(Value::from(n))
        }
        FieldKind::Number => {
            let n = match value {
                Value::Number(n) => n.as_f64().ok_or("Must be a number")?,
                Value::String(s) => s.trim().parse::<f64>().map_err(|_| "Must be a number")?,
                _ => return Err("Must be a number".to_string()),
            };
            if !n.is_finite() {
                return Err("Must be a finite number".to_string());
            }
            Ok(Value::from(n))
        }
        FieldKind::Bool => match value {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::String(s) => match s.trim() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err("Must be a boolean".to_string()),
            },
            _ => Err("Must be a boolean".to_string()),
        },
        FieldKind::ObjectId => {
            let s = value.as_str().ok_or("Expected an identifier string")?;
            let id = ObjectId::parse(s).ok_or("Must be a 24-character hex identifier")?;
            Ok(Value::String(id.to_string()))
        }
        FieldKind::Enum(allowed) => {
            let s = value.as_str().ok_or("Expected a string")?;
            if allowed.contains(&s) {
                Ok(Value::String(s.to_string()))
            } else {
                Err(format!("Must be one of: {}", allowed.join(", ")))
            }
        }
        FieldKind::DateTime => {
            let s = value.as_str().ok_or("Expected a timestamp string")?;
            DateTime::parse_from_rfc3339(s).map_err(|_| "Must be an RFC 3339 timestamp")?;
            Ok(Value::String(s.to_string()))
        }
        FieldKind::Array => {
            if value.is_array() {
                Ok(value.clone())
            } else {
                Err("Expected an array".to_string())
            }
        }
    }
}

fn looks_like_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !s.contains(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn student_schema() -> Schema {
        Schema::new()
            .field(FieldRule::new("name", FieldKind::String { min: 1, max: 80 }).required())
            .field(FieldRule::new("email", FieldKind::Email).required())
            .field(FieldRule::new("class_id", FieldKind::ObjectId).required())
            .field(FieldRule::new("roll_number", FieldKind::Int { min: 1, max: 10_000 }))
            .field(FieldRule::new("bio", FieldKind::String { min: 0, max: 500 }).sanitized())
    }

    #[test]
    fn valid_payload_is_coerced() {
        let payload = json!({
            "name": "  Asha Rao  ",
            "email": "Asha@Example.org",
            "class_id": "507f1f77bcf86cd799439011",
            "roll_number": "42",
            "ignored": "dropped"
        });
        let coerced = student_schema().validate(&payload).unwrap();
        assert_eq!(coerced["name"], "Asha Rao");
        assert_eq!(coerced["email"], "asha@example.org");
        assert_eq!(coerced["roll_number"], 42);
        assert!(coerced.get("ignored").is_none());
    }

    #[test]
    fn failing_payload_returns_field_errors() {
        let payload = json!({
            "email": "not-an-email",
            "class_id": "xyz",
            "roll_number": 0
        });
        let errors = student_schema().validate(&payload).unwrap_err();
        let fields: Vec<&str> = errors.0.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"name"));
        assert!(fields.contains(&"email"));
        assert!(fields.contains(&"class_id"));
        assert!(fields.contains(&"roll_number"));
        assert!(!errors.0.is_empty());
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let errors = student_schema().validate(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(errors.0[0].field, "$");
    }

    #[test]
    fn sanitized_field_strips_unsafe_html() {
        let payload = json!({
            "name": "A",
            "email": "a@example.org",
            "class_id": "507f1f77bcf86cd799439011",
            "bio": "hi <script>alert(1)</script> there"
        });
        let coerced = student_schema().validate(&payload).unwrap();
        assert_eq!(coerced["bio"], "hi  there");
    }

    #[test]
    fn enum_membership_is_enforced() {
        let schema = Schema::new()
            .field(FieldRule::new("status", FieldKind::Enum(&["pending", "completed", "failed"])).required());
        assert!(schema.validate(&json!({"status": "completed"})).is_ok());
        assert!(schema.validate(&json!({"status": "done"})).is_err());
    }

    #[test]
    fn bool_and_datetime_coercion() {
        let schema = Schema::new()
            .field(FieldRule::new("active", FieldKind::Bool).required())
            .field(FieldRule::new("starts_at", FieldKind::DateTime).required());
        let coerced = schema
            .validate(&json!({"active": "true", "starts_at": "2026-08-24T09:00:00Z"}))
            .unwrap();
        assert_eq!(coerced["active"], true);
        assert!(schema.validate(&json!({"active": "yes", "starts_at": "tomorrow"})).is_err());
    }
}
