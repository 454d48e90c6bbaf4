// Record types for the school document collections, stored as flat
// rows with TEXT identifiers. Every record except School carries the
// owning tenant in `school_id`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;

use crate::types::{ObjectId, Role};

macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl TryFrom<String> for $name {
            type Error = String;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                match value.as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!(concat!("unknown ", stringify!($name), ": {}"), other)),
                }
            }
        }
    };
}

text_enum!(PaymentStatus {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
});

text_enum!(TransactionKind {
    Income => "income",
    Expense => "expense",
});

text_enum!(SubmissionStatus {
    Submitted => "submitted",
    Graded => "graded",
});

text_enum!(Weekday {
    Monday => "monday",
    Tuesday => "tuesday",
    Wednesday => "wednesday",
    Thursday => "thursday",
    Friday => "friday",
    Saturday => "saturday",
    Sunday => "sunday",
});

pub const WEEKDAYS: &[&str] = &[
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
];

/// Tenant root; every other record references an owning school.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct School {
    pub id: ObjectId,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: ObjectId,
    pub school_id: ObjectId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub password_salt: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    /// Set for students; the class they are enrolled in.
    pub class_id: Option<ObjectId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Class {
    pub id: ObjectId,
    pub school_id: ObjectId,
    pub name: String,
    pub grade: i32,
    pub section: Option<String>,
    pub class_teacher_id: Option<ObjectId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Subject {
    pub id: ObjectId,
    pub school_id: ObjectId,
    pub class_id: ObjectId,
    pub name: String,
    pub code: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Assignment {
    pub id: ObjectId,
    pub school_id: ObjectId,
    pub class_id: ObjectId,
    pub subject_id: ObjectId,
    pub teacher_id: ObjectId,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Test {
    pub id: ObjectId,
    pub school_id: ObjectId,
    pub class_id: ObjectId,
    pub subject_id: ObjectId,
    pub title: String,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub duration_minutes: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Question {
    pub id: ObjectId,
    pub school_id: ObjectId,
    pub test_id: ObjectId,
    pub prompt: String,
    pub options: Json<Vec<String>>,
    pub correct_index: i32,
    pub marks: i32,
    pub created_at: DateTime<Utc>,
}

/// A student's answer set for a Test or Assignment, gradable by a teacher.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Submission {
    pub id: ObjectId,
    pub school_id: ObjectId,
    pub student_id: ObjectId,
    pub test_id: Option<ObjectId>,
    pub assignment_id: Option<ObjectId>,
    pub answers: Json<Value>,
    #[sqlx(try_from = "String")]
    pub status: SubmissionStatus,
    pub score: Option<i32>,
    pub graded_by: Option<ObjectId>,
    pub created_at: DateTime<Utc>,
}

/// Amounts are integer minor units (paise/cents).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Payment {
    pub id: ObjectId,
    pub school_id: ObjectId,
    pub student_id: ObjectId,
    pub order_id: String,
    pub gateway_payment_id: Option<String>,
    pub amount_minor: i64,
    pub currency: String,
    pub purpose: String,
    pub receipt: String,
    #[sqlx(try_from = "String")]
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Income/expense ledger entry. Completed payments write an income row
/// referencing the payment record.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: ObjectId,
    pub school_id: ObjectId,
    #[sqlx(try_from = "String")]
    pub kind: TransactionKind,
    pub amount_minor: i64,
    pub category: String,
    pub reference_id: Option<ObjectId>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Timetable {
    pub id: ObjectId,
    pub school_id: ObjectId,
    pub class_id: ObjectId,
    pub name: String,
    pub effective_from: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Unique per `(timetable_id, day, period_number)`.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TimetableEntry {
    pub id: ObjectId,
    pub school_id: ObjectId,
    pub timetable_id: ObjectId,
    #[sqlx(try_from = "String")]
    pub day: Weekday,
    pub period_number: i32,
    pub subject_id: ObjectId,
    pub teacher_id: Option<ObjectId>,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Event {
    pub id: ObjectId,
    pub school_id: ObjectId,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Post {
    pub id: ObjectId,
    pub school_id: ObjectId,
    pub author_id: ObjectId,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Notification {
    pub id: ObjectId,
    pub school_id: ObjectId,
    pub user_id: ObjectId,
    pub title: String,
    pub body: Option<String>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Message {
    pub id: ObjectId,
    pub school_id: ObjectId,
    pub sender_id: ObjectId,
    pub recipient_id: ObjectId,
    pub body: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Feedback {
    pub id: ObjectId,
    pub school_id: ObjectId,
    pub author_id: ObjectId,
    pub body: String,
    pub rating: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LessonPlan {
    pub id: ObjectId,
    pub school_id: ObjectId,
    pub teacher_id: ObjectId,
    pub subject_id: ObjectId,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Expense {
    pub id: ObjectId,
    pub school_id: ObjectId,
    pub category: String,
    pub amount_minor: i64,
    pub note: Option<String>,
    pub incurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FeeStructure {
    pub id: ObjectId,
    pub school_id: ObjectId,
    pub class_id: ObjectId,
    pub name: String,
    pub amount_minor: i64,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AcademicConfig {
    pub id: ObjectId,
    pub school_id: ObjectId,
    pub academic_year: String,
    pub term: Option<String>,
    pub grading_scale: Json<Value>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_status_round_trips() {
        for status in [PaymentStatus::Pending, PaymentStatus::Completed, PaymentStatus::Failed] {
            assert_eq!(PaymentStatus::try_from(status.as_str().to_string()).unwrap(), status);
        }
        assert!(PaymentStatus::try_from("refunded".to_string()).is_err());
    }

    #[test]
    fn weekday_list_matches_enum() {
        for day in WEEKDAYS {
            assert!(Weekday::try_from(day.to_string()).is_ok());
        }
        assert!(Weekday::try_from("funday".to_string()).is_err());
    }
}
