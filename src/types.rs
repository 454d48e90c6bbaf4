/// Shared types used across the codebase

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 24-character hex record identifier, stored as TEXT.
///
/// Records keep the document-store identifier format for primary and
/// foreign keys. New ids embed a second-resolution timestamp prefix so
/// they sort roughly by creation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new() -> Self {
        let ts = Utc::now().timestamp() as u32;
        let entropy = Uuid::new_v4();
        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&ts.to_be_bytes());
        bytes[4..].copy_from_slice(&entropy.as_bytes()[..8]);
        Self(hex::encode(bytes))
    }

    /// True for exactly 24 hex characters (either case).
    pub fn is_valid(s: &str) -> bool {
        s.len() == 24 && s.bytes().all(|b| b.is_ascii_hexdigit())
    }

    pub fn parse(s: &str) -> Option<Self> {
        if Self::is_valid(s) {
            Some(Self(s.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ObjectId {
    type Err = InvalidObjectId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| InvalidObjectId(s.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid identifier: {0}")]
pub struct InvalidObjectId(pub String);

/// Platform roles. No hierarchy; each role maps to an explicit
/// capability set in `authz`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    SuperAdmin,
    SubAdmin,
    Teacher,
    Student,
    Parent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super-admin",
            Role::SubAdmin => "sub-admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
            Role::Parent => "parent",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "super-admin" => Ok(Role::SuperAdmin),
            "sub-admin" => Ok(Role::SubAdmin),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            "parent" => Ok(Role::Parent),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_id_generation_is_valid() {
        let id = ObjectId::new();
        assert!(ObjectId::is_valid(id.as_str()));
        assert_eq!(id.as_str().len(), 24);
    }

    #[test]
    fn object_id_rejects_wrong_length() {
        assert!(!ObjectId::is_valid(""));
        assert!(!ObjectId::is_valid("abc123"));
        assert!(!ObjectId::is_valid("507f1f77bcf86cd79943901")); // 23 chars
        assert!(!ObjectId::is_valid("507f1f77bcf86cd7994390111")); // 25 chars
    }

    #[test]
    fn object_id_rejects_non_hex() {
        assert!(!ObjectId::is_valid("507f1f77bcf86cd79943901g"));
        assert!(!ObjectId::is_valid("zzzzzzzzzzzzzzzzzzzzzzzz"));
    }

    #[test]
    fn object_id_accepts_valid_hex() {
        assert!(ObjectId::is_valid("507f1f77bcf86cd799439011"));
        assert!(ObjectId::is_valid("507F1F77BCF86CD799439011"));
    }

    #[test]
    fn role_round_trips() {
        for role in [Role::SuperAdmin, Role::SubAdmin, Role::Teacher, Role::Student, Role::Parent] {
            assert_eq!(Role::try_from(role.as_str().to_string()).unwrap(), role);
        }
        assert!(Role::try_from("principal".to_string()).is_err());
    }
}
