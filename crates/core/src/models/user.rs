//! User accounts.

use serde::{Deserialize, Serialize};

use crate::types::{Email, Role, UserId};

/// A marketplace account as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", alias = "id")]
    pub id: UserId,
    #[serde(alias = "name")]
    pub fullname: String,
    pub email: Email,
    pub role: Role,
}

impl User {
    /// Whether the account has the given role.
    #[must_use]
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}

/// Payload for creating an account (signup or admin create).
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub fullname: String,
    pub email: Email,
    pub password: String,
    pub role: Role,
}

/// Compact user reference embedded in orders and feedback.
///
/// The backend either populates the reference or sends the bare id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    Populated(UserSummary),
    Id(UserId),
}

impl UserRef {
    /// Identifier of the referenced user.
    #[must_use]
    pub const fn id(&self) -> &UserId {
        match self {
            Self::Populated(summary) => &summary.id,
            Self::Id(id) => id,
        }
    }

    /// Display name when the reference is populated.
    #[must_use]
    pub fn fullname(&self) -> Option<&str> {
        match self {
            Self::Populated(summary) => summary.fullname.as_deref(),
            Self::Id(_) => None,
        }
    }
}

/// Populated user fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub fullname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_user() {
        let user: User = serde_json::from_value(json!({
            "_id": "u1",
            "fullname": "Salma Idrissi",
            "email": "salma@example.com",
            "role": "user"
        }))
        .unwrap();

        assert_eq!(user.id.as_str(), "u1");
        assert!(user.has_role(Role::Shopper));
    }

    #[test]
    fn test_user_ref_accepts_id_or_object() {
        let bare: UserRef = serde_json::from_value(json!("u1")).unwrap();
        assert_eq!(bare.id().as_str(), "u1");
        assert_eq!(bare.fullname(), None);

        let populated: UserRef = serde_json::from_value(json!({
            "_id": "u2",
            "fullname": "Omar",
            "email": "omar@example.com"
        }))
        .unwrap();
        assert_eq!(populated.id().as_str(), "u2");
        assert_eq!(populated.fullname(), Some("Omar"));
    }
}
