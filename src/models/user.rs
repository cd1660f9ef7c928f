use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::hex_id;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account document (collection `users`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    /// bcrypt hash
    pub password: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// What the API exposes about the authenticated user
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub created_at: i64,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        UserInfo {
            id: hex_id(&user.id),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            avatar: user.avatar.clone(),
            created_at: user.created_at,
        }
    }
}

/// A populated user reference; only the selected public fields are filled
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl UserSummary {
    /// name + avatar
    pub fn public(user: &User) -> Self {
        UserSummary {
            id: hex_id(&user.id),
            name: user.name.clone(),
            email: None,
            avatar: user.avatar.clone(),
        }
    }

    /// name + email
    pub fn contact(user: &User) -> Self {
        UserSummary {
            id: hex_id(&user.id),
            name: user.name.clone(),
            email: Some(user.email.clone()),
            avatar: None,
        }
    }

    /// name + email + avatar
    pub fn full(user: &User) -> Self {
        UserSummary {
            id: hex_id(&user.id),
            name: user.name.clone(),
            email: Some(user.email.clone()),
            avatar: user.avatar.clone(),
        }
    }
}

/// A user reference in a response: populated when the user still exists, bare id otherwise
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum UserRef {
    Populated(UserSummary),
    Id(String),
}

impl UserRef {
    pub fn id(id: &ObjectId) -> Self {
        UserRef::Id(id.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Some(ObjectId::new()),
            name: "Asha".into(),
            email: "asha@example.com".into(),
            password: "$2b$04$hash".into(),
            role: Role::Admin,
            avatar: Some("https://img/asha.png".into()),
            created_at: 1,
            updated_at: 1,
        }
    }

    #[test]
    fn test_user_info_never_contains_password() {
        let info = UserInfo::from(&sample_user());
        let json = serde_json::to_value(&info).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["role"], "admin");
    }

    #[test]
    fn test_summary_field_selection() {
        let user = sample_user();
        let public = serde_json::to_value(UserSummary::public(&user)).unwrap();
        assert!(public.get("email").is_none());
        assert_eq!(public["avatar"], "https://img/asha.png");

        let contact = serde_json::to_value(UserSummary::contact(&user)).unwrap();
        assert_eq!(contact["email"], "asha@example.com");
        assert!(contact.get("avatar").is_none());
    }

    #[test]
    fn test_role_defaults_to_user() {
        let doc = mongodb::bson::doc! {
            "name": "N", "email": "n@x.io", "password": "h", "created_at": 0_i64, "updated_at": 0_i64
        };
        let user: User = mongodb::bson::from_document(doc).unwrap();
        assert_eq!(user.role, Role::User);
    }
}
