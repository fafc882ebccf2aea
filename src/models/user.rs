//! User model for storage and API.

use serde::{Deserialize, Deserializer, Serialize};
use validator::Validate;

/// User row as stored in the `users` table.
///
/// `password` holds an Argon2 PHC string, never the submitted plaintext.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Assigned by the store, never reused
    pub id: i64,
    /// Unique across all users
    pub login: String,
    /// Password hash
    pub password: String,
    /// Display name
    pub name: String,
    /// Profile photo, typically base64 image bytes
    pub profile_photo: Option<String>,
    /// MIME type paired with `profile_photo`
    pub photo_mime_type: Option<String>,
    /// When the row was created (RFC3339)
    pub created_at: String,
    /// When the row was last modified (RFC3339)
    pub updated_at: String,
}

/// A user about to be created. Password is still plaintext here.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub login: String,
    pub password: String,
    pub name: String,
    pub profile_photo: Option<String>,
    pub photo_mime_type: Option<String>,
}

/// Partial update of a user's mutable fields.
///
/// `None` leaves a column untouched. For the photo fields `Some(None)`
/// (an explicit JSON `null`) clears the column.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[validate(length(min = 1))]
    pub login: Option<String>,
    #[validate(length(min = 1))]
    pub password: Option<String>,
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub profile_photo: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub photo_mime_type: Option<Option<String>>,
}

impl UserPatch {
    /// Name of the first supplied required field that is empty, if any.
    pub fn empty_field(&self) -> Option<&'static str> {
        [
            ("login", &self.login),
            ("password", &self.password),
            ("name", &self.name),
        ]
        .into_iter()
        .find(|(_, value)| value.as_deref().is_some_and(str::is_empty))
        .map(|(field, _)| field)
    }
}

/// Distinguish an explicit `null` from an absent key.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// User as exposed over the API. Credentials are never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "public/generated/")
)]
pub struct UserResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: i64,
    pub login: String,
    pub name: String,
    pub profile_photo: Option<String>,
    pub photo_mime_type: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            login: user.login,
            name: user.name,
            profile_photo: user.profile_photo,
            photo_mime_type: user.photo_mime_type,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
