use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::policy::Transition;
use crate::error::AppError;
use crate::products::repo_types::Product;
use crate::users::repo_types::{ProfilePatch, User, UserRole};

/// Public part of the user returned to clients. Never carries the hash.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub picture: Option<String>,
    pub role: UserRole,
    pub disabled: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            full_name: u.full_name,
            phone: u.phone,
            address: u.address,
            picture: u.picture,
            role: u.role,
            disabled: u.disabled,
            created_at: u.created_at,
        }
    }
}

/// Present-but-null becomes `Some(None)`; an absent field stays `None` via `default`.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// Partial profile update; absent fields are left untouched and an explicit
/// `null` clears phone, address or picture.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub picture: Option<Option<String>>,
}

impl ProfileUpdate {
    pub fn into_patch(self) -> Result<ProfilePatch, AppError> {
        let full_name = match self.full_name {
            Some(name) => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(AppError::Validation("full_name must not be empty".into()));
                }
                Some(name)
            }
            None => None,
        };
        Ok(ProfilePatch {
            full_name,
            phone: self.phone,
            address: self.address,
            picture: self.picture,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct AccountStatusResponse {
    pub user: PublicUser,
    pub changed: bool,
    pub status: Transition,
}

#[derive(Debug, Serialize)]
pub struct UserProductsResponse {
    #[serde(flatten)]
    pub user: PublicUser,
    pub products: Vec<Product>,
}
