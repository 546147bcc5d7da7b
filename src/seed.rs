use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::auth::services::normalize_email;
use crate::config::AdminSeed;
use crate::store::Store;
use crate::users::repo_types::{User, UserRole};

/// Create the bootstrap admin unless an account with that username exists.
/// Returns whether a user was created.
pub async fn seed_admin(store: &dyn Store, seed: &AdminSeed) -> anyhow::Result<bool> {
    if store.find_user_by_username(&seed.username).await?.is_some() {
        info!(username = %seed.username, "admin already exists, skipping seeding");
        return Ok(false);
    }

    let admin = User {
        id: Uuid::new_v4(),
        username: seed.username.clone(),
        email: normalize_email(&seed.email),
        full_name: seed.full_name.clone(),
        phone: None,
        address: None,
        picture: None,
        role: UserRole::Admin,
        disabled: false,
        hashed_password: hash_password(&seed.password)?,
        created_at: OffsetDateTime::now_utc(),
    };
    store.save_user(&admin).await?;
    info!(username = %admin.username, "admin seeded");
    Ok(true)
}
