use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::auth::policy::{account_transition, ensure_can_modify_user, AccountSwitch, Transition, UserOp};
use crate::auth::services::Operation;
use crate::error::AppError;
use crate::store::Store;
use crate::users::dto::ProfileUpdate;
use crate::users::repo_types::User;

async fn load_user(store: &dyn Store, id: Uuid) -> Result<User, AppError> {
    store
        .find_user_by_id(id)
        .await?
        .ok_or(AppError::NotFound("user"))
}

pub struct UpdateProfile {
    pub user_id: Uuid,
    pub changes: ProfileUpdate,
}

#[async_trait]
impl Operation for UpdateProfile {
    type Output = User;

    async fn apply(self, store: &dyn Store, actor: &User) -> Result<User, AppError> {
        let target = load_user(store, self.user_id).await?;
        ensure_can_modify_user(actor, &target, UserOp::UpdateProfile)?;
        let patch = self.changes.into_patch()?;

        let saved = store
            .update_profile(target.id, &patch)
            .await?
            .ok_or(AppError::NotFound("user"))?;
        info!(user_id = %saved.id, "profile updated");
        Ok(saved)
    }
}

/// Soft-delete: marks the account disabled, never removes it.
pub struct DisableUser {
    pub user_id: Uuid,
}

pub struct EnableUser {
    pub user_id: Uuid,
}

async fn switch_account(
    store: &dyn Store,
    actor: &User,
    user_id: Uuid,
    switch: AccountSwitch,
) -> Result<(User, Transition), AppError> {
    let target = load_user(store, user_id).await?;
    let transition = account_transition(actor, &target, switch)?;
    if !transition.changed() {
        return Ok((target, transition));
    }
    let saved = store
        .set_disabled(target.id, matches!(switch, AccountSwitch::Disable))
        .await?
        .ok_or(AppError::NotFound("user"))?;
    info!(actor_id = %actor.id, user_id = %saved.id, status = ?transition, "account status changed");
    Ok((saved, transition))
}

#[async_trait]
impl Operation for DisableUser {
    type Output = (User, Transition);

    async fn apply(self, store: &dyn Store, actor: &User) -> Result<Self::Output, AppError> {
        switch_account(store, actor, self.user_id, AccountSwitch::Disable).await
    }
}

#[async_trait]
impl Operation for EnableUser {
    type Output = (User, Transition);

    async fn apply(self, store: &dyn Store, actor: &User) -> Result<Self::Output, AppError> {
        switch_account(store, actor, self.user_id, AccountSwitch::Enable).await
    }
}

pub async fn get_user(store: &dyn Store, id: Uuid) -> Result<User, AppError> {
    load_user(store, id).await
}
