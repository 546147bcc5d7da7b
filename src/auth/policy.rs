//! Role and ownership rules for user and product mutations.
//!
//! Every function here is pure: targets arrive already loaded and nothing
//! touches the store.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;
use crate::products::{dto::ProductDraft, repo_types::Product};
use crate::users::repo_types::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserOp {
    ChangePassword,
    UpdateProfile,
    Disable,
    Enable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductOp {
    Update,
    Delete,
}

pub fn can_modify_user(actor: &User, target: &User, op: UserOp) -> bool {
    match op {
        UserOp::ChangePassword | UserOp::UpdateProfile => actor.id == target.id,
        // admins are never disabled, not even by another admin
        UserOp::Disable => actor.role.is_admin() && !target.role.is_admin(),
        UserOp::Enable => actor.role.is_admin(),
    }
}

pub fn ensure_can_modify_user(actor: &User, target: &User, op: UserOp) -> Result<(), AppError> {
    if can_modify_user(actor, target, op) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

pub fn can_modify_product(actor: &User, product: &Product, op: ProductOp) -> bool {
    match op {
        ProductOp::Update | ProductOp::Delete => {
            actor.role.is_admin() || actor.id == product.merchant_id
        }
    }
}

pub fn ensure_can_modify_product(
    actor: &User,
    product: &Product,
    op: ProductOp,
) -> Result<(), AppError> {
    if can_modify_product(actor, product, op) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// Build the product to insert. The owner is always the actor; any
/// `merchant_id` in the draft is discarded.
pub fn stamp_new_product(actor: &User, draft: ProductDraft) -> Product {
    Product {
        id: Uuid::new_v4(),
        merchant_id: actor.id,
        name: draft.name.trim().to_string(),
        price: draft.price,
        description: draft.description,
        image: draft.image,
        created_at: OffsetDateTime::now_utc(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountSwitch {
    Disable,
    Enable,
}

impl From<AccountSwitch> for UserOp {
    fn from(s: AccountSwitch) -> Self {
        match s {
            AccountSwitch::Disable => UserOp::Disable,
            AccountSwitch::Enable => UserOp::Enable,
        }
    }
}

/// Result of flipping `User::disabled`. Repeating a switch is a no-op,
/// reported as `Already*` rather than as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Disabled,
    AlreadyDisabled,
    Enabled,
    AlreadyActive,
}

impl Transition {
    pub fn changed(self) -> bool {
        matches!(self, Transition::Disabled | Transition::Enabled)
    }
}

pub fn account_transition(
    actor: &User,
    target: &User,
    switch: AccountSwitch,
) -> Result<Transition, AppError> {
    ensure_can_modify_user(actor, target, switch.into())?;
    Ok(match (switch, target.disabled) {
        (AccountSwitch::Disable, false) => Transition::Disabled,
        (AccountSwitch::Disable, true) => Transition::AlreadyDisabled,
        (AccountSwitch::Enable, true) => Transition::Enabled,
        (AccountSwitch::Enable, false) => Transition::AlreadyActive,
    })
}
