use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::dto::RegisterRequest;
use crate::auth::extractors::resolve_active;
use crate::auth::password::{hash_password, verify_against_dummy, verify_password};
use crate::auth::policy::{ensure_can_modify_user, UserOp};
use crate::error::AppError;
use crate::state::AppState;
use crate::store::Store;
use crate::users::repo_types::{User, UserRole};

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Create a customer account. Role and `disabled` are never taken from input.
pub async fn register(state: &AppState, req: RegisterRequest) -> Result<User, AppError> {
    let username = req.username.trim().to_string();
    let email = normalize_email(&req.email);

    if username.is_empty() {
        return Err(AppError::Validation("username must not be empty".into()));
    }
    if !is_valid_email(&email) {
        return Err(AppError::Validation("invalid email".into()));
    }
    validate_password(&req.password)?;

    if state.store.find_user_by_username(&username).await?.is_some() {
        warn!(username = %username, "username already registered");
        return Err(AppError::DuplicateUsername);
    }
    if state.store.find_user_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::DuplicateEmail);
    }

    let user = User {
        id: Uuid::new_v4(),
        username,
        email,
        full_name: req.full_name.trim().to_string(),
        phone: req.phone,
        address: req.address,
        picture: req.picture,
        role: UserRole::Customer,
        disabled: false,
        hashed_password: hash_password(&req.password)?,
        created_at: OffsetDateTime::now_utc(),
    };
    // a concurrent registration can still hit the unique constraints here
    let user = state.store.save_user(&user).await?;
    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Check credentials and issue a session token.
pub async fn authenticate(state: &AppState, username: &str, password: &str) -> Result<String, AppError> {
    let user = match state.store.find_user_by_username(username.trim()).await? {
        Some(u) => u,
        None => {
            // same Argon2 cost as a real miss, so response time does not reveal the username
            verify_against_dummy(password);
            warn!(username = %username, "login unknown username");
            return Err(AppError::InvalidCredentials);
        }
    };

    if !verify_password(password, &user.hashed_password) {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = state.keys.sign_session(&user.username)?;
    info!(user_id = %user.id, "user logged in");
    Ok(token)
}

/// Issue a short-lived reset token for the account owning `email`.
pub async fn request_password_reset(state: &AppState, email: &str) -> Result<String, AppError> {
    let email = normalize_email(email);
    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    let token = state.keys.sign_reset(&user.username)?;
    info!(user_id = %user.id, "password reset requested");
    Ok(token)
}

pub async fn complete_password_reset(
    state: &AppState,
    reset_token: &str,
    new_password: &str,
) -> Result<(), AppError> {
    let username = state.keys.verify_reset(reset_token)?;
    validate_password(new_password)?;
    let user = state
        .store
        .find_user_by_username(&username)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    let hashed = hash_password(new_password)?;
    state
        .store
        .set_password_hash(user.id, &hashed)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    info!(user_id = %user.id, "password reset completed");
    Ok(())
}

pub async fn change_password(
    state: &AppState,
    actor_token: &str,
    old_password: &str,
    new_password: &str,
) -> Result<(), AppError> {
    let actor = resolve_active(state, actor_token).await?;
    ensure_can_modify_user(&actor, &actor, UserOp::ChangePassword)?;
    if !verify_password(old_password, &actor.hashed_password) {
        warn!(user_id = %actor.id, "change password with wrong old password");
        return Err(AppError::WrongPassword);
    }
    validate_password(new_password)?;
    let hashed = hash_password(new_password)?;
    state
        .store
        .set_password_hash(actor.id, &hashed)
        .await?
        .ok_or(AppError::NotFound("user"))?;
    info!(user_id = %actor.id, "password changed");
    Ok(())
}

/// A mutation guarded by identity resolution and the authorization policy.
///
/// `apply` loads its target, asks the policy, and only then writes.
#[async_trait]
pub trait Operation: Send {
    type Output: Send;

    async fn apply(self, store: &dyn Store, actor: &User) -> Result<Self::Output, AppError>;
}

pub async fn authorize_and_apply<O: Operation>(
    state: &AppState,
    actor_token: &str,
    op: O,
) -> Result<O::Output, AppError> {
    let actor = resolve_active(state, actor_token).await?;
    op.apply(state.store.as_ref(), &actor).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::TokenKind;
    use crate::state::test_support::{
        insert_user, insert_user_with_password, session_token, state_with_store,
    };
    use crate::store::memory::RacingStore;

    fn registration(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            password: "long-enough-pw".into(),
            full_name: "Kopi Berry".into(),
            phone: None,
            address: Some("Jl. Kopi 1".into()),
            picture: None,
        }
    }

    #[tokio::test]
    async fn register_creates_customer_with_hashed_password() {
        let state = AppState::fake();
        let user = register(&state, registration(" kopi ", "Kopi@Mail.com "))
            .await
            .unwrap();
        assert_eq!(user.username, "kopi");
        assert_eq!(user.email, "kopi@mail.com");
        assert_eq!(user.role, UserRole::Customer);
        assert!(!user.disabled);
        assert_ne!(user.hashed_password, "long-enough-pw");
        assert!(verify_password("long-enough-pw", &user.hashed_password));
    }

    #[tokio::test]
    async fn duplicate_username_wins_regardless_of_email() {
        let state = AppState::fake();
        register(&state, registration("kopi", "a@mail.com")).await.unwrap();
        let err = register(&state, registration("kopi", "b@mail.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateUsername));
        let err = register(&state, registration("kopi", "a@mail.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateUsername));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let state = AppState::fake();
        register(&state, registration("kopi", "a@mail.com")).await.unwrap();
        let err = register(&state, registration("berry", "A@mail.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail));
    }

    #[tokio::test]
    async fn register_validates_input() {
        let state = AppState::fake();
        let mut req = registration("kopi", "not-an-email");
        assert!(matches!(
            register(&state, req).await,
            Err(AppError::Validation(_))
        ));
        req = registration("kopi", "k@mail.com");
        req.password = "short".into();
        assert!(matches!(
            register(&state, req).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            register(&state, registration("   ", "k@mail.com")).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn authenticate_issues_session_for_subject() {
        let state = AppState::fake();
        insert_user_with_password(&state, "alice", UserRole::Customer, "alice-password").await;
        let token = authenticate(&state, "alice", "alice-password").await.unwrap();
        let claims = state.keys.verify(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.kind, TokenKind::Session);
    }

    #[tokio::test]
    async fn wrong_password_or_unknown_user_is_invalid_credentials() {
        let state = AppState::fake();
        insert_user_with_password(&state, "alice", UserRole::Customer, "alice-password").await;
        assert!(matches!(
            authenticate(&state, "alice", "nope-nope").await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            authenticate(&state, "nobody", "alice-password").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn reset_flow_changes_password() {
        let state = AppState::fake();
        insert_user_with_password(&state, "bob", UserRole::Customer, "old-password").await;
        let token = request_password_reset(&state, "BOB@example.com").await.unwrap();
        complete_password_reset(&state, &token, "new-password").await.unwrap();

        assert!(authenticate(&state, "bob", "new-password").await.is_ok());
        assert!(matches!(
            authenticate(&state, "bob", "old-password").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn reset_for_unknown_email_is_not_found() {
        let state = AppState::fake();
        assert!(matches!(
            request_password_reset(&state, "ghost@example.com").await,
            Err(AppError::NotFound("user"))
        ));
    }

    #[tokio::test]
    async fn expired_reset_token_leaves_password_unchanged() {
        let state = AppState::fake();
        let before = insert_user_with_password(&state, "bob", UserRole::Customer, "old-password").await;
        let issued = OffsetDateTime::now_utc() - time::Duration::minutes(15) - time::Duration::seconds(5);
        let token = state
            .keys
            .issue_at("bob", TokenKind::Reset, state.keys.ttl(TokenKind::Reset), issued)
            .unwrap();

        let err = complete_password_reset(&state, &token, "new-password")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
        let after = state.store.find_user_by_id(before.id).await.unwrap().unwrap();
        assert_eq!(after.hashed_password, before.hashed_password);
    }

    #[tokio::test]
    async fn session_token_cannot_reset_password() {
        let state = AppState::fake();
        let bob = insert_user(&state, "bob", UserRole::Customer).await;
        let token = session_token(&state, &bob);
        assert!(matches!(
            complete_password_reset(&state, &token, "new-password").await,
            Err(AppError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn reset_for_vanished_subject_is_not_found() {
        let state = AppState::fake();
        let token = state.keys.sign_reset("ghost").unwrap();
        assert!(matches!(
            complete_password_reset(&state, &token, "new-password").await,
            Err(AppError::NotFound("user"))
        ));
    }

    #[tokio::test]
    async fn change_password_checks_old_password() {
        let state = AppState::fake();
        let carol = insert_user_with_password(&state, "carol", UserRole::Cashier, "first-password").await;
        let token = session_token(&state, &carol);

        assert!(matches!(
            change_password(&state, &token, "not-it-at-all", "second-password").await,
            Err(AppError::WrongPassword)
        ));
        change_password(&state, &token, "first-password", "second-password")
            .await
            .unwrap();
        assert!(authenticate(&state, "carol", "second-password").await.is_ok());
    }

    #[tokio::test]
    async fn change_password_requires_authentication() {
        let state = AppState::fake();
        assert!(matches!(
            change_password(&state, "garbage", "a-password", "b-password").await,
            Err(AppError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn change_password_keeps_concurrent_disable() {
        let state = state_with_store(RacingStore::new("eve", |u| u.disabled = true));
        let eve = insert_user_with_password(&state, "eve", UserRole::Customer, "first-password").await;
        let token = session_token(&state, &eve);

        change_password(&state, &token, "first-password", "second-password")
            .await
            .unwrap();

        let stored = state.store.find_user_by_id(eve.id).await.unwrap().unwrap();
        assert!(stored.disabled);
        assert!(verify_password("second-password", &stored.hashed_password));
    }

    #[tokio::test]
    async fn reset_keeps_concurrent_role_change() {
        let state = state_with_store(RacingStore::new("bob", |u| u.role = UserRole::Cashier));
        let bob = insert_user_with_password(&state, "bob", UserRole::Customer, "old-password").await;
        let token = state.keys.sign_reset(&bob.username).unwrap();

        complete_password_reset(&state, &token, "new-password").await.unwrap();

        let stored = state.store.find_user_by_id(bob.id).await.unwrap().unwrap();
        assert_eq!(stored.role, UserRole::Cashier);
        assert!(verify_password("new-password", &stored.hashed_password));
    }
}
