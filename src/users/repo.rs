use sqlx::PgPool;
use uuid::Uuid;

use crate::store::StoreError;
use crate::users::repo_types::{ProfilePatch, User};

impl User {
    pub async fn find_by_username(db: &PgPool, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, full_name, phone, address, picture,
                   role, disabled, hashed_password, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, full_name, phone, address, picture,
                   role, disabled, hashed_password, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, full_name, phone, address, picture,
                   role, disabled, hashed_password, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn list(db: &PgPool, offset: i64, limit: i64) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, full_name, phone, address, picture,
                   role, disabled, hashed_password, created_at
            FROM users
            ORDER BY created_at ASC, id ASC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Insert the user, or overwrite the row with the same id.
    pub async fn upsert(db: &PgPool, user: &User) -> Result<User, StoreError> {
        let saved = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, full_name, phone, address, picture,
                               role, disabled, hashed_password, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                username = EXCLUDED.username,
                email = EXCLUDED.email,
                full_name = EXCLUDED.full_name,
                phone = EXCLUDED.phone,
                address = EXCLUDED.address,
                picture = EXCLUDED.picture,
                role = EXCLUDED.role,
                disabled = EXCLUDED.disabled,
                hashed_password = EXCLUDED.hashed_password
            RETURNING id, username, email, full_name, phone, address, picture,
                      role, disabled, hashed_password, created_at
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(&user.picture)
        .bind(user.role)
        .bind(user.disabled)
        .bind(&user.hashed_password)
        .bind(user.created_at)
        .fetch_one(db)
        .await?;
        Ok(saved)
    }

    /// Flip only `disabled`; other columns keep whatever is stored now.
    pub async fn set_disabled(db: &PgPool, id: Uuid, disabled: bool) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET disabled = $2
            WHERE id = $1
            RETURNING id, username, email, full_name, phone, address, picture,
                      role, disabled, hashed_password, created_at
            "#,
        )
        .bind(id)
        .bind(disabled)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn set_password_hash(
        db: &PgPool,
        id: Uuid,
        hashed_password: &str,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET hashed_password = $2
            WHERE id = $1
            RETURNING id, username, email, full_name, phone, address, picture,
                      role, disabled, hashed_password, created_at
            "#,
        )
        .bind(id)
        .bind(hashed_password)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        patch: &ProfilePatch,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                full_name = COALESCE($2, full_name),
                phone = CASE WHEN $3 THEN $4 ELSE phone END,
                address = CASE WHEN $5 THEN $6 ELSE address END,
                picture = CASE WHEN $7 THEN $8 ELSE picture END
            WHERE id = $1
            RETURNING id, username, email, full_name, phone, address, picture,
                      role, disabled, hashed_password, created_at
            "#,
        )
        .bind(id)
        .bind(&patch.full_name)
        .bind(patch.phone.is_some())
        .bind(patch.phone.clone().flatten())
        .bind(patch.address.is_some())
        .bind(patch.address.clone().flatten())
        .bind(patch.picture.is_some())
        .bind(patch.picture.clone().flatten())
        .fetch_optional(db)
        .await?;
        Ok(user)
    }
}
