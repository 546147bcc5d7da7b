use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::products::repo_types::Product;
use crate::store::{Store, StoreError};
use crate::users::repo_types::{ProfilePatch, User};

/// Open the pool and bring the schema up to date.
pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("run migrations")?;

    Ok(db)
}

/// [`Store`] backed by Postgres.
#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        User::find_by_username(&self.db, username).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        User::find_by_email(&self.db, email).await
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        User::find_by_id(&self.db, id).await
    }

    async fn save_user(&self, user: &User) -> Result<User, StoreError> {
        User::upsert(&self.db, user).await
    }

    async fn list_users(&self, offset: i64, limit: i64) -> Result<Vec<User>, StoreError> {
        User::list(&self.db, offset, limit).await
    }

    async fn set_disabled(&self, id: Uuid, disabled: bool) -> Result<Option<User>, StoreError> {
        User::set_disabled(&self.db, id, disabled).await
    }

    async fn set_password_hash(
        &self,
        id: Uuid,
        hashed_password: &str,
    ) -> Result<Option<User>, StoreError> {
        User::set_password_hash(&self.db, id, hashed_password).await
    }

    async fn update_profile(
        &self,
        id: Uuid,
        patch: &ProfilePatch,
    ) -> Result<Option<User>, StoreError> {
        User::update_profile(&self.db, id, patch).await
    }

    async fn find_product_by_id(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        Product::find_by_id(&self.db, id).await
    }

    async fn list_products_by_merchant(&self, merchant_id: Uuid) -> Result<Vec<Product>, StoreError> {
        Product::list_by_merchant(&self.db, merchant_id).await
    }

    async fn list_products(&self, offset: i64, limit: i64) -> Result<Vec<Product>, StoreError> {
        Product::list(&self.db, offset, limit).await
    }

    async fn save_product(&self, product: &Product) -> Result<Product, StoreError> {
        Product::upsert(&self.db, product).await
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool, StoreError> {
        Product::delete(&self.db, id).await
    }
}
