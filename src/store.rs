use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::products::repo_types::Product;
use crate::users::repo_types::{ProfilePatch, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint `{0}` violated")]
    UniqueViolation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or_default().to_string();
                return StoreError::UniqueViolation(constraint);
            }
        }
        StoreError::Other(err.into())
    }
}

/// Persistence operations the auth core and handlers depend on.
///
/// `save_*` are upserts keyed by id and meant for inserts and whole-row
/// writes. Changes to an existing user go through the column-level
/// `set_*`/`update_profile` calls, which return `None` when the id is gone and
/// never write back columns they were not asked to change.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn save_user(&self, user: &User) -> Result<User, StoreError>;
    async fn list_users(&self, offset: i64, limit: i64) -> Result<Vec<User>, StoreError>;
    async fn set_disabled(&self, id: Uuid, disabled: bool) -> Result<Option<User>, StoreError>;
    async fn set_password_hash(
        &self,
        id: Uuid,
        hashed_password: &str,
    ) -> Result<Option<User>, StoreError>;
    async fn update_profile(
        &self,
        id: Uuid,
        patch: &ProfilePatch,
    ) -> Result<Option<User>, StoreError>;

    async fn find_product_by_id(&self, id: Uuid) -> Result<Option<Product>, StoreError>;
    async fn list_products_by_merchant(&self, merchant_id: Uuid) -> Result<Vec<Product>, StoreError>;
    async fn list_products(&self, offset: i64, limit: i64) -> Result<Vec<Product>, StoreError>;
    async fn save_product(&self, product: &Product) -> Result<Product, StoreError>;
    async fn delete_product(&self, id: Uuid) -> Result<bool, StoreError>;
}

#[cfg(test)]
pub mod memory {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// Vec-backed store with the same uniqueness and foreign-key rules as the schema.
    #[derive(Default)]
    pub struct MemoryStore {
        users: Mutex<Vec<User>>,
        products: Mutex<Vec<Product>>,
    }

    fn window<T: Clone>(rows: &[T], offset: i64, limit: i64) -> Vec<T> {
        rows.iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect()
    }

    #[async_trait]
    impl Store for MemoryStore {
        async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
            let users = self.users.lock().unwrap();
            Ok(users.iter().find(|u| u.username == username).cloned())
        }

        async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            let users = self.users.lock().unwrap();
            Ok(users.iter().find(|u| u.email == email).cloned())
        }

        async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
            let users = self.users.lock().unwrap();
            Ok(users.iter().find(|u| u.id == id).cloned())
        }

        async fn save_user(&self, user: &User) -> Result<User, StoreError> {
            let mut users = self.users.lock().unwrap();
            let others = users.iter().filter(|u| u.id != user.id);
            for other in others {
                if other.username == user.username {
                    return Err(StoreError::UniqueViolation("users_username_key".into()));
                }
                if other.email == user.email {
                    return Err(StoreError::UniqueViolation("users_email_key".into()));
                }
            }
            match users.iter_mut().find(|u| u.id == user.id) {
                Some(existing) => *existing = user.clone(),
                None => users.push(user.clone()),
            }
            Ok(user.clone())
        }

        async fn list_users(&self, offset: i64, limit: i64) -> Result<Vec<User>, StoreError> {
            let users = self.users.lock().unwrap();
            Ok(window(&users, offset, limit))
        }

        async fn set_disabled(&self, id: Uuid, disabled: bool) -> Result<Option<User>, StoreError> {
            let mut users = self.users.lock().unwrap();
            Ok(users.iter_mut().find(|u| u.id == id).map(|u| {
                u.disabled = disabled;
                u.clone()
            }))
        }

        async fn set_password_hash(
            &self,
            id: Uuid,
            hashed_password: &str,
        ) -> Result<Option<User>, StoreError> {
            let mut users = self.users.lock().unwrap();
            Ok(users.iter_mut().find(|u| u.id == id).map(|u| {
                u.hashed_password = hashed_password.to_string();
                u.clone()
            }))
        }

        async fn update_profile(
            &self,
            id: Uuid,
            patch: &ProfilePatch,
        ) -> Result<Option<User>, StoreError> {
            let mut users = self.users.lock().unwrap();
            Ok(users.iter_mut().find(|u| u.id == id).map(|u| {
                if let Some(full_name) = &patch.full_name {
                    u.full_name = full_name.clone();
                }
                if let Some(phone) = &patch.phone {
                    u.phone = phone.clone();
                }
                if let Some(address) = &patch.address {
                    u.address = address.clone();
                }
                if let Some(picture) = &patch.picture {
                    u.picture = picture.clone();
                }
                u.clone()
            }))
        }

        async fn find_product_by_id(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
            let products = self.products.lock().unwrap();
            Ok(products.iter().find(|p| p.id == id).cloned())
        }

        async fn list_products_by_merchant(
            &self,
            merchant_id: Uuid,
        ) -> Result<Vec<Product>, StoreError> {
            let products = self.products.lock().unwrap();
            Ok(products
                .iter()
                .filter(|p| p.merchant_id == merchant_id)
                .cloned()
                .collect())
        }

        async fn list_products(&self, offset: i64, limit: i64) -> Result<Vec<Product>, StoreError> {
            let products = self.products.lock().unwrap();
            Ok(window(&products, offset, limit))
        }

        async fn save_product(&self, product: &Product) -> Result<Product, StoreError> {
            let merchant_exists = self
                .users
                .lock()
                .unwrap()
                .iter()
                .any(|u| u.id == product.merchant_id);
            if !merchant_exists {
                return Err(StoreError::Other(anyhow::anyhow!(
                    "products_merchant_id_fkey violated"
                )));
            }
            let mut products = self.products.lock().unwrap();
            match products.iter_mut().find(|p| p.id == product.id) {
                Some(existing) => {
                    // merchant_id is immutable once stored, as in the SQL upsert
                    let merchant_id = existing.merchant_id;
                    *existing = Product {
                        merchant_id,
                        ..product.clone()
                    };
                    Ok(existing.clone())
                }
                None => {
                    products.push(product.clone());
                    Ok(product.clone())
                }
            }
        }

        async fn delete_product(&self, id: Uuid) -> Result<bool, StoreError> {
            let mut products = self.products.lock().unwrap();
            let before = products.len();
            products.retain(|p| p.id != id);
            Ok(products.len() != before)
        }
    }

    /// Runs `race` once against the stored row of `username`, right after the
    /// `fire_on`-th lookup of that user returns, so the caller holds a stale
    /// copy. Stands in for a second request writing the same row.
    pub struct RacingStore {
        inner: MemoryStore,
        username: String,
        race: Box<dyn Fn(&mut User) + Send + Sync>,
        fire_on: usize,
        hits: AtomicUsize,
    }

    impl RacingStore {
        pub fn new(username: &str, race: impl Fn(&mut User) + Send + Sync + 'static) -> Self {
            Self {
                inner: MemoryStore::default(),
                username: username.to_string(),
                race: Box::new(race),
                fire_on: 1,
                hits: AtomicUsize::new(0),
            }
        }

        pub fn on_lookup(mut self, n: usize) -> Self {
            self.fire_on = n;
            self
        }

        fn after_load(&self, found: &Option<User>) {
            let Some(user) = found else { return };
            if user.username != self.username {
                return;
            }
            if self.hits.fetch_add(1, Ordering::SeqCst) + 1 != self.fire_on {
                return;
            }
            let mut users = self.inner.users.lock().unwrap();
            if let Some(stored) = users.iter_mut().find(|u| u.id == user.id) {
                (self.race)(stored);
            }
        }
    }

    #[async_trait]
    impl Store for RacingStore {
        async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
            let found = self.inner.find_user_by_username(username).await?;
            self.after_load(&found);
            Ok(found)
        }

        async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            let found = self.inner.find_user_by_email(email).await?;
            self.after_load(&found);
            Ok(found)
        }

        async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
            let found = self.inner.find_user_by_id(id).await?;
            self.after_load(&found);
            Ok(found)
        }

        async fn save_user(&self, user: &User) -> Result<User, StoreError> {
            self.inner.save_user(user).await
        }

        async fn list_users(&self, offset: i64, limit: i64) -> Result<Vec<User>, StoreError> {
            self.inner.list_users(offset, limit).await
        }

        async fn set_disabled(&self, id: Uuid, disabled: bool) -> Result<Option<User>, StoreError> {
            self.inner.set_disabled(id, disabled).await
        }

        async fn set_password_hash(
            &self,
            id: Uuid,
            hashed_password: &str,
        ) -> Result<Option<User>, StoreError> {
            self.inner.set_password_hash(id, hashed_password).await
        }

        async fn update_profile(
            &self,
            id: Uuid,
            patch: &ProfilePatch,
        ) -> Result<Option<User>, StoreError> {
            self.inner.update_profile(id, patch).await
        }

        async fn find_product_by_id(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
            self.inner.find_product_by_id(id).await
        }

        async fn list_products_by_merchant(
            &self,
            merchant_id: Uuid,
        ) -> Result<Vec<Product>, StoreError> {
            self.inner.list_products_by_merchant(merchant_id).await
        }

        async fn list_products(&self, offset: i64, limit: i64) -> Result<Vec<Product>, StoreError> {
            self.inner.list_products(offset, limit).await
        }

        async fn save_product(&self, product: &Product) -> Result<Product, StoreError> {
            self.inner.save_product(product).await
        }

        async fn delete_product(&self, id: Uuid) -> Result<bool, StoreError> {
            self.inner.delete_product(id).await
        }
    }
}
