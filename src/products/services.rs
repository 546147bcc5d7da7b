use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::auth::policy::{ensure_can_modify_product, stamp_new_product, ProductOp};
use crate::auth::services::Operation;
use crate::error::AppError;
use crate::products::dto::ProductDraft;
use crate::products::repo_types::Product;
use crate::store::Store;
use crate::users::repo_types::User;

pub async fn get_product(store: &dyn Store, id: Uuid) -> Result<Product, AppError> {
    store
        .find_product_by_id(id)
        .await?
        .ok_or(AppError::NotFound("product"))
}

pub struct CreateProduct(pub ProductDraft);

#[async_trait]
impl Operation for CreateProduct {
    type Output = Product;

    async fn apply(self, store: &dyn Store, actor: &User) -> Result<Product, AppError> {
        self.0.validate()?;
        let product = stamp_new_product(actor, self.0);
        let saved = store.save_product(&product).await?;
        info!(product_id = %saved.id, merchant_id = %saved.merchant_id, "product created");
        Ok(saved)
    }
}

/// Replaces the catalog fields; owner and creation time stay as stored.
pub struct UpdateProduct {
    pub product_id: Uuid,
    pub changes: ProductDraft,
}

#[async_trait]
impl Operation for UpdateProduct {
    type Output = Product;

    async fn apply(self, store: &dyn Store, actor: &User) -> Result<Product, AppError> {
        self.changes.validate()?;
        let existing = get_product(store, self.product_id).await?;
        ensure_can_modify_product(actor, &existing, ProductOp::Update)?;

        let ProductDraft {
            name,
            price,
            description,
            image,
            ..
        } = self.changes;
        let product = Product {
            name: name.trim().to_string(),
            price,
            description,
            image,
            ..existing
        };
        let saved = store.save_product(&product).await?;
        info!(product_id = %saved.id, actor_id = %actor.id, "product updated");
        Ok(saved)
    }
}

pub struct DeleteProduct {
    pub product_id: Uuid,
}

#[async_trait]
impl Operation for DeleteProduct {
    type Output = ();

    async fn apply(self, store: &dyn Store, actor: &User) -> Result<(), AppError> {
        let existing = get_product(store, self.product_id).await?;
        ensure_can_modify_product(actor, &existing, ProductOp::Delete)?;
        if !store.delete_product(existing.id).await? {
            // removed concurrently after the load above
            return Err(AppError::NotFound("product"));
        }
        info!(product_id = %existing.id, actor_id = %actor.id, "product deleted");
        Ok(())
    }
}
