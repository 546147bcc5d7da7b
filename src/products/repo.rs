use sqlx::PgPool;
use uuid::Uuid;

use crate::products::repo_types::Product;
use crate::store::StoreError;

impl Product {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<Product>, StoreError> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, merchant_id, name, price, description, image, created_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(product)
    }

    pub async fn list_by_merchant(db: &PgPool, merchant_id: Uuid) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, merchant_id, name, price, description, image, created_at
            FROM products
            WHERE merchant_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(merchant_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn list(db: &PgPool, offset: i64, limit: i64) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, merchant_id, name, price, description, image, created_at
            FROM products
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

    /// Insert the product, or overwrite the row with the same id.
    pub async fn upsert(db: &PgPool, product: &Product) -> Result<Product, StoreError> {
        let saved = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (id, merchant_id, name, price, description, image, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                price = EXCLUDED.price,
                description = EXCLUDED.description,
                image = EXCLUDED.image
            RETURNING id, merchant_id, name, price, description, image, created_at
            "#,
        )
        .bind(product.id)
        .bind(product.merchant_id)
        .bind(&product.name)
        .bind(product.price)
        .bind(&product.description)
        .bind(&product.image)
        .bind(product.created_at)
        .fetch_one(db)
        .await?;
        Ok(saved)
    }

    /// Returns whether a row was removed.
    pub async fn delete(db: &PgPool, id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
