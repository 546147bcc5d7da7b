use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;

/// Client payload for creating or replacing a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    pub price: i64,
    pub description: Option<String>,
    pub image: Option<String>,
    /// Accepted for compatibility and ignored; the owner comes from the token.
    pub merchant_id: Option<Uuid>,
}

impl ProductDraft {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("name must not be empty".into()));
        }
        if self.price < 0 {
            return Err(AppError::Validation("price must not be negative".into()));
        }
        Ok(())
    }
}
