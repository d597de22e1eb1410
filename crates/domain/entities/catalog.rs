use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Read-only view of a catalog row (industry, category, product type, pose, theme,
/// background or AI face). Every catalog table shares these columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Queryable)]
pub struct CatalogEntity {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub image_path: Option<String>,
    pub image_url: Option<String>,
}

impl CatalogEntity {
    /// Storage key or public URL of the entity's image, preferring the stored path.
    pub fn asset_location(&self) -> Option<&str> {
        self.image_path
            .as_deref()
            .filter(|path| !path.trim().is_empty())
            .or_else(|| self.image_url.as_deref().filter(|url| !url.trim().is_empty()))
    }

    /// Free-text prompt fragment; falls back to the name when no description is set.
    pub fn prompt_description(&self) -> &str {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|description| !description.is_empty())
            .unwrap_or(&self.name)
    }
}
