use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::catalog::CatalogEntity, value_objects::enums::catalog_kinds::CatalogKind,
};

#[automock]
#[async_trait]
pub trait CatalogRepository {
    /// Soft-deleted rows are reported as absent.
    async fn find_active(&self, kind: CatalogKind, id: Uuid) -> Result<Option<CatalogEntity>>;
}
