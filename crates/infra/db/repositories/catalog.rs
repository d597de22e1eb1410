use anyhow::Result;
use async_trait::async_trait;
use diesel::{PgConnection, RunQueryDsl, prelude::*};
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

use crate::{
    domain::{
        entities::catalog::CatalogEntity, repositories::catalog::CatalogRepository,
        value_objects::enums::catalog_kinds::CatalogKind,
    },
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{ai_faces, backgrounds, categories, industries, poses, product_types, themes},
    },
};

/// The one place catalog reads are expressed: a row past its deletion marker is never
/// returned.
macro_rules! active_by_id {
    ($table:ident, $conn:expr, $id:expr) => {
        $table::table
            .filter($table::id.eq($id))
            .filter($table::deleted_at.is_null())
            .select((
                $table::id,
                $table::name,
                $table::description,
                $table::image_path,
                $table::image_url,
            ))
            .first::<CatalogEntity>($conn)
            .optional()
    };
}

fn find_active_row(
    conn: &mut PgConnection,
    kind: CatalogKind,
    id: Uuid,
) -> QueryResult<Option<CatalogEntity>> {
    match kind {
        CatalogKind::Industry => active_by_id!(industries, conn, id),
        CatalogKind::Category => active_by_id!(categories, conn, id),
        CatalogKind::ProductType => active_by_id!(product_types, conn, id),
        CatalogKind::Pose => active_by_id!(poses, conn, id),
        CatalogKind::Theme => active_by_id!(themes, conn, id),
        CatalogKind::Background => active_by_id!(backgrounds, conn, id),
        CatalogKind::Face => active_by_id!(ai_faces, conn, id),
    }
}

pub struct CatalogPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl CatalogPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl CatalogRepository for CatalogPostgres {
    async fn find_active(&self, kind: CatalogKind, id: Uuid) -> Result<Option<CatalogEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<CatalogEntity>> {
            let mut conn = db_pool.get()?;
            Ok(find_active_row(&mut conn, kind, id)?)
        })
        .await??)
    }
}
