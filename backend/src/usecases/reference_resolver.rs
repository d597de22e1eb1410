use std::sync::Arc;

use crates::domain::{
    entities::catalog::CatalogEntity,
    repositories::{catalog::CatalogRepository, storage::BlobStorage},
    value_objects::{
        catalog::{ReferenceAssets, SharedAssets},
        enums::catalog_kinds::CatalogKind,
        generations::{CatalogReferences, ReferenceImage, SharedReferences},
    },
};
use futures_util::future::join_all;
use tracing::{error, warn};
use uuid::Uuid;

use super::generation::{GenerationError, GenerationResult};

const FALLBACK_IMAGE_MIME: &str = "image/jpeg";

/// Catalog rows a single request resolved to. Asset fetching works from these rows, so
/// the catalog is read once per request.
#[derive(Debug, Clone)]
pub struct ResolvedReferences {
    pub product_type: CatalogEntity,
    pub pose: CatalogEntity,
    pub background: CatalogEntity,
    pub face: CatalogEntity,
}

/// Bulk counterpart: the shared rows plus every pose in request order.
#[derive(Debug, Clone)]
pub struct ResolvedBulkReferences {
    pub product_type: CatalogEntity,
    pub poses: Vec<CatalogEntity>,
    pub background: CatalogEntity,
    pub face: CatalogEntity,
}

/// Checks catalog references against the live (not soft-deleted) catalog and pulls the
/// binary assets the generator needs.
pub struct ReferenceResolver<C, B>
where
    C: CatalogRepository + Send + Sync + 'static,
    B: BlobStorage + Send + Sync + 'static,
{
    catalog_repo: Arc<C>,
    storage: Arc<B>,
}

impl<C, B> ReferenceResolver<C, B>
where
    C: CatalogRepository + Send + Sync + 'static,
    B: BlobStorage + Send + Sync + 'static,
{
    pub fn new(catalog_repo: Arc<C>, storage: Arc<B>) -> Self {
        Self {
            catalog_repo,
            storage,
        }
    }

    /// Looks up all seven references concurrently. When several are missing, the first
    /// one in `CatalogKind::VALIDATION_ORDER` is reported.
    pub async fn validate(
        &self,
        references: &CatalogReferences,
    ) -> GenerationResult<ResolvedReferences> {
        let (industry, category, product_type, pose, theme, background, face) = tokio::join!(
            self.lookup(CatalogKind::Industry, references.industry_id),
            self.lookup(CatalogKind::Category, references.category_id),
            self.lookup(CatalogKind::ProductType, references.product_type_id),
            self.lookup(CatalogKind::Pose, references.pose_id),
            self.lookup(CatalogKind::Theme, references.theme_id),
            self.lookup(CatalogKind::Background, references.background_id),
            self.lookup(CatalogKind::Face, references.ai_face_id),
        );

        require(CatalogKind::Industry, industry)?;
        require(CatalogKind::Category, category)?;
        let product_type = require(CatalogKind::ProductType, product_type)?;
        let pose = require(CatalogKind::Pose, pose)?;
        require(CatalogKind::Theme, theme)?;
        let background = require(CatalogKind::Background, background)?;
        let face = require(CatalogKind::Face, face)?;

        Ok(ResolvedReferences {
            product_type,
            pose,
            background,
            face,
        })
    }

    /// Bulk variant: the shared references plus every pose.
    pub async fn validate_bulk(
        &self,
        shared: &SharedReferences,
        pose_ids: &[Uuid],
    ) -> GenerationResult<ResolvedBulkReferences> {
        let shared_lookups = async {
            tokio::join!(
                self.lookup(CatalogKind::Industry, shared.industry_id),
                self.lookup(CatalogKind::Category, shared.category_id),
                self.lookup(CatalogKind::ProductType, shared.product_type_id),
                self.lookup(CatalogKind::Theme, shared.theme_id),
                self.lookup(CatalogKind::Background, shared.background_id),
                self.lookup(CatalogKind::Face, shared.ai_face_id),
            )
        };
        let pose_lookups = join_all(
            pose_ids
                .iter()
                .map(|pose_id| self.lookup(CatalogKind::Pose, *pose_id)),
        );

        let ((industry, category, product_type, theme, background, face), poses) =
            tokio::join!(shared_lookups, pose_lookups);

        require(CatalogKind::Industry, industry)?;
        require(CatalogKind::Category, category)?;
        let product_type = require(CatalogKind::ProductType, product_type)?;
        let poses = poses
            .into_iter()
            .map(|pose| require(CatalogKind::Pose, pose))
            .collect::<GenerationResult<Vec<_>>>()?;
        require(CatalogKind::Theme, theme)?;
        let background = require(CatalogKind::Background, background)?;
        let face = require(CatalogKind::Face, face)?;

        Ok(ResolvedBulkReferences {
            product_type,
            poses,
            background,
            face,
        })
    }

    pub async fn fetch_reference_assets(
        &self,
        resolved: &ResolvedReferences,
    ) -> GenerationResult<ReferenceAssets> {
        require_location(CatalogKind::Pose, &resolved.pose)?;

        let (face, background) = tokio::try_join!(
            self.download(CatalogKind::Face, &resolved.face),
            self.download(CatalogKind::Background, &resolved.background),
        )?;

        Ok(ReferenceAssets {
            face,
            background,
            pose_description: resolved.pose.prompt_description().to_string(),
        })
    }

    pub async fn fetch_shared_assets(
        &self,
        resolved: &ResolvedBulkReferences,
    ) -> GenerationResult<SharedAssets> {
        let (face, background) = tokio::try_join!(
            self.download(CatalogKind::Face, &resolved.face),
            self.download(CatalogKind::Background, &resolved.background),
        )?;

        Ok(SharedAssets { face, background })
    }

    async fn lookup(&self, kind: CatalogKind, id: Uuid) -> GenerationResult<Option<CatalogEntity>> {
        self.catalog_repo.find_active(kind, id).await.map_err(|err| {
            error!(
                catalog_kind = %kind,
                catalog_id = %id,
                db_error = ?err,
                "reference_resolver: catalog lookup failed"
            );
            GenerationError::Internal(err)
        })
    }

    async fn download(&self, kind: CatalogKind, entity: &CatalogEntity) -> GenerationResult<ReferenceImage> {
        let location = require_location(kind, entity)?;

        let bytes = self.storage.download(location).await.map_err(|err| {
            warn!(
                catalog_kind = %kind,
                catalog_id = %entity.id,
                location,
                error = ?err,
                "reference_resolver: reference download failed"
            );
            GenerationError::ExternalService {
                operation: "reference download",
                message: format!("{}: {:#}", kind, err),
            }
        })?;

        Ok(ReferenceImage::new(bytes, image_mime_type(location)))
    }
}

fn require(
    kind: CatalogKind,
    lookup: GenerationResult<Option<CatalogEntity>>,
) -> GenerationResult<CatalogEntity> {
    lookup?.ok_or_else(|| GenerationError::NotFound(kind.label().to_string()))
}

fn require_location(kind: CatalogKind, entity: &CatalogEntity) -> GenerationResult<&str> {
    entity
        .asset_location()
        .ok_or_else(|| GenerationError::NotFound(format!("{} image", kind.label())))
}

/// MIME type from the location's extension. Query strings are ignored and anything that
/// is not an image falls back to JPEG.
fn image_mime_type(location: &str) -> String {
    let path = location.split(['?', '#']).next().unwrap_or(location);

    mime_guess::from_path(path)
        .first()
        .filter(|mime| mime.type_() == mime_guess::mime::IMAGE)
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| FALLBACK_IMAGE_MIME.to_string())
}
