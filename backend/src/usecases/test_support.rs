//! In-memory stand-ins for the persistence and storage ports, shared by the use case
//! tests. The ledger keeps one async mutex per user so concurrent mutations of the same
//! balance serialize the way `SELECT ... FOR UPDATE` does in Postgres.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crates::domain::{
    entities::{
        catalog::CatalogEntity,
        credit_transactions::CreditTransactionEntity,
        generations::{GenerationEntity, InsertGenerationEntity},
        user_credits::UserCreditEntity,
    },
    repositories::{
        catalog::CatalogRepository, credit_ledger::CreditLedgerRepository,
        generations::GenerationRepository, storage::BlobStorage,
    },
    value_objects::{
        credits::{
            BalanceChange, BalanceMutation, CreditMutation, TransactionHistoryFilter,
            TransactionHistoryPage,
        },
        enums::{catalog_kinds::CatalogKind, generation_statuses::GenerationStatus},
        generations::{CatalogReferences, ReferenceImage},
    },
};
use uuid::Uuid;

pub const PNG_BYTES: [u8; 12] = [
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D,
];

pub fn product_image() -> ReferenceImage {
    ReferenceImage::new(vec![0xFF, 0xD8, 0xFF, 0xE0], "image/jpeg")
}

#[derive(Default)]
pub struct InMemoryLedger {
    accounts: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<i32>>>>,
    entries: Mutex<Vec<CreditTransactionEntity>>,
}

impl InMemoryLedger {
    /// Opens an account with `balance` credits and no ledger history.
    pub fn seed(&self, balance: i32) -> Uuid {
        let user_id = Uuid::new_v4();
        self.accounts
            .lock()
            .unwrap()
            .insert(user_id, Arc::new(tokio::sync::Mutex::new(balance)));
        user_id
    }

    pub fn entries_for(&self, user_id: Uuid) -> Vec<CreditTransactionEntity> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .cloned()
            .collect()
    }

    fn account(&self, user_id: Uuid) -> Option<Arc<tokio::sync::Mutex<i32>>> {
        self.accounts.lock().unwrap().get(&user_id).cloned()
    }
}

#[async_trait]
impl CreditLedgerRepository for InMemoryLedger {
    async fn find_account(&self, user_id: Uuid) -> Result<Option<UserCreditEntity>> {
        let Some(account) = self.account(user_id) else {
            return Ok(None);
        };
        let balance = *account.lock().await;
        let now = Utc::now();

        Ok(Some(UserCreditEntity {
            user_id,
            balance,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }))
    }

    async fn open_account(&self, user_id: Uuid) -> Result<bool> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(&user_id) {
            return Ok(false);
        }
        accounts.insert(user_id, Arc::new(tokio::sync::Mutex::new(0)));
        Ok(true)
    }

    async fn apply_mutation(&self, mutation: CreditMutation) -> Result<BalanceMutation> {
        let Some(account) = self.account(mutation.user_id) else {
            return Ok(BalanceMutation::AccountNotFound);
        };

        let mut balance = account.lock().await;
        // Give other writers a chance to run while the lock is held.
        tokio::task::yield_now().await;

        let change = match BalanceChange::compute(*balance, mutation.amount) {
            Ok(change) => change,
            Err(rejection) => return Ok(BalanceMutation::Rejected(rejection)),
        };
        change.verify()?;

        let entry = CreditTransactionEntity {
            id: Uuid::new_v4(),
            user_id: mutation.user_id,
            amount: change.amount,
            operation_type: mutation.operation_type.to_string(),
            description: mutation.description,
            related_entity_id: mutation.related_entity_id,
            balance_before: change.balance_before,
            balance_after: change.balance_after,
            created_at: Utc::now(),
        };

        *balance = change.balance_after;
        self.entries.lock().unwrap().push(entry.clone());

        Ok(BalanceMutation::Applied(entry))
    }

    async fn list_transactions(
        &self,
        user_id: Uuid,
        filter: TransactionHistoryFilter,
    ) -> Result<TransactionHistoryPage> {
        let mut matching: Vec<CreditTransactionEntity> = self
            .entries_for(user_id)
            .into_iter()
            .filter(|entry| match filter.operation_type {
                Some(operation_type) => entry.operation() == Some(operation_type),
                None => true,
            })
            .collect();
        matching.reverse();

        let total = matching.len() as i64;
        let entries = matching
            .into_iter()
            .skip(filter.offset() as usize)
            .take(filter.normalized_limit() as usize)
            .collect();

        Ok(TransactionHistoryPage { entries, total })
    }

    async fn list_all_transactions(&self, user_id: Uuid) -> Result<Vec<CreditTransactionEntity>> {
        Ok(self.entries_for(user_id))
    }
}

#[derive(Default)]
pub struct InMemoryGenerations {
    rows: Mutex<Vec<GenerationEntity>>,
}

impl InMemoryGenerations {
    pub fn rows(&self) -> Vec<GenerationEntity> {
        self.rows.lock().unwrap().clone()
    }

    pub fn push(&self, row: GenerationEntity) {
        self.rows.lock().unwrap().push(row);
    }
}

#[async_trait]
impl GenerationRepository for InMemoryGenerations {
    async fn insert_generation(&self, generation: InsertGenerationEntity) -> Result<Uuid> {
        let id = generation.id;
        self.rows.lock().unwrap().push(GenerationEntity {
            id: generation.id,
            user_id: generation.user_id,
            industry_id: generation.industry_id,
            category_id: generation.category_id,
            product_type_id: generation.product_type_id,
            pose_id: generation.pose_id,
            theme_id: generation.theme_id,
            background_id: generation.background_id,
            ai_face_id: generation.ai_face_id,
            artifact_url: generation.artifact_url,
            artifact_path: generation.artifact_path,
            status: generation.status,
            error_message: generation.error_message,
            generation_time_ms: generation.generation_time_ms,
            expires_at: generation.expires_at,
            generation_type: generation.generation_type,
            created_at: generation.created_at,
        });
        Ok(id)
    }

    async fn mark_generation_charge_failed(
        &self,
        generation_id: Uuid,
        error_message: String,
    ) -> Result<()> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|row| row.id == generation_id)
            .ok_or_else(|| anyhow!("generation {} not found", generation_id))?;

        row.status = GenerationStatus::Failed.to_string();
        row.error_message = Some(error_message);
        row.artifact_url = None;
        row.artifact_path = None;
        row.expires_at = None;
        Ok(())
    }

    async fn find_user_generation(
        &self,
        user_id: Uuid,
        generation_id: Uuid,
    ) -> Result<Option<GenerationEntity>> {
        Ok(self
            .rows()
            .into_iter()
            .find(|row| row.id == generation_id && row.user_id == Some(user_id)))
    }

    async fn list_user_generations(
        &self,
        user_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<GenerationEntity>, i64)> {
        let mut rows: Vec<GenerationEntity> = self
            .rows()
            .into_iter()
            .filter(|row| row.user_id == Some(user_id))
            .collect();
        rows.reverse();

        let total = rows.len() as i64;
        let page = rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn list_expired_artifacts(
        &self,
        expired_after: DateTime<Utc>,
        expired_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<GenerationEntity>> {
        Ok(self
            .rows()
            .into_iter()
            .filter(|row| row.status() == GenerationStatus::Success && row.artifact_path.is_some())
            .filter(|row| {
                row.expires_at
                    .is_some_and(|expires_at| expires_at > expired_after && expires_at <= expired_before)
            })
            .take(limit as usize)
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryBlobStorage {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    downloads: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    fail_uploads: bool,
}

impl InMemoryBlobStorage {
    pub fn failing_uploads() -> Self {
        Self {
            fail_uploads: true,
            ..Self::default()
        }
    }

    pub fn put(&self, path: &str, bytes: Vec<u8>) {
        self.objects.lock().unwrap().insert(path.to_string(), bytes);
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.lock().unwrap().contains_key(path)
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStorage for InMemoryBlobStorage {
    async fn upload(&self, bytes: Vec<u8>, path: &str, _content_type: &str) -> Result<String> {
        if self.fail_uploads {
            return Err(anyhow!("bucket unavailable"));
        }
        self.put(path, bytes);
        Ok(format!("https://cdn.test/{}", path))
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>> {
        self.downloads.lock().unwrap().push(path.to_string());
        self.objects
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow!("object {} not found", path))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.objects.lock().unwrap().remove(path);
        self.deleted.lock().unwrap().push(path.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct StaticCatalog {
    rows: HashMap<(CatalogKind, Uuid), CatalogEntity>,
}

impl StaticCatalog {
    pub fn insert(&mut self, kind: CatalogKind, entity: CatalogEntity) {
        self.rows.insert((kind, entity.id), entity);
    }

    pub fn remove(&mut self, kind: CatalogKind, id: Uuid) {
        self.rows.remove(&(kind, id));
    }
}

#[async_trait]
impl CatalogRepository for StaticCatalog {
    async fn find_active(&self, kind: CatalogKind, id: Uuid) -> Result<Option<CatalogEntity>> {
        Ok(self.rows.get(&(kind, id)).cloned())
    }
}

pub fn catalog_row(name: &str, description: Option<&str>, image_path: Option<&str>) -> CatalogEntity {
    CatalogEntity {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: description.map(str::to_string),
        image_path: image_path.map(str::to_string),
        image_url: None,
    }
}

/// A fully populated catalog plus the blobs its face and background point at.
pub struct CatalogFixture {
    pub catalog: StaticCatalog,
    pub references: CatalogReferences,
}

impl CatalogFixture {
    pub fn new(storage: &InMemoryBlobStorage) -> Self {
        let mut catalog = StaticCatalog::default();

        let industry = catalog_row("Fashion", None, None);
        let category = catalog_row("Ethnic wear", None, None);
        let product_type = catalog_row("Saree", None, None);
        let pose = catalog_row(
            "Standing",
            Some("standing upright, one hand on the hip"),
            Some("poses/standing.png"),
        );
        let theme = catalog_row("Festive", None, None);
        let background = catalog_row("Studio", None, Some("backgrounds/studio.jpg"));
        let face = catalog_row("Asha", None, Some("faces/asha.webp"));

        storage.put("backgrounds/studio.jpg", vec![0xFF, 0xD8, 0xFF]);
        storage.put("faces/asha.webp", vec![b'R', b'I', b'F', b'F']);

        let references = CatalogReferences {
            industry_id: industry.id,
            category_id: category.id,
            product_type_id: product_type.id,
            pose_id: pose.id,
            theme_id: theme.id,
            background_id: background.id,
            ai_face_id: face.id,
        };

        catalog.insert(CatalogKind::Industry, industry);
        catalog.insert(CatalogKind::Category, category);
        catalog.insert(CatalogKind::ProductType, product_type);
        catalog.insert(CatalogKind::Pose, pose);
        catalog.insert(CatalogKind::Theme, theme);
        catalog.insert(CatalogKind::Background, background);
        catalog.insert(CatalogKind::Face, face);

        Self {
            catalog,
            references,
        }
    }

    /// Adds another pose with its own description and returns its id.
    pub fn add_pose(&mut self, description: &str) -> Uuid {
        let pose = catalog_row("Extra pose", Some(description), Some("poses/extra.png"));
        let id = pose.id;
        self.catalog.insert(CatalogKind::Pose, pose);
        id
    }
}
