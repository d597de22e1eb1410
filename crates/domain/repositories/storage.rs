use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

#[automock]
#[async_trait]
pub trait BlobStorage {
    /// Stores `bytes` under `path` and returns the public URL of the object.
    async fn upload(&self, bytes: Vec<u8>, path: &str, content_type: &str) -> Result<String>;

    async fn download(&self, path: &str) -> Result<Vec<u8>>;

    /// Idempotent: deleting a missing object succeeds.
    async fn delete(&self, path: &str) -> Result<()>;
}
