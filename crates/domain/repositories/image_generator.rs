use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;

use crate::domain::value_objects::generations::ReferenceImage;

#[automock]
#[async_trait]
pub trait ImageGenerator {
    /// Returns the raw bytes of the generated image.
    async fn generate(&self, reference_images: Vec<ReferenceImage>, prompt: String)
    -> Result<Vec<u8>>;
}
