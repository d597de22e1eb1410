use crate::domain::value_objects::generations::ReferenceImage;

/// Binary and textual inputs fetched for one generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceAssets {
    pub face: ReferenceImage,
    pub background: ReferenceImage,
    pub pose_description: String,
}

/// Face and background are identical across a bulk fan-out, so they are fetched once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedAssets {
    pub face: ReferenceImage,
    pub background: ReferenceImage,
}
