use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// The catalog tables a generation request can reference.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    Industry,
    Category,
    ProductType,
    Pose,
    Theme,
    Background,
    Face,
}

impl CatalogKind {
    /// Fixed order in which missing references are reported.
    pub const VALIDATION_ORDER: [CatalogKind; 7] = [
        CatalogKind::Industry,
        CatalogKind::Category,
        CatalogKind::ProductType,
        CatalogKind::Pose,
        CatalogKind::Theme,
        CatalogKind::Background,
        CatalogKind::Face,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CatalogKind::Industry => "Industry",
            CatalogKind::Category => "Category",
            CatalogKind::ProductType => "Product type",
            CatalogKind::Pose => "Pose",
            CatalogKind::Theme => "Theme",
            CatalogKind::Background => "Background",
            CatalogKind::Face => "AI face",
        }
    }
}

impl Display for CatalogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
