use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CreditOperationType {
    SignupBonus,
    ImageGeneration,
    BulkGeneration,
    FaceSwap,
    AdminAdjustment,
    Refund,
}

impl CreditOperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditOperationType::SignupBonus => "signup_bonus",
            CreditOperationType::ImageGeneration => "image_generation",
            CreditOperationType::BulkGeneration => "bulk_generation",
            CreditOperationType::FaceSwap => "face_swap",
            CreditOperationType::AdminAdjustment => "admin_adjustment",
            CreditOperationType::Refund => "refund",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "signup_bonus" => Some(CreditOperationType::SignupBonus),
            "image_generation" => Some(CreditOperationType::ImageGeneration),
            "bulk_generation" => Some(CreditOperationType::BulkGeneration),
            "face_swap" => Some(CreditOperationType::FaceSwap),
            "admin_adjustment" => Some(CreditOperationType::AdminAdjustment),
            "refund" => Some(CreditOperationType::Refund),
            _ => None,
        }
    }
}

impl Display for CreditOperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
