use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    domain::value_objects::enums::credit_operation_types::CreditOperationType,
    infra::db::postgres::schema::credit_transactions,
};

/// Append-only ledger row. Never updated or deleted once inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Identifiable, Selectable, Queryable)]
#[diesel(table_name = credit_transactions)]
pub struct CreditTransactionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i32,
    pub operation_type: String,
    pub description: String,
    pub related_entity_id: Option<Uuid>,
    pub balance_before: i32,
    pub balance_after: i32,
    pub created_at: DateTime<Utc>,
}

impl CreditTransactionEntity {
    pub fn operation(&self) -> Option<CreditOperationType> {
        CreditOperationType::from_str(&self.operation_type)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = credit_transactions)]
pub struct InsertCreditTransactionEntity {
    pub user_id: Uuid,
    pub amount: i32,
    pub operation_type: String,
    pub description: String,
    pub related_entity_id: Option<Uuid>,
    pub balance_before: i32,
    pub balance_after: i32,
    pub created_at: DateTime<Utc>,
}
