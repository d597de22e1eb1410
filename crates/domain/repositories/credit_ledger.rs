use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::{credit_transactions::CreditTransactionEntity, user_credits::UserCreditEntity},
    value_objects::credits::{
        BalanceMutation, CreditMutation, TransactionHistoryFilter, TransactionHistoryPage,
    },
};

#[automock]
#[async_trait]
pub trait CreditLedgerRepository {
    /// Returns the live (not soft-deleted) balance row for the user.
    async fn find_account(&self, user_id: Uuid) -> Result<Option<UserCreditEntity>>;

    /// Creates a zero balance row. Returns `false` when the row already exists.
    async fn open_account(&self, user_id: Uuid) -> Result<bool>;

    /// Locks the balance row, applies the signed amount and appends the ledger row in
    /// one transaction. Business rejections come back as `Ok`.
    async fn apply_mutation(&self, mutation: CreditMutation) -> Result<BalanceMutation>;

    async fn list_transactions(
        &self,
        user_id: Uuid,
        filter: TransactionHistoryFilter,
    ) -> Result<TransactionHistoryPage>;

    /// Every ledger row of the user, oldest first.
    async fn list_all_transactions(&self, user_id: Uuid) -> Result<Vec<CreditTransactionEntity>>;
}
