use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    entities::credit_transactions::CreditTransactionEntity,
    value_objects::enums::credit_operation_types::CreditOperationType,
};

pub const DEFAULT_HISTORY_LIMIT: i64 = 20;
pub const MAX_HISTORY_LIMIT: i64 = 100;

/// Credit prices and grants. Loaded once from the environment and handed to the
/// ledger and the generation use cases at construction time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreditCosts {
    pub signup_bonus: i32,
    pub image_generation: i32,
    pub bulk_image: i32,
}

impl Default for CreditCosts {
    fn default() -> Self {
        Self {
            signup_bonus: 10,
            image_generation: 5,
            bulk_image: 5,
        }
    }
}

/// One balance mutation as computed under the row lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceChange {
    pub balance_before: i32,
    pub amount: i32,
    pub balance_after: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceRejection {
    InsufficientCredits { required: i32, available: i32 },
    Overflow { balance: i32, amount: i32 },
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error(
    "ledger invariant violated: balance_before={balance_before} amount={amount} balance_after={balance_after}"
)]
pub struct BalanceInvariantViolation {
    pub balance_before: i32,
    pub amount: i32,
    pub balance_after: i32,
}

impl BalanceChange {
    /// Applies a signed `amount` to the locked balance. A debit that would take the
    /// balance below zero is rejected with the magnitude that was asked for.
    pub fn compute(balance_before: i32, amount: i32) -> Result<Self, BalanceRejection> {
        let Some(balance_after) = balance_before.checked_add(amount) else {
            return Err(BalanceRejection::Overflow {
                balance: balance_before,
                amount,
            });
        };

        if balance_after < 0 {
            return Err(BalanceRejection::InsufficientCredits {
                required: amount.saturating_neg(),
                available: balance_before,
            });
        }

        Ok(Self {
            balance_before,
            amount,
            balance_after,
        })
    }

    /// Re-checks `balance_after = balance_before + amount` and `balance_after >= 0`
    /// right before the row is written.
    pub fn verify(&self) -> Result<(), BalanceInvariantViolation> {
        let consistent = self.balance_before.checked_add(self.amount) == Some(self.balance_after)
            && self.balance_after >= 0;

        if consistent {
            Ok(())
        } else {
            Err(BalanceInvariantViolation {
                balance_before: self.balance_before,
                amount: self.amount,
                balance_after: self.balance_after,
            })
        }
    }
}

/// A signed change requested against one user's balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditMutation {
    pub user_id: Uuid,
    pub amount: i32,
    pub operation_type: CreditOperationType,
    pub description: String,
    pub related_entity_id: Option<Uuid>,
}

/// What happened to a mutation once the balance row was locked.
#[derive(Debug, Clone, PartialEq)]
pub enum BalanceMutation {
    Applied(CreditTransactionEntity),
    Rejected(BalanceRejection),
    AccountNotFound,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionHistoryFilter {
    pub page: i64,
    pub limit: i64,
    pub operation_type: Option<CreditOperationType>,
}

impl Default for TransactionHistoryFilter {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_HISTORY_LIMIT,
            operation_type: None,
        }
    }
}

impl TransactionHistoryFilter {
    pub fn normalized_limit(&self) -> i64 {
        self.limit.clamp(1, MAX_HISTORY_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1) * self.normalized_limit()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionHistoryPage {
    pub entries: Vec<CreditTransactionEntity>,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerAudit {
    pub user_id: Uuid,
    pub stored_balance: i32,
    pub replayed_balance: i64,
    pub entries: usize,
    pub broken_entries: Vec<Uuid>,
    pub consistent: bool,
}

impl LedgerAudit {
    /// Replays `entries` (oldest first) from a zero balance and compares the result,
    /// and every row's own arithmetic, with the stored balance.
    pub fn replay(user_id: Uuid, stored_balance: i32, entries: &[CreditTransactionEntity]) -> Self {
        let mut replayed_balance: i64 = 0;
        let mut broken_entries = Vec::new();

        for entry in entries {
            let chained = i64::from(entry.balance_before) == replayed_balance;
            let arithmetic = i64::from(entry.balance_before) + i64::from(entry.amount)
                == i64::from(entry.balance_after);
            if !chained || !arithmetic || entry.balance_after < 0 {
                broken_entries.push(entry.id);
            }
            replayed_balance += i64::from(entry.amount);
        }

        let consistent = broken_entries.is_empty() && replayed_balance == i64::from(stored_balance);

        Self {
            user_id,
            stored_balance,
            replayed_balance,
            entries: entries.len(),
            broken_entries,
            consistent,
        }
    }
}
