use std::sync::Arc;

use crates::domain::{
    entities::credit_transactions::CreditTransactionEntity,
    repositories::credit_ledger::CreditLedgerRepository,
    value_objects::{
        credits::{
            BalanceInvariantViolation, BalanceMutation, BalanceRejection, CreditCosts,
            CreditMutation, LedgerAudit, TransactionHistoryFilter, TransactionHistoryPage,
        },
        enums::credit_operation_types::CreditOperationType,
    },
};
use http::StatusCode;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CreditLedgerError {
    #[error("invalid credit request: {0}")]
    Validation(String),
    #[error("credit account not found for user {0}")]
    UserNotFound(Uuid),
    #[error("insufficient credits: required {required}, available {available}")]
    InsufficientCredits { required: i32, available: i32 },
    #[error(transparent)]
    InvariantViolation(BalanceInvariantViolation),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CreditLedgerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CreditLedgerError::Validation(_) => StatusCode::BAD_REQUEST,
            CreditLedgerError::UserNotFound(_) => StatusCode::NOT_FOUND,
            CreditLedgerError::InsufficientCredits { .. } => StatusCode::PAYMENT_REQUIRED,
            CreditLedgerError::InvariantViolation(_) | CreditLedgerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn from_repository(err: anyhow::Error) -> Self {
        match err.downcast::<BalanceInvariantViolation>() {
            Ok(violation) => CreditLedgerError::InvariantViolation(violation),
            Err(err) => CreditLedgerError::Internal(err),
        }
    }
}

pub type LedgerResult<T> = std::result::Result<T, CreditLedgerError>;

/// Balance reads and the only write path to a user's credits. Every write goes through
/// `CreditLedgerRepository::apply_mutation`, which locks the balance row for the
/// read-validate-write and appends exactly one ledger row.
pub struct CreditLedgerUseCase<L>
where
    L: CreditLedgerRepository + Send + Sync + 'static,
{
    ledger_repo: Arc<L>,
    costs: CreditCosts,
}

impl<L> CreditLedgerUseCase<L>
where
    L: CreditLedgerRepository + Send + Sync + 'static,
{
    pub fn new(ledger_repo: Arc<L>, costs: CreditCosts) -> Self {
        Self { ledger_repo, costs }
    }

    pub fn costs(&self) -> CreditCosts {
        self.costs
    }

    pub async fn check_balance(&self, user_id: Uuid) -> LedgerResult<i32> {
        let account = self
            .ledger_repo
            .find_account(user_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    db_error = ?err,
                    "credit_ledger: failed to load balance"
                );
                CreditLedgerError::Internal(err)
            })?
            .ok_or(CreditLedgerError::UserNotFound(user_id))?;

        Ok(account.balance)
    }

    pub async fn add_credits(
        &self,
        user_id: Uuid,
        amount: i32,
        operation_type: CreditOperationType,
        description: &str,
    ) -> LedgerResult<CreditTransactionEntity> {
        if amount <= 0 {
            warn!(%user_id, amount, "credit_ledger: rejected non-positive credit");
            return Err(CreditLedgerError::Validation(
                "amount must be greater than zero".to_string(),
            ));
        }

        self.apply(CreditMutation {
            user_id,
            amount,
            operation_type,
            description: description.to_string(),
            related_entity_id: None,
        })
        .await
    }

    pub async fn deduct_credits_or_fail(
        &self,
        user_id: Uuid,
        amount: i32,
        operation_type: CreditOperationType,
        description: &str,
        related_entity_id: Option<Uuid>,
    ) -> LedgerResult<CreditTransactionEntity> {
        if amount <= 0 {
            warn!(%user_id, amount, "credit_ledger: rejected non-positive debit");
            return Err(CreditLedgerError::Validation(
                "amount must be greater than zero".to_string(),
            ));
        }

        self.apply(CreditMutation {
            user_id,
            amount: -amount,
            operation_type,
            description: description.to_string(),
            related_entity_id,
        })
        .await
    }

    pub async fn get_transaction_history(
        &self,
        user_id: Uuid,
        filter: TransactionHistoryFilter,
    ) -> LedgerResult<TransactionHistoryPage> {
        self.ledger_repo
            .list_transactions(user_id, filter)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    db_error = ?err,
                    "credit_ledger: failed to list transactions"
                );
                CreditLedgerError::Internal(err)
            })
    }

    /// Creates the balance row for a new user and books the signup grant. Returns the
    /// grant's ledger row, or `None` when the configured grant is zero.
    pub async fn open_account(&self, user_id: Uuid) -> LedgerResult<Option<CreditTransactionEntity>> {
        let created = self.ledger_repo.open_account(user_id).await.map_err(|err| {
            error!(
                %user_id,
                db_error = ?err,
                "credit_ledger: failed to open account"
            );
            CreditLedgerError::Internal(err)
        })?;

        if !created {
            return Err(CreditLedgerError::Validation(
                "credit account already exists".to_string(),
            ));
        }

        info!(%user_id, "credit_ledger: account opened");

        if self.costs.signup_bonus == 0 {
            return Ok(None);
        }

        let entry = self
            .add_credits(
                user_id,
                self.costs.signup_bonus,
                CreditOperationType::SignupBonus,
                "Signup bonus",
            )
            .await?;

        Ok(Some(entry))
    }

    pub async fn refund_generation(
        &self,
        user_id: Uuid,
        generation_id: Uuid,
        amount: i32,
    ) -> LedgerResult<CreditTransactionEntity> {
        if amount <= 0 {
            return Err(CreditLedgerError::Validation(
                "amount must be greater than zero".to_string(),
            ));
        }

        self.apply(CreditMutation {
            user_id,
            amount,
            operation_type: CreditOperationType::Refund,
            description: format!("Refund for generation {}", generation_id),
            related_entity_id: Some(generation_id),
        })
        .await
    }

    /// Replays the full ledger of a user against the stored balance.
    pub async fn audit(&self, user_id: Uuid) -> LedgerResult<LedgerAudit> {
        let stored_balance = self.check_balance(user_id).await?;
        let entries = self
            .ledger_repo
            .list_all_transactions(user_id)
            .await
            .map_err(CreditLedgerError::Internal)?;

        let audit = LedgerAudit::replay(user_id, stored_balance, &entries);
        if !audit.consistent {
            error!(
                %user_id,
                stored_balance,
                replayed_balance = audit.replayed_balance,
                broken_entries = audit.broken_entries.len(),
                "credit_ledger: ledger replay does not match stored balance"
            );
        }

        Ok(audit)
    }

    async fn apply(&self, mutation: CreditMutation) -> LedgerResult<CreditTransactionEntity> {
        let user_id = mutation.user_id;
        let amount = mutation.amount;
        let operation_type = mutation.operation_type;

        let outcome = self
            .ledger_repo
            .apply_mutation(mutation)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    amount,
                    operation_type = %operation_type,
                    db_error = ?err,
                    "credit_ledger: balance mutation failed"
                );
                CreditLedgerError::from_repository(err)
            })?;

        match outcome {
            BalanceMutation::Applied(entry) => {
                info!(
                    %user_id,
                    amount = entry.amount,
                    operation_type = %operation_type,
                    balance_before = entry.balance_before,
                    balance_after = entry.balance_after,
                    transaction_id = %entry.id,
                    "credit_ledger: balance updated"
                );
                Ok(entry)
            }
            BalanceMutation::Rejected(BalanceRejection::InsufficientCredits {
                required,
                available,
            }) => {
                warn!(
                    %user_id,
                    required,
                    available,
                    operation_type = %operation_type,
                    "credit_ledger: insufficient credits"
                );
                Err(CreditLedgerError::InsufficientCredits {
                    required,
                    available,
                })
            }
            BalanceMutation::Rejected(BalanceRejection::Overflow { balance, amount }) => {
                warn!(%user_id, balance, amount, "credit_ledger: balance overflow rejected");
                Err(CreditLedgerError::Validation(
                    "amount would overflow the balance".to_string(),
                ))
            }
            BalanceMutation::AccountNotFound => {
                warn!(%user_id, "credit_ledger: credit account not found");
                Err(CreditLedgerError::UserNotFound(user_id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::test_support::InMemoryLedger;
    use crates::domain::repositories::credit_ledger::MockCreditLedgerRepository;
    use futures_util::future::join_all;

    fn ledger(repo: Arc<InMemoryLedger>) -> CreditLedgerUseCase<InMemoryLedger> {
        CreditLedgerUseCase::new(repo, CreditCosts::default())
    }

    #[tokio::test]
    async fn non_positive_amounts_never_reach_the_repository() {
        // No expectations: any repository call would panic.
        let usecase = CreditLedgerUseCase::new(
            Arc::new(MockCreditLedgerRepository::new()),
            CreditCosts::default(),
        );
        let user_id = Uuid::new_v4();

        for amount in [0, -3] {
            let add = usecase
                .add_credits(user_id, amount, CreditOperationType::AdminAdjustment, "x")
                .await;
            assert!(matches!(add, Err(CreditLedgerError::Validation(_))));

            let deduct = usecase
                .deduct_credits_or_fail(user_id, amount, CreditOperationType::ImageGeneration, "x", None)
                .await;
            assert!(matches!(deduct, Err(CreditLedgerError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn deduction_stores_negated_amount_and_balances() {
        let repo = Arc::new(InMemoryLedger::default());
        let user_id = repo.seed(10);
        let usecase = ledger(Arc::clone(&repo));
        let generation_id = Uuid::new_v4();

        let entry = usecase
            .deduct_credits_or_fail(
                user_id,
                5,
                CreditOperationType::ImageGeneration,
                "Image generation",
                Some(generation_id),
            )
            .await
            .unwrap();

        assert_eq!(entry.amount, -5);
        assert_eq!(entry.balance_before, 10);
        assert_eq!(entry.balance_after, 5);
        assert_eq!(entry.related_entity_id, Some(generation_id));
        assert_eq!(entry.operation(), Some(CreditOperationType::ImageGeneration));
        assert_eq!(usecase.check_balance(user_id).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn overdraft_leaves_balance_and_ledger_untouched() {
        let repo = Arc::new(InMemoryLedger::default());
        let user_id = repo.seed(3);
        let usecase = ledger(Arc::clone(&repo));

        let result = usecase
            .deduct_credits_or_fail(user_id, 5, CreditOperationType::ImageGeneration, "x", None)
            .await;

        assert!(matches!(
            result,
            Err(CreditLedgerError::InsufficientCredits {
                required: 5,
                available: 3
            })
        ));
        assert_eq!(usecase.check_balance(user_id).await.unwrap(), 3);
        assert!(repo.entries_for(user_id).is_empty());
    }

    #[tokio::test]
    async fn concurrent_debits_for_a_single_charge_succeed_exactly_once() {
        let repo = Arc::new(InMemoryLedger::default());
        let user_id = repo.seed(5);
        let usecase = Arc::new(ledger(Arc::clone(&repo)));

        let attempts = (0..10).map(|_| {
            let usecase = Arc::clone(&usecase);
            async move {
                usecase
                    .deduct_credits_or_fail(
                        user_id,
                        5,
                        CreditOperationType::ImageGeneration,
                        "concurrent",
                        None,
                    )
                    .await
            }
        });
        let results = join_all(attempts).await;

        let succeeded = results.iter().filter(|result| result.is_ok()).count();
        let insufficient = results
            .iter()
            .filter(|result| matches!(result, Err(CreditLedgerError::InsufficientCredits { .. })))
            .count();

        assert_eq!(succeeded, 1);
        assert_eq!(insufficient, 9);
        assert_eq!(usecase.check_balance(user_id).await.unwrap(), 0);
        assert_eq!(repo.entries_for(user_id).len(), 1);
    }

    #[tokio::test]
    async fn replaying_the_ledger_reproduces_the_balance() {
        let repo = Arc::new(InMemoryLedger::default());
        let user_id = Uuid::new_v4();
        let usecase = ledger(Arc::clone(&repo));

        usecase.open_account(user_id).await.unwrap();
        usecase
            .add_credits(user_id, 20, CreditOperationType::AdminAdjustment, "top up")
            .await
            .unwrap();
        usecase
            .deduct_credits_or_fail(user_id, 5, CreditOperationType::ImageGeneration, "gen", None)
            .await
            .unwrap();
        let _ = usecase
            .deduct_credits_or_fail(user_id, 500, CreditOperationType::BulkGeneration, "bulk", None)
            .await;
        usecase
            .refund_generation(user_id, Uuid::new_v4(), 5)
            .await
            .unwrap();

        let entries = repo.entries_for(user_id);
        for entry in &entries {
            assert_eq!(entry.balance_after, entry.balance_before + entry.amount);
            assert!(entry.balance_after >= 0);
        }

        let audit = usecase.audit(user_id).await.unwrap();
        assert!(audit.consistent);
        assert_eq!(audit.entries, 4);
        assert_eq!(audit.replayed_balance, 30);
        assert_eq!(usecase.check_balance(user_id).await.unwrap(), 30);
    }

    #[tokio::test]
    async fn open_account_books_signup_bonus_once() {
        let repo = Arc::new(InMemoryLedger::default());
        let user_id = Uuid::new_v4();
        let usecase = ledger(Arc::clone(&repo));

        let grant = usecase.open_account(user_id).await.unwrap().unwrap();
        assert_eq!(grant.amount, CreditCosts::default().signup_bonus);
        assert_eq!(grant.operation(), Some(CreditOperationType::SignupBonus));

        let again = usecase.open_account(user_id).await;
        assert!(matches!(again, Err(CreditLedgerError::Validation(_))));
        assert_eq!(repo.entries_for(user_id).len(), 1);
    }

    #[tokio::test]
    async fn unknown_user_balance_is_not_found() {
        let mut repo = MockCreditLedgerRepository::new();
        repo.expect_find_account().returning(|_| Ok(None));
        let usecase = CreditLedgerUseCase::new(Arc::new(repo), CreditCosts::default());

        let result = usecase.check_balance(Uuid::new_v4()).await;

        assert!(matches!(result, Err(CreditLedgerError::UserNotFound(_))));
        assert_eq!(result.unwrap_err().status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invariant_violation_from_the_store_is_surfaced_typed() {
        let mut repo = MockCreditLedgerRepository::new();
        repo.expect_apply_mutation().returning(|_| {
            Err(anyhow::Error::new(BalanceInvariantViolation {
                balance_before: 10,
                amount: -5,
                balance_after: 4,
            }))
        });
        let usecase = CreditLedgerUseCase::new(Arc::new(repo), CreditCosts::default());

        let result = usecase
            .deduct_credits_or_fail(Uuid::new_v4(), 5, CreditOperationType::ImageGeneration, "x", None)
            .await;

        assert!(matches!(result, Err(CreditLedgerError::InvariantViolation(_))));
    }

    #[tokio::test]
    async fn history_is_passed_through_with_filter() {
        let repo = Arc::new(InMemoryLedger::default());
        let user_id = repo.seed(0);
        let usecase = ledger(Arc::clone(&repo));

        for amount in [1, 2, 3] {
            usecase
                .add_credits(user_id, amount, CreditOperationType::AdminAdjustment, "adj")
                .await
                .unwrap();
        }
        usecase
            .deduct_credits_or_fail(user_id, 1, CreditOperationType::ImageGeneration, "gen", None)
            .await
            .unwrap();

        let page = usecase
            .get_transaction_history(
                user_id,
                TransactionHistoryFilter {
                    page: 1,
                    limit: 2,
                    operation_type: Some(CreditOperationType::AdminAdjustment),
                },
            )
            .await
            .unwrap();

        assert_eq!(page.total, 3);
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].amount, 3);
        assert_eq!(page.entries[1].amount, 2);
    }
}
