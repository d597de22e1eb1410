use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use diesel::{
    Connection, RunQueryDsl,
    dsl::{count_star, max},
    insert_into,
    pg::Pg,
    prelude::*,
    update,
};
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

use crate::{
    domain::{
        entities::{
            credit_transactions::{CreditTransactionEntity, InsertCreditTransactionEntity},
            user_credits::{InsertUserCreditEntity, UserCreditEntity},
        },
        repositories::credit_ledger::CreditLedgerRepository,
        value_objects::{
            credits::{
                BalanceChange, BalanceMutation, CreditMutation, TransactionHistoryFilter,
                TransactionHistoryPage,
            },
            enums::credit_operation_types::CreditOperationType,
        },
    },
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{credit_transactions, user_credits},
    },
};

pub struct CreditLedgerPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl CreditLedgerPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn filtered_transactions(
    user_id: Uuid,
    operation_type: Option<CreditOperationType>,
) -> credit_transactions::BoxedQuery<'static, Pg> {
    let mut query = credit_transactions::table
        .filter(credit_transactions::user_id.eq(user_id))
        .into_boxed();

    if let Some(operation_type) = operation_type {
        query = query.filter(credit_transactions::operation_type.eq(operation_type.as_str()));
    }

    query
}

/// Timestamp for a new ledger row that sorts strictly after the user's previous row,
/// even when app hosts disagree about the time. Postgres keeps microseconds.
fn next_entry_timestamp(now: DateTime<Utc>, last_entry_at: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = now.trunc_subsecs(6);
    match last_entry_at {
        Some(last) if last >= now => last + TimeDelta::microseconds(1),
        _ => now,
    }
}

#[async_trait]
impl CreditLedgerRepository for CreditLedgerPostgres {
    async fn find_account(&self, user_id: Uuid) -> Result<Option<UserCreditEntity>> {
        // Diesel is synchronous; run DB work on the blocking threadpool to avoid stalling
        // Tokio under load.
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<UserCreditEntity>> {
            let mut conn = db_pool.get()?;

            let account = user_credits::table
                .filter(user_credits::user_id.eq(user_id))
                .filter(user_credits::deleted_at.is_null())
                .select(UserCreditEntity::as_select())
                .first::<UserCreditEntity>(&mut conn)
                .optional()?;

            Ok(account)
        })
        .await??)
    }

    async fn open_account(&self, user_id: Uuid) -> Result<bool> {
        let db_pool = Arc::clone(&self.db_pool);
        let now = Utc::now();

        Ok(task::spawn_blocking(move || -> Result<bool> {
            let mut conn = db_pool.get()?;

            let inserted = insert_into(user_credits::table)
                .values(&InsertUserCreditEntity {
                    user_id,
                    balance: 0,
                    created_at: now,
                    updated_at: now,
                })
                .on_conflict(user_credits::user_id)
                .do_nothing()
                .execute(&mut conn)?;

            Ok(inserted == 1)
        })
        .await??)
    }

    async fn apply_mutation(&self, mutation: CreditMutation) -> Result<BalanceMutation> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<BalanceMutation> {
            let mut conn = db_pool.get()?;

            // The row lock serializes concurrent writers of the same balance: a second
            // caller blocks on FOR UPDATE until this transaction commits or rolls back,
            // then reads the committed balance.
            conn.transaction::<BalanceMutation, anyhow::Error, _>(|tx| {
                let locked_balance = user_credits::table
                    .filter(user_credits::user_id.eq(mutation.user_id))
                    .filter(user_credits::deleted_at.is_null())
                    .select(user_credits::balance)
                    .for_update()
                    .first::<i32>(tx)
                    .optional()?;

                let Some(balance_before) = locked_balance else {
                    return Ok(BalanceMutation::AccountNotFound);
                };

                let change = match BalanceChange::compute(balance_before, mutation.amount) {
                    Ok(change) => change,
                    Err(rejection) => return Ok(BalanceMutation::Rejected(rejection)),
                };

                // Returning the violation as an error rolls the transaction back.
                change.verify()?;

                // Safe to read under the balance row lock: no other writer can append
                // for this user until we commit.
                let last_entry_at = credit_transactions::table
                    .filter(credit_transactions::user_id.eq(mutation.user_id))
                    .select(max(credit_transactions::created_at))
                    .get_result::<Option<DateTime<Utc>>>(tx)?;
                let now = next_entry_timestamp(Utc::now(), last_entry_at);

                update(user_credits::table.filter(user_credits::user_id.eq(mutation.user_id)))
                    .set((
                        user_credits::balance.eq(change.balance_after),
                        user_credits::updated_at.eq(now),
                    ))
                    .execute(tx)?;

                let entry = insert_into(credit_transactions::table)
                    .values(&InsertCreditTransactionEntity {
                        user_id: mutation.user_id,
                        amount: change.amount,
                        operation_type: mutation.operation_type.to_string(),
                        description: mutation.description.clone(),
                        related_entity_id: mutation.related_entity_id,
                        balance_before: change.balance_before,
                        balance_after: change.balance_after,
                        created_at: now,
                    })
                    .returning(CreditTransactionEntity::as_returning())
                    .get_result::<CreditTransactionEntity>(tx)?;

                Ok(BalanceMutation::Applied(entry))
            })
        })
        .await??)
    }

    async fn list_transactions(
        &self,
        user_id: Uuid,
        filter: TransactionHistoryFilter,
    ) -> Result<TransactionHistoryPage> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<TransactionHistoryPage> {
            let mut conn = db_pool.get()?;

            let total = filtered_transactions(user_id, filter.operation_type)
                .select(count_star())
                .get_result::<i64>(&mut conn)?;

            let entries = filtered_transactions(user_id, filter.operation_type)
                .select(CreditTransactionEntity::as_select())
                .order((
                    credit_transactions::created_at.desc(),
                    credit_transactions::id.desc(),
                ))
                .offset(filter.offset())
                .limit(filter.normalized_limit())
                .load::<CreditTransactionEntity>(&mut conn)?;

            Ok(TransactionHistoryPage { entries, total })
        })
        .await??)
    }

    async fn list_all_transactions(&self, user_id: Uuid) -> Result<Vec<CreditTransactionEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Vec<CreditTransactionEntity>> {
            let mut conn = db_pool.get()?;

            let entries = credit_transactions::table
                .filter(credit_transactions::user_id.eq(user_id))
                .select(CreditTransactionEntity::as_select())
                .order((
                    credit_transactions::created_at.asc(),
                    credit_transactions::id.asc(),
                ))
                .load::<CreditTransactionEntity>(&mut conn)?;

            Ok(entries)
        })
        .await??)
    }
}
