pub mod bulk_generation;
pub mod cleanup_expired_generations;
pub mod cleanup_scheduler;
pub mod credit_ledger;
pub mod generation;
pub mod generation_history;
pub mod generation_pipeline;
pub mod prompt;
pub mod reference_resolver;

#[cfg(test)]
pub(crate) mod test_support;
