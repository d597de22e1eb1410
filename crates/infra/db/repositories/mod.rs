pub mod catalog;
pub mod credit_ledger;
pub mod generations;
