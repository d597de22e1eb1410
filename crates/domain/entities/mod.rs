pub mod catalog;
pub mod credit_transactions;
pub mod generations;
pub mod user_credits;
