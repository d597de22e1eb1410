pub mod catalog;
pub mod credit_ledger;
pub mod generations;
pub mod image_generator;
pub mod storage;
