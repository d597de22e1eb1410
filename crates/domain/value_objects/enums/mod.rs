pub mod catalog_kinds;
pub mod credit_operation_types;
pub mod generation_statuses;
pub mod generation_types;
