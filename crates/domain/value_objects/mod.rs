pub mod catalog;
pub mod credits;
pub mod enums;
pub mod generations;
