pub mod db;
pub mod image_generation;
pub mod storages;
