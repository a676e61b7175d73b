pub mod account;
pub mod memory;
pub mod postgres_repository;
