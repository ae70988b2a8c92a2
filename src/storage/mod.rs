// src/storage/mod.rs
pub mod capsule_store;
pub mod credential_repository;
