// src/models/mod.rs
pub mod capsule;
pub mod credential;
pub mod did;
