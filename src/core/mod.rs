// src/core/mod.rs
pub mod catalog;
pub mod engine;
pub mod kana;
pub mod ledger;
pub mod types;
