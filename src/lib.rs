// src/lib.rs

pub mod analytics;
pub mod config;
pub mod core;
pub mod error;
pub mod persistence;
pub mod progress;
pub mod session;

pub use crate::config::GameConfig;
pub use crate::core::catalog::CatalogIndex;
pub use crate::core::engine::{Ending, Outcome, Report, RulesEngine};
pub use crate::core::types::{ChainEvent, Entry, Mode, Phase};
pub use crate::error::{Error, Result};
pub use crate::session::{DeepLink, Session, Turn};
