// File: src/analytics.rs
use crate::core::types::Mode;
use crate::error::Result;
use log::info;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsEvent {
    EntryAnswered { name: String },
    GameCleared { score: u32, chain_length: usize, mode: Mode },
    GameOver { score: u32, chain_length: usize, mode: Mode },
}

impl AnalyticsEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AnalyticsEvent::EntryAnswered { .. } => "pokemon_answer",
            AnalyticsEvent::GameCleared { .. } => "game_clear",
            AnalyticsEvent::GameOver { .. } => "game_over",
        }
    }

    /// Event parameters. Game results carry per-mode copies of score and
    /// chain length; the inactive mode reports zero.
    pub fn payload(&self) -> Value {
        match self {
            AnalyticsEvent::EntryAnswered { name } => json!({ "pokemon_name": name }),
            AnalyticsEvent::GameCleared { score, chain_length, mode }
            | AnalyticsEvent::GameOver { score, chain_length, mode } => {
                let single = *mode == Mode::Untimed;
                let split = |value: u64, wanted: bool| if wanted { value } else { 0 };
                let score = u64::from(*score);
                let chain = *chain_length as u64;
                json!({
                    "d_score_single": split(score, single),
                    "d_score_timeattack": split(score, !single),
                    "d_chain_length_single": split(chain, single),
                    "d_chain_length_timeattack": split(chain, !single),
                    "score": score,
                    "chain_length": chain,
                    "game_mode": mode.key(),
                })
            }
        }
    }
}

/// Fire-and-forget event sink. Errors are reported but never change gameplay.
pub trait Analytics {
    fn emit(&self, event: &AnalyticsEvent) -> Result<()>;
}

/// Sink that writes events to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAnalytics;

impl Analytics for LogAnalytics {
    fn emit(&self, event: &AnalyticsEvent) -> Result<()> {
        info!("analytics: {} {}", event.name(), event.payload());
        Ok(())
    }
}
