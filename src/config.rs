// File: src/config.rs
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tunable rules. Every field has a default, so a config file only needs the
/// values it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub reroll_budget: u32,
    pub reroll_penalty: u32,
    pub duplicate_penalty: u32,
    pub hint_cost: u32,
    pub goal_bonus: u32,
    /// Countdown length for timed sessions.
    pub time_limit_secs: u32,
    /// Names that may never be played but always count as discovered.
    pub restricted_names: Vec<String>,
    /// Page that replays a start and goal pair from `?start=<id>&goal=<id>`.
    pub share_url: String,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            reroll_budget: 3,
            reroll_penalty: 2,
            duplicate_penalty: 5,
            hint_cost: 1,
            goal_bonus: 10,
            time_limit_secs: 60,
            restricted_names: vec!["ニドラン♀".to_string(), "ニドラン♂".to_string()],
            share_url: "https://ny-an.github.io/pokeshiri-game/".to_string(),
        }
    }
}

impl GameConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: GameConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    pub fn is_restricted(&self, name: &str) -> bool {
        self.restricted_names.iter().any(|n| n == name)
    }

    fn validate(&self) -> Result<()> {
        if self.time_limit_secs == 0 {
            return Err(Error::Config("time_limit_secs must be positive".to_string()));
        }
        Ok(())
    }
}
