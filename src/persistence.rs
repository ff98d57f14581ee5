// File: src/persistence.rs
use crate::core::types::Mode;
use crate::error::Result;
use crate::progress::{DiscoveryHistory, PersonalStats};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Durable per-player key-value state. A value that was never written reads
/// as zero or empty.
pub trait Store {
    fn high_score(&self, mode: Mode) -> u32;
    fn set_high_score(&mut self, mode: Mode, value: u32) -> Result<()>;
    fn history(&self) -> DiscoveryHistory;
    fn record_play(&mut self, name: &str) -> Result<()>;
    fn milestone_watermark(&self) -> u32;
    fn set_milestone_watermark(&mut self, value: u32) -> Result<()>;
    fn personal_stats(&self) -> PersonalStats;
    fn set_personal_stats(&mut self, stats: &PersonalStats) -> Result<()>;
}

/// Everything a store keeps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Records {
    pub untimed_high_score: u32,
    pub timed_high_score: u32,
    pub history: DiscoveryHistory,
    pub milestone_watermark: u32,
    pub stats: PersonalStats,
}

impl Records {
    fn high_score(&self, mode: Mode) -> u32 {
        match mode {
            Mode::Untimed => self.untimed_high_score,
            Mode::Timed => self.timed_high_score,
        }
    }

    fn high_score_mut(&mut self, mode: Mode) -> &mut u32 {
        match mode {
            Mode::Untimed => &mut self.untimed_high_score,
            Mode::Timed => &mut self.timed_high_score,
        }
    }
}

/// Store that forgets everything when dropped.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Records,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &Records {
        &self.records
    }
}

impl Store for MemoryStore {
    fn high_score(&self, mode: Mode) -> u32 {
        self.records.high_score(mode)
    }

    fn set_high_score(&mut self, mode: Mode, value: u32) -> Result<()> {
        *self.records.high_score_mut(mode) = value;
        Ok(())
    }

    fn history(&self) -> DiscoveryHistory {
        self.records.history.clone()
    }

    fn record_play(&mut self, name: &str) -> Result<()> {
        self.records.history.record(name);
        Ok(())
    }

    fn milestone_watermark(&self) -> u32 {
        self.records.milestone_watermark
    }

    fn set_milestone_watermark(&mut self, value: u32) -> Result<()> {
        self.records.milestone_watermark = value;
        Ok(())
    }

    fn personal_stats(&self) -> PersonalStats {
        self.records.stats.clone()
    }

    fn set_personal_stats(&mut self, stats: &PersonalStats) -> Result<()> {
        self.records.stats = stats.clone();
        Ok(())
    }
}

/// Store backed by a single bincode file, rewritten atomically on every change.
///
/// Reads are served from memory. A failed write leaves the in-memory value
/// updated and returns the error.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    records: Records,
}

impl FileStore {
    /// Opens `path`; a missing or unreadable file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match load_from_disk(&path) {
            Ok(records) => records,
            Err(e) => {
                if path.exists() {
                    warn!("store: ignoring unreadable {}: {}", path.display(), e);
                }
                Records::default()
            }
        };
        Self { path, records }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn update(&mut self, apply: impl FnOnce(&mut Records)) -> Result<()> {
        apply(&mut self.records);
        save_to_disk(&self.records, &self.path)
    }
}

impl Store for FileStore {
    fn high_score(&self, mode: Mode) -> u32 {
        self.records.high_score(mode)
    }

    fn set_high_score(&mut self, mode: Mode, value: u32) -> Result<()> {
        self.update(|r| *r.high_score_mut(mode) = value)
    }

    fn history(&self) -> DiscoveryHistory {
        self.records.history.clone()
    }

    fn record_play(&mut self, name: &str) -> Result<()> {
        self.update(|r| {
            r.history.record(name);
        })
    }

    fn milestone_watermark(&self) -> u32 {
        self.records.milestone_watermark
    }

    fn set_milestone_watermark(&mut self, value: u32) -> Result<()> {
        self.update(|r| r.milestone_watermark = value)
    }

    fn personal_stats(&self) -> PersonalStats {
        self.records.stats.clone()
    }

    fn set_personal_stats(&mut self, stats: &PersonalStats) -> Result<()> {
        self.update(|r| r.stats = stats.clone())
    }
}

pub fn save_to_disk(records: &Records, path: &Path) -> Result<()> {
    let parent_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir)?;

    let temp_file = NamedTempFile::new_in(parent_dir)?;
    {
        let mut writer = BufWriter::new(&temp_file);
        bincode::serialize_into(&mut writer, records)?;
        writer.flush()?;
    }

    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

pub fn load_from_disk(path: &Path) -> Result<Records> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let records = bincode::deserialize_from(reader)?;
    Ok(records)
}
