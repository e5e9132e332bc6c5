//! Global leaderboard persisted as a JSON file
//!
//! All lobbies share one [`Leaderboard`]. Every insert runs under a single
//! lock together with its file write, so lobbies ending at the same time
//! cannot overwrite each other's entries.

use crate::error::LeaderboardError;
use log::info;
use serde::{Deserialize, Serialize};
use shared::LeaderboardRow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: f64,
}

#[derive(Debug)]
pub struct Leaderboard {
    /// Entries sorted by score, highest first
    entries: Mutex<Vec<LeaderboardEntry>>,
    path: Option<PathBuf>,
}

impl Leaderboard {
    /// A leaderboard that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            path: None,
        }
    }

    /// Loads the leaderboard at `path`. A missing file starts empty.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LeaderboardError> {
        let path = path.as_ref().to_path_buf();
        let mut entries: Vec<LeaderboardEntry> = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            info!("Leaderboard {} does not exist yet, starting empty", path.display());
            Vec::new()
        };
        // Stable: equal scores keep their file order
        entries.sort_by(|a, b| b.score.total_cmp(&a.score));

        info!("Loaded {} leaderboard entries from {}", entries.len(), path.display());
        Ok(Self {
            entries: Mutex::new(entries),
            path: Some(path),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<LeaderboardEntry>>, LeaderboardError> {
        self.entries.lock().map_err(|_| LeaderboardError::Poisoned)
    }

    /// Inserts an entry and persists the board, returning its 1-based rank.
    ///
    /// The entry goes after every existing entry with an equal or higher score.
    /// If the board cannot be persisted the entry is taken out again.
    pub fn add_entry(&self, name: &str, score: f64) -> Result<usize, LeaderboardError> {
        let mut entries = self.lock()?;
        let index = insertion_index(&entries, score);
        entries.insert(
            index,
            LeaderboardEntry {
                name: name.to_string(),
                score,
            },
        );

        if let Some(path) = &self.path {
            if let Err(e) = persist(path, &entries) {
                entries.remove(index);
                return Err(e);
            }
        }
        Ok(index + 1)
    }

    /// Highest `n` entries with their ranks.
    pub fn top_n(&self, n: usize) -> Result<Vec<LeaderboardRow>, LeaderboardError> {
        let entries = self.lock()?;
        Ok(entries
            .iter()
            .take(n)
            .enumerate()
            .map(|(i, entry)| LeaderboardRow {
                rank: i + 1,
                name: entry.name.clone(),
                score: entry.score,
            })
            .collect())
    }

    /// Rank a new entry with `score` would receive.
    pub fn position_of(&self, score: f64) -> Result<usize, LeaderboardError> {
        let entries = self.lock()?;
        Ok(insertion_index(&entries, score) + 1)
    }

    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn scores(&self) -> Vec<f64> {
        self.lock()
            .map(|entries| entries.iter().map(|e| e.score).collect())
            .unwrap_or_default()
    }
}

fn persist(path: &Path, entries: &[LeaderboardEntry]) -> Result<(), LeaderboardError> {
    fs::write(path, serde_json::to_string(entries)?)?;
    Ok(())
}

fn insertion_index(entries: &[LeaderboardEntry], score: f64) -> usize {
    entries.partition_point(|entry| entry.score >= score)
}
