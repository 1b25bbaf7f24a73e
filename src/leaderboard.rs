//! Leaderboard for finished runs
//!
//! The simulation only reports a final score and wave; this keeps the top
//! entries in memory. Storing them anywhere durable is the host's business.

use serde::{Deserialize, Serialize};

/// Maximum number of entries to keep
pub const MAX_ENTRIES: usize = 10;

/// Receives the result of a finished run
pub trait ScoreSink {
    /// Returns the rank achieved (1-indexed), if any
    fn submit(&mut self, name: &str, score: u64, wave: u32) -> Option<usize>;
}

/// A single leaderboard entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: u64,
    pub wave: u32,
}

/// Top-N leaderboard, sorted descending by score
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Leaderboard {
    pub entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a score would make the board
    pub fn qualifies(&self, score: u64) -> bool {
        if score == 0 {
            return false;
        }
        if self.entries.len() < MAX_ENTRIES {
            return true;
        }
        self.entries.last().map(|e| score > e.score).unwrap_or(true)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }
}

impl ScoreSink for Leaderboard {
    fn submit(&mut self, name: &str, score: u64, wave: u32) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }

        let entry = LeaderboardEntry {
            name: name.to_string(),
            score,
            wave,
        };

        // Ties keep the older entry ahead
        let rank = match self.entries.iter().position(|e| score > e.score) {
            Some(i) => {
                self.entries.insert(i, entry);
                i + 1
            }
            None => {
                self.entries.push(entry);
                self.entries.len()
            }
        };
        self.entries.truncate(MAX_ENTRIES);

        log::info!("{} placed #{} with {} (wave {})", name, rank, score, wave);
        Some(rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_score_never_qualifies() {
        let mut board = Leaderboard::new();
        assert_eq!(board.submit("ash", 0, 1), None);
        assert!(board.is_empty());
    }

    #[test]
    fn entries_sorted_and_truncated() {
        let mut board = Leaderboard::new();
        for i in 1..=12u64 {
            board.submit("p", i * 100, i as u32);
        }
        assert_eq!(board.entries.len(), MAX_ENTRIES);
        assert_eq!(board.top_score(), Some(1200));
        assert_eq!(board.entries.last().map(|e| e.score), Some(300));
        assert_eq!(board.submit("late", 150, 1), None);
    }

    #[test]
    fn rank_reported() {
        let mut board = Leaderboard::new();
        board.submit("a", 500, 3);
        board.submit("b", 100, 1);
        assert_eq!(board.submit("c", 300, 2), Some(2));
    }
}
