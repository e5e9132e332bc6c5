//! Per-player bookkeeping inside a lobby
//!
//! A player only records outcomes and keeps the score. Deciding whether an
//! answer is correct is the lobby's job since it owns the question set.

use crate::connection::Connection;
use shared::{PlayerSummary, PlayerView, ServerEvent};
use std::collections::HashMap;

/// Flat points for every correct answer
pub const BASE_POINTS: f64 = 100.0;
/// Points scaled by the seconds since the previous scored answer
pub const TIME_POINTS: f64 = 900.0;
/// Seconds that yield the full time bonus
pub const TIME_SCALE_SECS: f64 = 100.0;

#[derive(Debug)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub score: f64,
    /// Question index -> whether it was answered correctly. Set once per index.
    pub question_history: HashMap<usize, bool>,
    /// Game clock reading at the last scored answer
    pub prev_answer_timestamp: f64,
    connection: Connection,
}

impl Player {
    pub fn new(id: String, name: String, connection: Connection) -> Self {
        Self {
            id,
            name,
            score: 0.0,
            question_history: HashMap::new(),
            prev_answer_timestamp: 0.0,
            connection,
        }
    }

    /// Scores an answer unless this question was already scored.
    ///
    /// A correct answer is worth `100 + 900 * (elapsed / 100)` where `elapsed`
    /// is the time since the previous scored answer. Returns false when the
    /// question had already been answered.
    pub fn record_answer(&mut self, question_index: usize, correct: bool, clock_time: f64) -> bool {
        if self.question_history.contains_key(&question_index) {
            return false;
        }

        self.question_history.insert(question_index, correct);
        if correct {
            let since_previous = clock_time - self.prev_answer_timestamp;
            self.score += BASE_POINTS + TIME_POINTS * (since_previous / TIME_SCALE_SECS);
        }
        self.prev_answer_timestamp = clock_time;
        true
    }

    pub fn has_answered(&self, question_index: usize) -> bool {
        self.question_history.contains_key(&question_index)
    }

    pub fn num_correct(&self) -> usize {
        self.question_history.values().filter(|correct| **correct).count()
    }

    /// Outcome per question; unanswered questions count as incorrect.
    pub fn answers(&self, question_count: usize) -> Vec<bool> {
        (0..question_count)
            .map(|i| self.question_history.get(&i).copied().unwrap_or(false))
            .collect()
    }

    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            score: self.score,
        }
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            name: self.name.clone(),
            score: self.score,
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn send(&self, event: ServerEvent) {
        self.connection.send(event);
    }

    /// Closes the current socket and adopts `connection` in its place.
    pub fn replace_connection(&mut self, connection: Connection) {
        self.connection.close();
        self.connection = connection;
    }
}
