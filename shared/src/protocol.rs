//! Wire contract between game clients and the lobby server
//!
//! Every message is one JSON document. A connection opens with a
//! [`Handshake`], then sends [`ClientAction`]s tagged by `action` with their
//! payload under `data`. The server answers with [`ServerEvent`]s tagged by
//! `type`.

use crate::traversal::Solution;
use crate::tree::{NodeId, Tree};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A submitted answer: node id to claimed visit index.
pub type Answer = BTreeMap<NodeId, u32>;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: usize,
    pub title: String,
    pub tree: Tree,
    pub solution: Solution,
}

impl Question {
    /// Exact match on every key of the solution. Extra keys are ignored.
    pub fn is_correct(&self, answer: &Answer) -> bool {
        self.solution
            .iter()
            .all(|(id, index)| answer.get(id) == Some(index))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LobbyState {
    Waiting,
    Running,
    Ended,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub id: String,
    pub name: String,
    pub score: f64,
}

/// Roster entry shown to players. Ids are credentials and stay host-only.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlayerView {
    pub name: String,
    pub score: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub name: String,
    pub score: f64,
}

/// First message on every connection.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Handshake {
    Create,
    #[serde(rename_all = "camelCase")]
    Join { name: String, lobby_code: String },
    #[serde(rename_all = "camelCase")]
    Rejoin { id: String, lobby_code: String },
}

/// In-session requests. `host_id` carries the host token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "action", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientAction {
    #[serde(rename_all = "camelCase")]
    StartGame { host_id: String },
    #[serde(rename_all = "camelCase")]
    EndGame { host_id: String },
    #[serde(rename_all = "camelCase")]
    KickPlayer { host_id: String, player_id: String },
    #[serde(rename_all = "camelCase")]
    PlayerLeave { player_id: String },
    #[serde(rename_all = "camelCase")]
    GetAllPlayers { host_id: String },
    GetLeaderboard {},
    #[serde(rename_all = "camelCase")]
    GetRank { player_id: String },
    #[serde(rename_all = "camelCase")]
    GetScore { player_id: String },
    #[serde(rename_all = "camelCase")]
    SubmitAnswer {
        player_id: String,
        answer: Answer,
        question_number: usize,
    },
}

impl ClientAction {
    /// Parses one action line. A missing `data` payload reads as `{}`, so
    /// actions without fields may omit it.
    pub fn from_json(line: &str) -> Result<Self, serde_json::Error> {
        let mut value: serde_json::Value = serde_json::from_str(line)?;
        if let Some(object) = value.as_object_mut() {
            object
                .entry("data")
                .or_insert_with(|| serde_json::Value::Object(Default::default()));
        }
        serde_json::from_value(value)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    Unauthorized,
    Duplicate,
    InvalidState,
    Malformed,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    LobbyCreated { lobby_code: String, host_token: String },
    #[serde(rename_all = "camelCase")]
    JoinedLobby {
        lobby_code: String,
        player_id: String,
        name: String,
        players: Vec<PlayerView>,
    },
    PlayerJoined { player: PlayerSummary },
    #[serde(rename_all = "camelCase")]
    GameStarted {
        questions: Vec<Question>,
        duration_secs: u64,
    },
    #[serde(rename_all = "camelCase")]
    GameStartedHost {
        question_count: usize,
        duration_secs: u64,
    },
    AllPlayers { players: Vec<PlayerSummary> },
    #[serde(rename_all = "camelCase")]
    PlayerLeft { player_id: String },
    PlayerKicked { reason: String },
    #[serde(rename_all = "camelCase")]
    Rank { player_id: String, rank: usize },
    #[serde(rename_all = "camelCase")]
    Score {
        player_id: String,
        name: String,
        score: f64,
    },
    Leaderboard { leaderboard: Vec<LeaderboardRow> },
    #[serde(rename_all = "camelCase")]
    AnswerReceived {
        question_number: usize,
        correct: bool,
        score: f64,
    },
    #[serde(rename_all = "camelCase")]
    Rejoined {
        lobby_code: String,
        player_id: String,
        name: String,
        score: f64,
        state: LobbyState,
        elapsed: f64,
    },
    #[serde(rename_all = "camelCase")]
    GameEnd {
        elapsed: f64,
        score: f64,
        num_correct: usize,
        answers: Vec<bool>,
        session_leaderboard: Vec<LeaderboardRow>,
        global_leaderboard: Vec<LeaderboardRow>,
        session_rank: usize,
        global_rank: Option<usize>,
    },
    #[serde(rename_all = "camelCase")]
    GameEndHost {
        elapsed: f64,
        session_leaderboard: Vec<LeaderboardRow>,
        global_leaderboard: Vec<LeaderboardRow>,
    },
    Error { code: ErrorCode, message: String },
}

impl ServerEvent {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerEvent::Error {
            code,
            message: message.into(),
        }
    }
}
