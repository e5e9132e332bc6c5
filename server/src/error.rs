use shared::{ErrorCode, LobbyState, ServerEvent};
use thiserror::Error;

/// Rejections produced by lobby operations. None of them change lobby state.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LobbyError {
    #[error("lobby {0} not found")]
    LobbyNotFound(String),
    #[error("player {0} not found")]
    PlayerNotFound(String),
    #[error("no identity {0} in this lobby")]
    IdentityNotFound(String),
    #[error("question {0} does not exist")]
    QuestionNotFound(usize),
    #[error("host token does not match")]
    Unauthorized,
    #[error("name {0} is already taken")]
    DuplicateName(String),
    #[error("question {0} has already been answered")]
    AlreadyAnswered(usize),
    #[error("not allowed while the lobby is {0:?}")]
    InvalidState(LobbyState),
    #[error("malformed request: {0}")]
    Malformed(String),
}

impl LobbyError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LobbyError::LobbyNotFound(_)
            | LobbyError::PlayerNotFound(_)
            | LobbyError::IdentityNotFound(_)
            | LobbyError::QuestionNotFound(_) => ErrorCode::NotFound,
            LobbyError::Unauthorized => ErrorCode::Unauthorized,
            LobbyError::DuplicateName(_) | LobbyError::AlreadyAnswered(_) => ErrorCode::Duplicate,
            LobbyError::InvalidState(_) => ErrorCode::InvalidState,
            LobbyError::Malformed(_) => ErrorCode::Malformed,
        }
    }

    pub fn to_event(&self) -> ServerEvent {
        ServerEvent::error(self.code(), self.to_string())
    }
}

#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error("leaderboard file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("leaderboard file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("leaderboard lock poisoned")]
    Poisoned,
}
