//! Types shared by the NodeRace server and its clients: puzzle trees, the
//! traversal solvers that grade them, and the JSON message contract.

pub mod protocol;
pub mod traversal;
pub mod tree;

pub use protocol::{
    Answer, ClientAction, ErrorCode, Handshake, LeaderboardRow, LobbyState, PlayerSummary,
    PlayerView, Question, ServerEvent,
};
pub use traversal::{visit_order, Solution, Traversal};
pub use tree::{Node, NodeId, Tree};

/// Length of a lobby code.
pub const LOBBY_CODE_LENGTH: usize = 5;
/// Length of a player id token.
pub const PLAYER_ID_LENGTH: usize = 8;
/// Length of a host token.
pub const HOST_TOKEN_LENGTH: usize = 16;
/// Characters used for codes and tokens. `0 O 1 I l` are left out.
pub const TOKEN_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz23456789";
/// Default game length in seconds.
pub const GAME_DURATION_SECS: u64 = 300;
/// Rows shown in the global leaderboard.
pub const GLOBAL_LEADERBOARD_SIZE: usize = 10;
