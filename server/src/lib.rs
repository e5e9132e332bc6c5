//! # NodeRace Server Library
//!
//! This library provides the authoritative server for NodeRace, a multiplayer
//! quiz where players race to enumerate the visit order of binary tree
//! traversals. It owns every lobby, grades every answer and keeps the global
//! leaderboard.
//!
//! ## Core Responsibilities
//!
//! ### Lobby Lifecycle
//! A host opens a lobby and receives a short lobby code plus a secret host
//! token. Players join with the code while the lobby is waiting. The host
//! starts the game, which generates one shared question set and starts the
//! game clock. The game ends when the host ends it or the clock runs out.
//!
//! ### Authoritative Scoring
//! Clients only submit answers. The server grades them against the solution
//! it generated and scores correct answers by the time since the player's
//! previous answer. Each question is scored at most once per player.
//!
//! ### Reconnection
//! Identities outlive sockets. The host reconnects with its token and a player
//! with their id, and both keep all of their state.
//!
//! ## Architecture Design
//!
//! ### One Task Per Lobby
//! Each lobby runs in its own task and handles commands from its mailbox one
//! at a time. Joins, answers, host requests and clock expiry are therefore
//! serialized per lobby, while separate lobbies run independently.
//!
//! ### Line-Delimited JSON over TCP
//! Every message is one JSON document on its own line. A connection opens
//! with a handshake (`CREATE`, `JOIN` or `REJOIN`) and then sends actions.
//!
//! ## Module Organization
//!
//! - `clock`: per-lobby countdown with elapsed time
//! - `connection`: replaceable outbound handle for a socket
//! - `error`: error types and their wire codes
//! - `game`: game settings and question set generation
//! - `leaderboard`: global leaderboard persisted as JSON
//! - `lobby`: lobby state machine and its task
//! - `lobby_manager`: registry of live lobbies
//! - `network`: TCP transport
//! - `player`: per-player score and answer history
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::game::GameSettings;
//! use server::leaderboard::Leaderboard;
//! use server::lobby_manager::LobbyManager;
//! use server::network::NetworkServer;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let leaderboard = Arc::new(Leaderboard::open("leaderboard.json")?);
//!     let manager = LobbyManager::new(leaderboard, GameSettings::default());
//!
//!     let server = NetworkServer::bind("127.0.0.1:8080", manager).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod connection;
pub mod error;
pub mod game;
pub mod leaderboard;
pub mod lobby;
pub mod lobby_manager;
pub mod network;
pub mod player;
pub mod utils;
