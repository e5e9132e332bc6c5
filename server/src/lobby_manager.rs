//! Registry of live lobbies keyed by lobby code
//!
//! This module owns the lookup table the transport uses to route every
//! connection to its lobby:
//! - Lobby creation with a fresh code and host token
//! - Spawning the task that runs each lobby
//! - Lookup by code for joins, rejoins and in-session actions
//! - Removal once a lobby's game has ended
//!
//! The registry only holds [`LobbyHandle`]s. Lobby state itself lives in the
//! lobby task, so a slow lobby never holds the registry lock.

use crate::connection::Connection;
use crate::game::GameSettings;
use crate::leaderboard::Leaderboard;
use crate::lobby::{run_lobby, Lobby, LobbyHandle};
use crate::utils::{generate_token, generate_unique_token};
use log::info;
use shared::{ServerEvent, HOST_TOKEN_LENGTH, LOBBY_CODE_LENGTH};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// Shared, cloneable view of all lobbies on this server
#[derive(Debug, Clone)]
pub struct LobbyManager {
    lobbies: Arc<RwLock<HashMap<String, LobbyHandle>>>,
    leaderboard: Arc<Leaderboard>,
    settings: GameSettings,
}

impl LobbyManager {
    /// Creates an empty registry
    ///
    /// Every lobby created through it records final scores into
    /// `leaderboard` and plays by `settings`.
    pub fn new(leaderboard: Arc<Leaderboard>, settings: GameSettings) -> Self {
        Self {
            lobbies: Arc::new(RwLock::new(HashMap::new())),
            leaderboard,
            settings,
        }
    }

    pub fn leaderboard(&self) -> &Arc<Leaderboard> {
        &self.leaderboard
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    /// Opens a new lobby hosted by `host`
    ///
    /// Picks a code no live lobby uses, registers the lobby, starts its task
    /// and tells the host its code and token. Must run inside a tokio runtime.
    pub async fn create(&self, host: Connection) -> LobbyHandle {
        let host_token = generate_token(&mut rand::thread_rng(), HOST_TOKEN_LENGTH);

        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = {
            let mut lobbies = self.lobbies.write().await;
            let code = generate_unique_token(&mut rand::thread_rng(), LOBBY_CODE_LENGTH, |code| {
                lobbies.contains_key(code)
            });
            let handle = LobbyHandle::new(code.clone(), sender.clone());
            lobbies.insert(code, handle.clone());
            handle
        };

        let lobby = Lobby::new(
            handle.code().to_string(),
            host_token.clone(),
            host.clone(),
            self.settings.clone(),
            Arc::clone(&self.leaderboard),
            sender,
        );
        tokio::spawn(run_lobby(lobby, receiver, self.clone()));

        info!("Lobby {} created", handle.code());
        host.send(ServerEvent::LobbyCreated {
            lobby_code: handle.code().to_string(),
            host_token,
        });
        handle
    }

    /// Finds a live lobby by its code
    pub async fn get(&self, code: &str) -> Option<LobbyHandle> {
        self.lobbies.read().await.get(code).cloned()
    }

    /// Unregisters a lobby. Returns false if the code was not registered.
    pub async fn remove(&self, code: &str) -> bool {
        self.lobbies.write().await.remove(code).is_some()
    }

    /// Number of live lobbies
    pub async fn len(&self) -> usize {
        self.lobbies.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
