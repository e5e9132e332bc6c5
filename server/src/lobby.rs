//! The lobby state machine and the task that serializes access to it
//!
//! A lobby moves `Waiting -> Running -> Ended` and never back. All work on a
//! lobby goes through its mailbox: [`run_lobby`] owns the [`Lobby`] and
//! handles one [`LobbyCommand`] at a time, so joins, answers, host requests
//! and clock expiry can never interleave. Lobbies do not share state except
//! for the global [`Leaderboard`].

use crate::clock::GameClock;
use crate::connection::Connection;
use crate::error::LobbyError;
use crate::game::{GameSettings, QuestionSet};
use crate::leaderboard::Leaderboard;
use crate::lobby_manager::LobbyManager;
use crate::player::Player;
use crate::utils::generate_unique_token;
use log::{debug, error, info, warn};
use shared::{
    Answer, ClientAction, LeaderboardRow, LobbyState, PlayerSummary, PlayerView, ServerEvent,
    PLAYER_ID_LENGTH,
};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Everything a lobby task can be asked to do
#[derive(Debug)]
pub enum LobbyCommand {
    Join {
        name: String,
        connection: Connection,
    },
    Rejoin {
        id: String,
        connection: Connection,
    },
    Action {
        action: ClientAction,
        from: Connection,
    },
    ClockExpired,
}

/// Cheap cloneable address of a running lobby task
#[derive(Debug, Clone)]
pub struct LobbyHandle {
    code: String,
    sender: mpsc::UnboundedSender<LobbyCommand>,
}

impl LobbyHandle {
    pub fn new(code: String, sender: mpsc::UnboundedSender<LobbyCommand>) -> Self {
        Self { code, sender }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Fails once the lobby task has finished.
    pub fn send(&self, command: LobbyCommand) -> Result<(), LobbyError> {
        self.sender
            .send(command)
            .map_err(|_| LobbyError::LobbyNotFound(self.code.clone()))
    }
}

pub struct Lobby {
    code: String,
    host_token: String,
    host: Connection,
    /// Join order; doubles as the rank tie-break
    players: Vec<Player>,
    questions: QuestionSet,
    clock: GameClock,
    state: LobbyState,
    settings: GameSettings,
    leaderboard: Arc<Leaderboard>,
    /// Sender side of this lobby's own mailbox, used by the clock
    mailbox: mpsc::UnboundedSender<LobbyCommand>,
}

impl Lobby {
    pub fn new(
        code: String,
        host_token: String,
        host: Connection,
        settings: GameSettings,
        leaderboard: Arc<Leaderboard>,
        mailbox: mpsc::UnboundedSender<LobbyCommand>,
    ) -> Self {
        Self {
            code,
            host_token,
            host,
            players: Vec::new(),
            questions: QuestionSet::default(),
            clock: GameClock::new(settings.duration),
            state: LobbyState::Waiting,
            settings,
            leaderboard,
            mailbox,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn host_token(&self) -> &str {
        &self.host_token
    }

    pub fn host(&self) -> &Connection {
        &self.host
    }

    pub fn state(&self) -> LobbyState {
        self.state
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn question_set(&self) -> &QuestionSet {
        &self.questions
    }

    pub fn elapsed(&self) -> f64 {
        self.clock.elapsed()
    }

    /// Applies one command. Rejections are reported to whoever sent it.
    pub fn handle(&mut self, command: LobbyCommand) {
        match command {
            LobbyCommand::Join { name, connection } => {
                if let Err(e) = self.join(&name, connection.clone()) {
                    warn!("Lobby {}: join as {:?} rejected: {}", self.code, name, e);
                    connection.send(e.to_event());
                    connection.close();
                }
            }
            LobbyCommand::Rejoin { id, connection } => {
                if let Err(e) = self.rejoin(&id, connection.clone()) {
                    warn!("Lobby {}: rejoin rejected: {}", self.code, e);
                    connection.send(e.to_event());
                    connection.close();
                }
            }
            LobbyCommand::Action { action, from } => {
                if let Err(e) = self.handle_action(action, &from) {
                    debug!("Lobby {}: action rejected: {}", self.code, e);
                    from.send(e.to_event());
                }
            }
            LobbyCommand::ClockExpired => {
                // Host may already have ended the game
                if self.state == LobbyState::Running {
                    info!("Lobby {}: time is up", self.code);
                    if let Err(e) = self.end_game() {
                        error!("Lobby {}: failed to end game: {}", self.code, e);
                    }
                }
            }
        }
    }

    fn handle_action(&mut self, action: ClientAction, from: &Connection) -> Result<(), LobbyError> {
        match action {
            ClientAction::StartGame { host_id } => self.start_game(&host_id),
            ClientAction::EndGame { host_id } => {
                self.authorize(&host_id)?;
                self.end_game()
            }
            ClientAction::KickPlayer { host_id, player_id } => {
                self.kick_player(&host_id, &player_id)
            }
            ClientAction::PlayerLeave { player_id } => self.player_leave(&player_id),
            ClientAction::GetAllPlayers { host_id } => {
                self.authorize(&host_id)?;
                from.send(ServerEvent::AllPlayers {
                    players: self.roster(),
                });
                Ok(())
            }
            ClientAction::GetLeaderboard {} => {
                from.send(ServerEvent::Leaderboard {
                    leaderboard: self.global_leaderboard(),
                });
                Ok(())
            }
            ClientAction::GetRank { player_id } => {
                let rank = self.rank(&player_id)?;
                from.send(ServerEvent::Rank { player_id, rank });
                Ok(())
            }
            ClientAction::GetScore { player_id } => {
                let player = self
                    .player(&player_id)
                    .ok_or_else(|| LobbyError::PlayerNotFound(player_id.clone()))?;
                from.send(ServerEvent::Score {
                    player_id: player.id.clone(),
                    name: player.name.clone(),
                    score: player.score,
                });
                Ok(())
            }
            ClientAction::SubmitAnswer {
                player_id,
                answer,
                question_number,
            } => {
                let correct = self.submit_answer(&player_id, question_number, &answer)?;
                let score = self.player(&player_id).map_or(0.0, |p| p.score);
                from.send(ServerEvent::AnswerReceived {
                    question_number,
                    correct,
                    score,
                });
                Ok(())
            }
        }
    }

    fn authorize(&self, host_token: &str) -> Result<(), LobbyError> {
        if host_token == self.host_token {
            Ok(())
        } else {
            Err(LobbyError::Unauthorized)
        }
    }

    fn require_state(&self, expected: LobbyState) -> Result<(), LobbyError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(LobbyError::InvalidState(self.state))
        }
    }

    fn position(&self, player_id: &str) -> Result<usize, LobbyError> {
        self.players
            .iter()
            .position(|p| p.id == player_id)
            .ok_or_else(|| LobbyError::PlayerNotFound(player_id.to_string()))
    }

    /// Host view of the roster, ids included.
    pub fn roster(&self) -> Vec<PlayerSummary> {
        self.players.iter().map(Player::summary).collect()
    }

    /// Player view of the roster, without ids.
    pub fn public_roster(&self) -> Vec<PlayerView> {
        self.players.iter().map(Player::view).collect()
    }

    /// Adds a player while waiting for the host to start. Returns the new id.
    pub fn join(&mut self, name: &str, connection: Connection) -> Result<String, LobbyError> {
        self.require_state(LobbyState::Waiting)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(LobbyError::Malformed("name must not be empty".to_string()));
        }
        if self.players.iter().any(|p| p.name == name) {
            return Err(LobbyError::DuplicateName(name.to_string()));
        }

        let id = generate_unique_token(&mut rand::thread_rng(), PLAYER_ID_LENGTH, |token| {
            token == self.host_token || self.players.iter().any(|p| p.id == token)
        });
        let player = Player::new(id.clone(), name.to_string(), connection);
        let summary = player.summary();
        self.players.push(player);

        info!("Lobby {}: {} joined as {}", self.code, name, id);
        let players = self.public_roster();
        if let Some(player) = self.players.last() {
            player.send(ServerEvent::JoinedLobby {
                lobby_code: self.code.clone(),
                player_id: id.clone(),
                name: name.to_string(),
                players,
            });
        }
        self.host.send(ServerEvent::PlayerJoined { player: summary });

        Ok(id)
    }

    /// Generates the question set, starts the clock and sends the questions out.
    pub fn start_game(&mut self, host_token: &str) -> Result<(), LobbyError> {
        self.authorize(host_token)?;
        self.require_state(LobbyState::Waiting)?;

        self.questions = QuestionSet::generate(&self.settings, &mut rand::thread_rng());

        let mailbox = self.mailbox.clone();
        self.clock.start(move || {
            let _ = mailbox.send(LobbyCommand::ClockExpired);
        });
        self.state = LobbyState::Running;

        let duration_secs = self.settings.duration.as_secs();
        for player in &self.players {
            player.send(ServerEvent::GameStarted {
                questions: self.questions.questions().to_vec(),
                duration_secs,
            });
        }
        self.host.send(ServerEvent::GameStartedHost {
            question_count: self.questions.len(),
            duration_secs,
        });

        info!(
            "Lobby {}: game started with {} players",
            self.code,
            self.players.len()
        );
        Ok(())
    }

    /// Grades and scores an answer. Returns whether it was correct.
    pub fn submit_answer(
        &mut self,
        player_id: &str,
        question_index: usize,
        answer: &Answer,
    ) -> Result<bool, LobbyError> {
        self.require_state(LobbyState::Running)?;

        let question = self
            .questions
            .get(question_index)
            .ok_or(LobbyError::QuestionNotFound(question_index))?;
        let correct = question.is_correct(answer);
        let clock_time = self.clock.elapsed();

        let index = self.position(player_id)?;
        let player = &mut self.players[index];
        if !player.record_answer(question_index, correct, clock_time) {
            return Err(LobbyError::AlreadyAnswered(question_index));
        }

        debug!(
            "Lobby {}: {} answered question {} at {:.1}s ({})",
            self.code,
            player.name,
            question_index,
            clock_time,
            if correct { "correct" } else { "incorrect" }
        );
        Ok(correct)
    }

    /// Player indices ordered by score, highest first; ties keep join order.
    fn ranking(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.players.len()).collect();
        order.sort_by(|&a, &b| self.players[b].score.total_cmp(&self.players[a].score));
        order
    }

    /// 1-based rank within the lobby, by descending score.
    pub fn rank(&self, player_id: &str) -> Result<usize, LobbyError> {
        let index = self.position(player_id)?;
        self.ranking()
            .iter()
            .position(|&i| i == index)
            .map(|pos| pos + 1)
            .ok_or_else(|| LobbyError::PlayerNotFound(player_id.to_string()))
    }

    pub fn session_leaderboard(&self) -> Vec<LeaderboardRow> {
        self.ranking()
            .into_iter()
            .enumerate()
            .map(|(pos, i)| LeaderboardRow {
                rank: pos + 1,
                name: self.players[i].name.clone(),
                score: self.players[i].score,
            })
            .collect()
    }

    fn global_leaderboard(&self) -> Vec<LeaderboardRow> {
        self.leaderboard
            .top_n(self.settings.global_leaderboard_size)
            .unwrap_or_else(|e| {
                error!("Lobby {}: cannot read leaderboard: {}", self.code, e);
                Vec::new()
            })
    }

    /// Records final scores, sends every participant their summary and
    /// disconnects them. Only a running game can end.
    pub fn end_game(&mut self) -> Result<(), LobbyError> {
        self.require_state(LobbyState::Running)?;

        self.clock.stop();
        let elapsed = self.clock.elapsed();
        let question_count = self.questions.len();
        let session_leaderboard = self.session_leaderboard();

        let global_ranks: Vec<Option<usize>> = self
            .players
            .iter()
            .map(|player| match self.leaderboard.add_entry(&player.name, player.score) {
                Ok(rank) => Some(rank),
                Err(e) => {
                    error!(
                        "Lobby {}: failed to record score for {}: {}",
                        self.code, player.name, e
                    );
                    None
                }
            })
            .collect();
        let global_leaderboard = self.global_leaderboard();

        let mut session_ranks = vec![0; self.players.len()];
        for (pos, i) in self.ranking().into_iter().enumerate() {
            session_ranks[i] = pos + 1;
        }

        for (i, player) in self.players.iter().enumerate() {
            player.send(ServerEvent::GameEnd {
                elapsed,
                score: player.score,
                num_correct: player.num_correct(),
                answers: player.answers(question_count),
                session_leaderboard: session_leaderboard.clone(),
                global_leaderboard: global_leaderboard.clone(),
                session_rank: session_ranks[i],
                global_rank: global_ranks[i],
            });
            player.connection().close();
        }

        self.host.send(ServerEvent::GameEndHost {
            elapsed,
            session_leaderboard,
            global_leaderboard,
        });
        self.host.close();

        self.state = LobbyState::Ended;
        info!("Lobby {}: game ended after {:.1}s", self.code, elapsed);
        Ok(())
    }

    pub fn kick_player(&mut self, host_token: &str, player_id: &str) -> Result<(), LobbyError> {
        self.authorize(host_token)?;
        let index = self.position(player_id)?;
        let player = self.players.remove(index);

        player.send(ServerEvent::PlayerKicked {
            reason: "Removed by host".to_string(),
        });
        player.connection().close();

        info!("Lobby {}: host kicked {}", self.code, player.name);
        self.notify_player_left(&player.id);
        Ok(())
    }

    pub fn player_leave(&mut self, player_id: &str) -> Result<(), LobbyError> {
        let index = self.position(player_id)?;
        let player = self.players.remove(index);
        player.connection().close();

        info!("Lobby {}: {} left", self.code, player.name);
        self.notify_player_left(&player.id);
        Ok(())
    }

    fn notify_player_left(&self, player_id: &str) {
        self.host.send(ServerEvent::PlayerLeft {
            player_id: player_id.to_string(),
        });
        self.host.send(ServerEvent::AllPlayers {
            players: self.roster(),
        });
    }

    /// Moves the host or a player onto a new connection, keeping their state.
    pub fn rejoin(&mut self, id: &str, connection: Connection) -> Result<(), LobbyError> {
        if id == self.host_token {
            self.host.close();
            self.host = connection;
            self.host.send(ServerEvent::AllPlayers {
                players: self.roster(),
            });
            info!("Lobby {}: host reconnected", self.code);
            return Ok(());
        }

        let index = self
            .players
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| LobbyError::IdentityNotFound(id.to_string()))?;

        let elapsed = self.clock.elapsed();
        let player = &mut self.players[index];
        player.replace_connection(connection);
        player.send(ServerEvent::Rejoined {
            lobby_code: self.code.clone(),
            player_id: player.id.clone(),
            name: player.name.clone(),
            score: player.score,
            state: self.state,
            elapsed,
        });
        if self.state == LobbyState::Running {
            player.send(ServerEvent::GameStarted {
                questions: self.questions.questions().to_vec(),
                duration_secs: self.settings.duration.as_secs(),
            });
        }

        info!("Lobby {}: {} reconnected", self.code, player.name);
        Ok(())
    }
}

/// Drives one lobby until its game has ended, then unregisters it.
pub async fn run_lobby(
    mut lobby: Lobby,
    mut mailbox: mpsc::UnboundedReceiver<LobbyCommand>,
    manager: LobbyManager,
) {
    while let Some(command) = mailbox.recv().await {
        lobby.handle(command);
        if lobby.state() == LobbyState::Ended {
            break;
        }
    }

    manager.remove(lobby.code()).await;

    // Anything that raced the removal gets the same answer as an unknown code
    mailbox.close();
    while let Ok(command) = mailbox.try_recv() {
        let error = LobbyError::LobbyNotFound(lobby.code().to_string());
        match command {
            LobbyCommand::Join { connection, .. } | LobbyCommand::Rejoin { connection, .. } => {
                connection.send(error.to_event());
                connection.close();
            }
            LobbyCommand::Action { from, .. } => from.send(error.to_event()),
            LobbyCommand::ClockExpired => {}
        }
    }
    info!("Lobby {} closed", lobby.code());
}
