//! Integration tests for the NodeRace server
//!
//! These tests run a real server on a loopback socket and drive it the way
//! game clients do.

use assert_approx_eq::assert_approx_eq;
use serde_json::{json, Value};
use server::game::GameSettings;
use server::leaderboard::Leaderboard;
use server::lobby_manager::LobbyManager;
use server::network::NetworkServer;
use shared::{ErrorCode, LobbyState, Question, ServerEvent};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_test::assert_ok;

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("Failed to connect");
        let (read_half, writer) = stream.into_split();
        Self {
            lines: BufReader::new(read_half).lines(),
            writer,
        }
    }

    async fn send(&mut self, message: Value) {
        let mut line = message.to_string();
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await.unwrap();
    }

    async fn recv(&mut self) -> Option<ServerEvent> {
        let line = tokio::time::timeout(Duration::from_secs(2), self.lines.next_line())
            .await
            .expect("Timed out waiting for the server")
            .unwrap()?;
        Some(serde_json::from_str(&line).expect("Server sent invalid JSON"))
    }

    async fn host(addr: SocketAddr) -> (Self, String, String) {
        let mut host = Self::connect(addr).await;
        host.send(json!({"type": "CREATE"})).await;
        match host.recv().await {
            Some(ServerEvent::LobbyCreated {
                lobby_code,
                host_token,
            }) => (host, lobby_code, host_token),
            other => panic!("Expected LOBBY_CREATED, got {:?}", other),
        }
    }

    async fn join(addr: SocketAddr, code: &str, name: &str) -> (Self, String) {
        let mut player = Self::connect(addr).await;
        player
            .send(json!({"type": "JOIN", "name": name, "lobbyCode": code}))
            .await;
        match player.recv().await {
            Some(ServerEvent::JoinedLobby { player_id, .. }) => (player, player_id),
            other => panic!("Expected JOINED_LOBBY, got {:?}", other),
        }
    }
}

fn temp_leaderboard(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("noderace-it-{}-{}.json", name, std::process::id()));
    let _ = std::fs::remove_file(&path);
    path
}

async fn start_server(leaderboard: Leaderboard, settings: GameSettings) -> SocketAddr {
    let manager = LobbyManager::new(Arc::new(leaderboard), settings);
    let server = NetworkServer::bind("127.0.0.1:0", manager).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

async fn expect_player_joined(host: &mut Client) {
    assert!(matches!(
        host.recv().await,
        Some(ServerEvent::PlayerJoined { .. })
    ));
}

async fn start_and_collect(host: &mut Client, token: &str, players: &mut [&mut Client]) -> Vec<Question> {
    host.send(json!({"action": "START_GAME", "data": {"hostId": token}}))
        .await;
    assert!(matches!(
        host.recv().await,
        Some(ServerEvent::GameStartedHost { question_count: 5, .. })
    ));

    let mut questions = Vec::new();
    for player in players.iter_mut() {
        match player.recv().await {
            Some(ServerEvent::GameStarted { questions: q, .. }) => questions = q,
            other => panic!("Expected GAME_STARTED, got {:?}", other),
        }
    }
    questions
}

/// NETWORK PROTOCOL TESTS
mod protocol_tests {
    use super::*;

    /// Tests the handshake and event shapes as clients see them on the wire
    #[tokio::test]
    async fn lobby_created_wire_shape() {
        let addr = start_server(Leaderboard::in_memory(), GameSettings::default()).await;
        let mut client = Client::connect(addr).await;
        client.send(json!({"type": "CREATE"})).await;

        let line = client.lines.next_line().await.unwrap().unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["type"], "LOBBY_CREATED");
        assert_eq!(value["lobbyCode"].as_str().unwrap().len(), 5);
        assert_eq!(value["hostToken"].as_str().unwrap().len(), 16);
    }

    /// Tests that questions carry trees in the nested child shape
    #[tokio::test]
    async fn question_wire_shape() {
        let addr = start_server(Leaderboard::in_memory(), GameSettings::default()).await;
        let (mut host, code, token) = Client::host(addr).await;
        let (mut player, _) = Client::join(addr, &code, "ada").await;
        expect_player_joined(&mut host).await;

        host.send(json!({"action": "START_GAME", "data": {"hostId": token}}))
            .await;
        let line = player.lines.next_line().await.unwrap().unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["type"], "GAME_STARTED");
        let questions = value["questions"].as_array().unwrap();
        assert_eq!(questions.len(), 5);
        let root = &questions[0]["tree"]["root"];
        assert_eq!(root["id"], 0);
        assert!(root.get("leftChild").is_some());
        assert!(root.get("rightChild").is_some());
        assert!(questions[0]["solution"].is_object());
    }

    /// Tests that a duplicate name is refused and the socket is closed
    #[tokio::test]
    async fn duplicate_name_refused() {
        let addr = start_server(Leaderboard::in_memory(), GameSettings::default()).await;
        let (_host, code, _) = Client::host(addr).await;
        let (_ada, _) = Client::join(addr, &code, "ada").await;

        let mut second = Client::connect(addr).await;
        second
            .send(json!({"type": "JOIN", "name": "ada", "lobbyCode": code}))
            .await;

        assert!(matches!(
            second.recv().await,
            Some(ServerEvent::Error {
                code: ErrorCode::Duplicate,
                ..
            })
        ));
        assert_eq!(second.recv().await, None);
    }

    /// Tests that a wrong host token is rejected without side effects
    #[tokio::test]
    async fn wrong_host_token_rejected() {
        let addr = start_server(Leaderboard::in_memory(), GameSettings::default()).await;
        let (mut host, code, token) = Client::host(addr).await;

        host.send(json!({"action": "START_GAME", "data": {"hostId": "not-the-token"}}))
            .await;
        assert!(matches!(
            host.recv().await,
            Some(ServerEvent::Error {
                code: ErrorCode::Unauthorized,
                ..
            })
        ));

        // Still waiting, so players may join
        let (_player, _) = Client::join(addr, &code, "ada").await;
        expect_player_joined(&mut host).await;

        host.send(json!({"action": "GET_ALL_PLAYERS", "data": {"hostId": token}}))
            .await;
        match host.recv().await {
            Some(ServerEvent::AllPlayers { players }) => assert_eq!(players.len(), 1),
            other => panic!("Expected ALL_PLAYERS, got {:?}", other),
        }
    }
}

/// FULL GAME TESTS
mod game_flow_tests {
    use super::*;

    /// Plays a complete game with two players and checks the results
    #[tokio::test]
    async fn full_game_round() {
        let path = temp_leaderboard("round");
        let addr = start_server(Leaderboard::open(&path).unwrap(), GameSettings::default()).await;

        let (mut host, code, token) = Client::host(addr).await;
        let (mut ada, ada_id) = Client::join(addr, &code, "ada").await;
        expect_player_joined(&mut host).await;
        let (mut bob, bob_id) = Client::join(addr, &code, "bob").await;
        expect_player_joined(&mut host).await;

        let questions = start_and_collect(&mut host, &token, &mut [&mut ada, &mut bob]).await;

        ada.send(json!({
            "action": "SUBMIT_ANSWER",
            "data": {"playerId": ada_id, "answer": questions[0].solution, "questionNumber": 0}
        }))
        .await;
        let ada_score = match ada.recv().await {
            Some(ServerEvent::AnswerReceived {
                question_number,
                correct,
                score,
            }) => {
                assert_eq!(question_number, 0);
                assert!(correct);
                assert!(score >= 100.0);
                score
            }
            other => panic!("Expected ANSWER_RECEIVED, got {:?}", other),
        };

        // Same question again is not scored twice
        ada.send(json!({
            "action": "SUBMIT_ANSWER",
            "data": {"playerId": ada_id, "answer": questions[0].solution, "questionNumber": 0}
        }))
        .await;
        assert!(matches!(
            ada.recv().await,
            Some(ServerEvent::Error {
                code: ErrorCode::Duplicate,
                ..
            })
        ));

        bob.send(json!({
            "action": "SUBMIT_ANSWER",
            "data": {"playerId": bob_id, "answer": {}, "questionNumber": 0}
        }))
        .await;
        assert!(matches!(
            bob.recv().await,
            Some(ServerEvent::AnswerReceived { correct: false, .. })
        ));

        bob.send(json!({"action": "GET_RANK", "data": {"playerId": bob_id}}))
            .await;
        assert!(matches!(
            bob.recv().await,
            Some(ServerEvent::Rank { rank: 2, .. })
        ));

        host.send(json!({"action": "END_GAME", "data": {"hostId": token}}))
            .await;

        match ada.recv().await {
            Some(ServerEvent::GameEnd {
                score,
                num_correct,
                answers,
                session_rank,
                global_rank,
                session_leaderboard,
                ..
            }) => {
                assert_approx_eq!(score, ada_score);
                assert_approx_eq!(session_leaderboard[0].score, ada_score);
                assert_eq!(num_correct, 1);
                assert_eq!(answers, vec![true, false, false, false, false]);
                assert_eq!(session_rank, 1);
                assert_eq!(global_rank, Some(1));
                assert_eq!(session_leaderboard[0].name, "ada");
                assert_eq!(session_leaderboard[1].name, "bob");
            }
            other => panic!("Expected GAME_END, got {:?}", other),
        }
        assert_eq!(ada.recv().await, None);

        match bob.recv().await {
            Some(ServerEvent::GameEnd {
                session_rank,
                global_rank,
                ..
            }) => {
                assert_eq!(session_rank, 2);
                assert_eq!(global_rank, Some(2));
            }
            other => panic!("Expected GAME_END, got {:?}", other),
        }

        match host.recv().await {
            Some(ServerEvent::GameEndHost {
                global_leaderboard, ..
            }) => assert_eq!(global_leaderboard.len(), 2),
            other => panic!("Expected GAME_END_HOST, got {:?}", other),
        }
        assert_eq!(host.recv().await, None);

        let reloaded = assert_ok!(Leaderboard::open(&path));
        assert_eq!(reloaded.len(), 2);
        assert_approx_eq!(reloaded.scores()[0], ada_score);
        let _ = std::fs::remove_file(&path);
    }

    /// Tests that the clock ends the game on its own
    #[tokio::test]
    async fn clock_expiry_ends_game() {
        let settings = GameSettings {
            duration: Duration::from_millis(300),
            ..GameSettings::default()
        };
        let addr = start_server(Leaderboard::in_memory(), settings).await;
        let (mut host, code, token) = Client::host(addr).await;
        let (mut ada, _) = Client::join(addr, &code, "ada").await;
        expect_player_joined(&mut host).await;

        start_and_collect(&mut host, &token, &mut [&mut ada]).await;

        match ada.recv().await {
            Some(ServerEvent::GameEnd { elapsed, score, .. }) => {
                assert!(elapsed >= 0.3);
                assert_approx_eq!(score, 0.0);
            }
            other => panic!("Expected GAME_END, got {:?}", other),
        }
        assert!(matches!(
            host.recv().await,
            Some(ServerEvent::GameEndHost { .. })
        ));

        // The lobby is gone once its game has ended
        let mut late = Client::connect(addr).await;
        late.send(json!({"type": "JOIN", "name": "late", "lobbyCode": code}))
            .await;
        assert!(matches!(
            late.recv().await,
            Some(ServerEvent::Error {
                code: ErrorCode::NotFound,
                ..
            })
        ));
    }

    /// Tests that the leaderboard is shared between lobbies
    #[tokio::test]
    async fn leaderboard_shared_across_lobbies() {
        let addr = start_server(Leaderboard::in_memory(), GameSettings::default()).await;

        let (mut host, code, token) = Client::host(addr).await;
        let (mut ada, ada_id) = Client::join(addr, &code, "ada").await;
        expect_player_joined(&mut host).await;
        let questions = start_and_collect(&mut host, &token, &mut [&mut ada]).await;
        ada.send(json!({
            "action": "SUBMIT_ANSWER",
            "data": {"playerId": ada_id, "answer": questions[4].solution, "questionNumber": 4}
        }))
        .await;
        ada.recv().await;
        host.send(json!({"action": "END_GAME", "data": {"hostId": token}}))
            .await;
        ada.recv().await;

        let (_other_host, other_code, _) = Client::host(addr).await;
        let (mut bob, _) = Client::join(addr, &other_code, "bob").await;
        bob.send(json!({"action": "GET_LEADERBOARD", "data": {}}))
            .await;
        match bob.recv().await {
            Some(ServerEvent::Leaderboard { leaderboard }) => {
                assert_eq!(leaderboard.len(), 1);
                assert_eq!(leaderboard[0].rank, 1);
                assert_eq!(leaderboard[0].name, "ada");
            }
            other => panic!("Expected LEADERBOARD, got {:?}", other),
        }
    }
}

/// RECONNECTION TESTS
mod reconnection_tests {
    use super::*;

    /// Tests that a player keeps their score across a reconnect mid-game
    #[tokio::test]
    async fn player_rejoins_running_game() {
        let addr = start_server(Leaderboard::in_memory(), GameSettings::default()).await;
        let (mut host, code, token) = Client::host(addr).await;
        let (mut ada, ada_id) = Client::join(addr, &code, "ada").await;
        expect_player_joined(&mut host).await;
        let questions = start_and_collect(&mut host, &token, &mut [&mut ada]).await;

        ada.send(json!({
            "action": "SUBMIT_ANSWER",
            "data": {"playerId": ada_id, "answer": questions[1].solution, "questionNumber": 1}
        }))
        .await;
        let score = match ada.recv().await {
            Some(ServerEvent::AnswerReceived { score, .. }) => score,
            other => panic!("Expected ANSWER_RECEIVED, got {:?}", other),
        };
        drop(ada);

        let mut again = Client::connect(addr).await;
        again
            .send(json!({"type": "REJOIN", "id": ada_id, "lobbyCode": code}))
            .await;
        match again.recv().await {
            Some(ServerEvent::Rejoined {
                player_id,
                score: rejoined_score,
                state,
                ..
            }) => {
                assert_eq!(player_id, ada_id);
                assert_approx_eq!(rejoined_score, score);
                assert_eq!(state, LobbyState::Running);
            }
            other => panic!("Expected REJOINED, got {:?}", other),
        }
        match again.recv().await {
            Some(ServerEvent::GameStarted { questions: q, .. }) => assert_eq!(q, questions),
            other => panic!("Expected GAME_STARTED, got {:?}", other),
        }

        // The answer history survived the reconnect
        again
            .send(json!({
                "action": "SUBMIT_ANSWER",
                "data": {"playerId": ada_id, "answer": questions[1].solution, "questionNumber": 1}
            }))
            .await;
        assert!(matches!(
            again.recv().await,
            Some(ServerEvent::Error {
                code: ErrorCode::Duplicate,
                ..
            })
        ));
    }

    /// Tests that the host can take over from a new socket
    #[tokio::test]
    async fn host_rejoins_with_token() {
        let addr = start_server(Leaderboard::in_memory(), GameSettings::default()).await;
        let (mut host, code, token) = Client::host(addr).await;
        let (_ada, _) = Client::join(addr, &code, "ada").await;
        expect_player_joined(&mut host).await;

        let mut new_host = Client::connect(addr).await;
        new_host
            .send(json!({"type": "REJOIN", "id": token, "lobbyCode": code}))
            .await;
        match new_host.recv().await {
            Some(ServerEvent::AllPlayers { players }) => {
                assert_eq!(players.len(), 1);
                assert_eq!(players[0].name, "ada");
            }
            other => panic!("Expected ALL_PLAYERS, got {:?}", other),
        }

        // The old socket is closed
        assert_eq!(host.recv().await, None);
    }

    /// Tests that an unknown identity is refused
    #[tokio::test]
    async fn unknown_identity_refused() {
        let addr = start_server(Leaderboard::in_memory(), GameSettings::default()).await;
        let (_host, code, _) = Client::host(addr).await;

        let mut stranger = Client::connect(addr).await;
        stranger
            .send(json!({"type": "REJOIN", "id": "nobody", "lobbyCode": code}))
            .await;

        assert!(matches!(
            stranger.recv().await,
            Some(ServerEvent::Error {
                code: ErrorCode::NotFound,
                ..
            })
        ));
        assert_eq!(stranger.recv().await, None);
    }
}
