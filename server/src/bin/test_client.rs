use clap::Parser;
use serde::Serialize;
use shared::{ClientAction, Handshake, ServerEvent};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Plays one scripted game against a running server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Name the scripted player joins with
    #[arg(short, long, default_value = "demo")]
    name: String,
}

struct Peer {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Peer {
    async fn connect(addr: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let (read_half, writer) = TcpStream::connect(addr).await?.into_split();
        Ok(Self {
            lines: BufReader::new(read_half).lines(),
            writer,
        })
    }

    async fn send<T: Serialize>(&mut self, message: &T) -> Result<(), Box<dyn std::error::Error>> {
        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<ServerEvent, Box<dyn std::error::Error>> {
        let line = self
            .lines
            .next_line()
            .await?
            .ok_or("server closed the connection")?;
        Ok(serde_json::from_str(&line)?)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Host opens a lobby
    let mut host = Peer::connect(&args.server).await?;
    host.send(&Handshake::Create).await?;
    let (lobby_code, host_token) = match host.recv().await? {
        ServerEvent::LobbyCreated {
            lobby_code,
            host_token,
        } => (lobby_code, host_token),
        other => return Err(format!("Unexpected event: {:?}", other).into()),
    };
    println!("Created lobby {}", lobby_code);

    // Player joins it
    let mut player = Peer::connect(&args.server).await?;
    player
        .send(&Handshake::Join {
            name: args.name.clone(),
            lobby_code: lobby_code.clone(),
        })
        .await?;
    let player_id = match player.recv().await? {
        ServerEvent::JoinedLobby { player_id, .. } => player_id,
        other => return Err(format!("Unexpected event: {:?}", other).into()),
    };
    println!("Joined as {} ({})", args.name, player_id);
    println!("Host sees: {:?}", host.recv().await?);

    host.send(&ClientAction::StartGame {
        host_id: host_token.clone(),
    })
    .await?;
    let questions = match player.recv().await? {
        ServerEvent::GameStarted { questions, .. } => questions,
        other => return Err(format!("Unexpected event: {:?}", other).into()),
    };
    println!("Game started with {} questions", questions.len());

    // Answer everything straight from the solution
    for question in &questions {
        player
            .send(&ClientAction::SubmitAnswer {
                player_id: player_id.clone(),
                answer: question.solution.clone(),
                question_number: question.id,
            })
            .await?;
        println!(
            "Question {} ({}, {} nodes): {:?}",
            question.id,
            question.title,
            question.tree.node_count(),
            player.recv().await?
        );
    }

    host.send(&ClientAction::EndGame { host_id: host_token })
        .await?;
    match player.recv().await? {
        ServerEvent::GameEnd {
            score,
            num_correct,
            session_rank,
            global_rank,
            ..
        } => println!(
            "Final score {:.1} with {} correct, session rank {}, global rank {:?}",
            score, num_correct, session_rank, global_rank
        ),
        other => println!("Unexpected event: {:?}", other),
    }

    Ok(())
}
