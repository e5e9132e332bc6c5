use clap::Parser;
use log::{error, info};
use server::game::GameSettings;
use server::leaderboard::Leaderboard;
use server::lobby_manager::LobbyManager;
use server::network::NetworkServer;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Length of a game in seconds
    #[arg(short = 'd', long, default_value_t = shared::GAME_DURATION_SECS)]
    game_duration: u64,

    /// File the global leaderboard is stored in
    #[arg(short, long, default_value = "leaderboard.json")]
    leaderboard: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let leaderboard = Arc::new(Leaderboard::open(&args.leaderboard)?);
    let settings = GameSettings {
        duration: Duration::from_secs(args.game_duration),
        ..GameSettings::default()
    };
    info!(
        "Games last {}s, leaderboard at {}",
        args.game_duration,
        args.leaderboard.display()
    );

    let manager = LobbyManager::new(leaderboard, settings);
    let address = format!("{}:{}", args.host, args.port);
    let server = NetworkServer::bind(&address, manager).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
