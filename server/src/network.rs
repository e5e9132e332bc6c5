//! Server network layer: line-delimited JSON over TCP
//!
//! Every accepted socket gets two halves. A writer task drains the socket's
//! [`Connection`] queue and writes one JSON event per line. The reader parses
//! the opening [`Handshake`], then forwards each [`ClientAction`] line to the
//! lobby chosen by the handshake.

use crate::connection::{Connection, Outbound};
use crate::error::LobbyError;
use crate::lobby::{LobbyCommand, LobbyHandle};
use crate::lobby_manager::LobbyManager;
use log::{debug, error, info, warn};
use shared::{ClientAction, Handshake};
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Longest accepted message line, newline excluded
pub const MAX_LINE_BYTES: u64 = 64 * 1024;

/// Accept loop routing sockets to lobbies
pub struct NetworkServer {
    listener: TcpListener,
    manager: LobbyManager,
}

impl NetworkServer {
    pub async fn bind(addr: &str, manager: LobbyManager) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);
        Ok(Self { listener, manager })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until the listener fails.
    pub async fn run(self) -> io::Result<()> {
        loop {
            let (stream, addr) = self.listener.accept().await?;
            debug!("Accepted connection from {}", addr);

            let manager = self.manager.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, manager).await {
                    warn!("Connection from {} failed: {}", addr, e);
                }
                debug!("Connection from {} finished", addr);
            });
        }
    }
}

async fn handle_connection(stream: TcpStream, manager: LobbyManager) -> io::Result<()> {
    let (read_half, write_half) = stream.into_split();
    let (connection, outbound) = Connection::channel();
    let mut writer = tokio::spawn(write_loop(write_half, outbound));
    let mut writer_done = false;
    let mut reader = BufReader::new(read_half);
    let mut buffer = Vec::new();

    let mut lobby: Option<LobbyHandle> = None;
    loop {
        tokio::select! {
            frame = read_frame(&mut reader, &mut buffer) => {
                let line = match frame? {
                    Frame::Line(line) => line,
                    Frame::TooLong => {
                        warn!("Connection {} sent an oversized line", connection.id());
                        connection.send(
                            LobbyError::Malformed(format!("line exceeds {} bytes", MAX_LINE_BYTES))
                                .to_event(),
                        );
                        connection.close();
                        break;
                    }
                    Frame::Closed => break,
                };
                if line.trim().is_empty() {
                    continue;
                }
                if let Some(handle) = &lobby {
                    forward(&line, handle, &connection);
                    continue;
                }
                match handshake(&line, &connection, &manager).await {
                    Some(handle) => lobby = Some(handle),
                    None => {
                        connection.close();
                        break;
                    }
                }
            }
            // The lobby closed this connection
            _ = &mut writer => {
                writer_done = true;
                break;
            }
        }
    }

    if !writer_done {
        connection.close();
        if let Err(e) = writer.await {
            error!("Writer task for connection {} failed: {}", connection.id(), e);
        }
    }
    Ok(())
}

enum Frame {
    Line(String),
    TooLong,
    Closed,
}

/// Reads one newline-terminated line of at most `MAX_LINE_BYTES`.
async fn read_frame<R>(reader: &mut R, buffer: &mut Vec<u8>) -> io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    buffer.clear();
    let read = (&mut *reader)
        .take(MAX_LINE_BYTES + 1)
        .read_until(b'\n', buffer)
        .await?;
    if read == 0 {
        return Ok(Frame::Closed);
    }

    if buffer.last() == Some(&b'\n') {
        buffer.pop();
        if buffer.last() == Some(&b'\r') {
            buffer.pop();
        }
    } else if buffer.len() as u64 > MAX_LINE_BYTES {
        return Ok(Frame::TooLong);
    }
    // Invalid UTF-8 fails JSON parsing and is reported as malformed
    Ok(Frame::Line(String::from_utf8_lossy(buffer).into_owned()))
}

async fn write_loop(mut socket: OwnedWriteHalf, mut outbound: mpsc::UnboundedReceiver<Outbound>) {
    while let Some(message) = outbound.recv().await {
        let event = match message {
            Outbound::Event(event) => event,
            Outbound::Close => break,
        };
        let mut line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize event: {}", e);
                continue;
            }
        };
        line.push('\n');
        if let Err(e) = socket.write_all(line.as_bytes()).await {
            debug!("Failed to write to socket: {}", e);
            break;
        }
    }
    let _ = socket.shutdown().await;
}

/// Routes the opening message. Returns the lobby the connection now belongs to.
async fn handshake(
    line: &str,
    connection: &Connection,
    manager: &LobbyManager,
) -> Option<LobbyHandle> {
    let handshake: Handshake = match serde_json::from_str(line) {
        Ok(handshake) => handshake,
        Err(e) => {
            connection.send(LobbyError::Malformed(e.to_string()).to_event());
            return None;
        }
    };

    let (code, command) = match handshake {
        Handshake::Create => return Some(manager.create(connection.clone()).await),
        Handshake::Join { name, lobby_code } => (
            lobby_code,
            LobbyCommand::Join {
                name,
                connection: connection.clone(),
            },
        ),
        Handshake::Rejoin { id, lobby_code } => (
            lobby_code,
            LobbyCommand::Rejoin {
                id,
                connection: connection.clone(),
            },
        ),
    };

    let sent = match manager.get(&code).await {
        Some(lobby) => lobby.send(command).map(|_| lobby),
        None => Err(LobbyError::LobbyNotFound(code)),
    };
    match sent {
        Ok(lobby) => Some(lobby),
        Err(e) => {
            debug!("Handshake rejected: {}", e);
            connection.send(e.to_event());
            None
        }
    }
}

fn forward(line: &str, lobby: &LobbyHandle, connection: &Connection) {
    let action = match ClientAction::from_json(line) {
        Ok(action) => action,
        Err(e) => {
            connection.send(LobbyError::Malformed(e.to_string()).to_event());
            return;
        }
    };

    let command = LobbyCommand::Action {
        action,
        from: connection.clone(),
    };
    if let Err(e) = lobby.send(command) {
        connection.send(e.to_event());
    }
}
