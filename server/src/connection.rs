//! Replaceable outbound handle for one client socket
//!
//! Game state never owns a socket. Lobbies hold a [`Connection`], which only
//! queues events for the writer task of the transport. Swapping the handle is
//! all a reconnect needs.

use log::debug;
use shared::ServerEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Messages drained by a connection's writer task
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Event(ServerEvent),
    Close,
}

#[derive(Debug, Clone)]
pub struct Connection {
    id: u64,
    sender: mpsc::UnboundedSender<Outbound>,
}

impl Connection {
    pub fn new(sender: mpsc::UnboundedSender<Outbound>) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            sender,
        }
    }

    /// Creates a connection together with the receiving end of its queue.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Queues an event. Never blocks; a gone peer is only logged.
    pub fn send(&self, event: ServerEvent) {
        if self.sender.send(Outbound::Event(event)).is_err() {
            debug!("Connection {} is gone, dropping event", self.id);
        }
    }

    /// Asks the writer task to flush and shut the socket.
    pub fn close(&self) {
        let _ = self.sender.send(Outbound::Close);
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
