//! Minimal IRC server side: line codec, connection loop and the hooks a
//! gateway session plugs into.

pub mod message;
pub mod server;

use tokio::sync::mpsc;

pub use message::{format_line, Message};
pub use server::IrcServer;

pub const JOIN: &str = "JOIN";
pub const MODE: &str = "MODE";
pub const NOTICE: &str = "NOTICE";
pub const PING: &str = "PING";
pub const PONG: &str = "PONG";
pub const PRIVMSG: &str = "PRIVMSG";
pub const TOPIC: &str = "TOPIC";

/// Emits one IRC line to the connected client.
pub trait Post: Send + Sync {
    fn post(&self, prefix: &str, command: &str, params: &[&str]);
}

/// [`Post`] implementation feeding a connection's writer task.
#[derive(Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<String>,
}

impl Outbox {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }
}

impl Post for Outbox {
    fn post(&self, prefix: &str, command: &str, params: &[&str]) {
        let line = format_line(prefix, command, params);
        if self.tx.send(line).is_err() {
            tracing::debug!("Dropping {} for closed connection", command);
        }
    }
}

/// Identity established by the NICK/USER handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub nick: String,
    pub user: String,
    pub host: String,
    pub real_name: String,
}

impl Registration {
    /// `nick!user@host`
    pub fn prefix(&self) -> String {
        format!("{}!{}@{}", self.nick, self.user, self.host)
    }
}

/// Callbacks the server drives for each connection.
pub trait SessionHooks: Send {
    /// Registration finished and the welcome burst has been sent.
    fn on_user(&mut self, registration: &Registration);

    /// The connection is gone. Called once, whether or not `on_user` ran.
    fn on_disconnected(&mut self);
}
