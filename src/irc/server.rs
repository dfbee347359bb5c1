use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, FramedRead};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

use crate::config::ServerConfig;
use crate::irc::{Message, Outbox, Post, Registration, SessionHooks, PING, PONG};

/// Longest accepted client line, CRLF included.
const MAX_LINE_LENGTH: usize = 512;

/// Accepts IRC clients and runs the registration handshake for each.
#[derive(Debug, Clone)]
pub struct IrcServer {
    name: String,
    version: String,
    created_at: DateTime<Utc>,
}

enum Flow {
    Continue,
    Quit,
}

#[derive(Default)]
struct Pending {
    nick: Option<String>,
    user: Option<(String, String)>,
}

struct Connection<S> {
    server: IrcServer,
    host: String,
    outbox: Outbox,
    session: S,
    pending: Pending,
    registration: Option<Registration>,
}

impl IrcServer {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            name: config.name.clone(),
            version: config.version.clone(),
            created_at: Utc::now(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Accept connections until `shutdown` fires. `make_session` builds the
    /// hooks for each connection from its outbox.
    pub async fn serve<F, S>(
        &self,
        listener: TcpListener,
        make_session: F,
        shutdown: CancellationToken,
    ) where
        F: Fn(Outbox) -> S + Send + Sync + 'static,
        S: SessionHooks + 'static,
    {
        let make_session = Arc::new(make_session);

        loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((socket, peer)) => {
                    info!("Accepted connection from {}", peer);
                    let server = self.clone();
                    let make_session = make_session.clone();
                    let token = shutdown.child_token();

                    tokio::spawn(
                        async move {
                            server
                                .handle_connection(socket, peer, make_session.as_ref(), token)
                                .await;
                        }
                        .instrument(tracing::info_span!("connection", %peer)),
                    );
                }
                Err(e) => warn!("Failed to accept connection: {}", e),
            }
        }

        info!("Listener stopped");
    }

    async fn handle_connection<F, S>(
        self,
        socket: TcpStream,
        peer: SocketAddr,
        make_session: &F,
        shutdown: CancellationToken,
    ) where
        F: Fn(Outbox) -> S,
        S: SessionHooks,
    {
        let (reader, mut writer) = socket.into_split();
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        // Ends once every outbox clone (session and poller included) is dropped
        tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                let written = async {
                    writer.write_all(line.as_bytes()).await?;
                    writer.write_all(b"\r\n").await
                };
                if let Err(e) = written.await {
                    debug!("Write failed: {}", e);
                    break;
                }
            }
            let _ = writer.shutdown().await;
        });

        let outbox = Outbox::new(tx);
        let mut conn = Connection {
            host: peer.ip().to_string(),
            session: make_session(outbox.clone()),
            outbox,
            server: self,
            pending: Pending::default(),
            registration: None,
        };

        let mut lines = FramedRead::new(
            reader,
            AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), Vec::new(), MAX_LINE_LENGTH),
        );

        loop {
            let read = tokio::select! {
                _ = shutdown.cancelled() => break,
                read = lines.next() => read,
            };

            let chunk = match read {
                None => break,
                Some(Ok(chunk)) => chunk,
                Some(Err(AnyDelimiterCodecError::MaxChunkLengthExceeded)) => {
                    debug!("Line longer than {} bytes", MAX_LINE_LENGTH);
                    conn.numeric("417", &["Input line was too long"]);
                    conn.outbox.post("", "ERROR", &["Closing Link"]);
                    break;
                }
                Some(Err(e)) => {
                    debug!("Read failed: {}", e);
                    break;
                }
            };

            let line = String::from_utf8_lossy(&chunk);
            let Some(message) = Message::parse(line.trim_end_matches('\r')) else {
                continue;
            };

            if let Flow::Quit = conn.handle(&message) {
                break;
            }
        }

        info!("Connection from {} closed", peer);
        conn.session.on_disconnected();
    }
}

impl<S: SessionHooks> Connection<S> {
    fn handle(&mut self, message: &Message) -> Flow {
        match message.command.as_str() {
            PING => {
                let token = message.param(0).unwrap_or(&self.server.name).to_string();
                self.outbox
                    .post(&self.server.name, PONG, &[&self.server.name, &token]);
            }
            "QUIT" => {
                self.outbox.post("", "ERROR", &["Closing Link"]);
                return Flow::Quit;
            }
            "PASS" | "CAP" => {}
            "NICK" => match message.param(0) {
                None => self.numeric("431", &["No nickname given"]),
                Some(_) if self.registration.is_some() => {
                    debug!("Ignoring nick change after registration");
                }
                Some(nick) => {
                    self.pending.nick = Some(nick.to_string());
                    self.try_register();
                }
            },
            "USER" => {
                if self.registration.is_some() {
                    self.numeric("462", &["You may not reregister"]);
                } else if message.params.len() < 4 {
                    self.numeric("461", &["USER", "Not enough parameters"]);
                } else {
                    let (user, real_name) = (&message.params[0], &message.params[3]);
                    self.pending.user = Some((user.clone(), real_name.clone()));
                    self.try_register();
                }
            }
            command if self.registration.is_none() => {
                debug!("{} before registration", command);
                self.numeric("451", &["You have not registered"]);
            }
            command => debug!("Ignoring {}", command),
        }
        Flow::Continue
    }

    fn try_register(&mut self) {
        let (Some(nick), Some((user, real_name))) = (&self.pending.nick, &self.pending.user) else {
            return;
        };

        let registration = Registration {
            nick: nick.clone(),
            user: user.clone(),
            host: self.host.clone(),
            real_name: real_name.clone(),
        };
        info!("Registered {}", registration.prefix());
        self.registration = Some(registration.clone());

        let server = &self.server;
        let welcome = format!(
            "Welcome to the Internet Relay Network {}",
            registration.prefix()
        );
        let host = format!(
            "Your host is {}, running version {}",
            server.name, server.version
        );
        let created = format!(
            "This server was created {}",
            server.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        let name = server.name.clone();
        let version = server.version.clone();

        self.numeric("001", &[&welcome]);
        self.numeric("002", &[&host]);
        self.numeric("003", &[&created]);
        self.numeric("004", &[&name, &version, "o", "o"]);
        self.numeric("422", &["MOTD File is missing"]);

        self.session.on_user(&registration);
    }

    fn numeric(&self, code: &str, params: &[&str]) {
        let target = self
            .registration
            .as_ref()
            .map(|r| r.nick.as_str())
            .or(self.pending.nick.as_deref())
            .unwrap_or("*");

        let mut all = Vec::with_capacity(params.len() + 1);
        all.push(target);
        all.extend_from_slice(params);
        self.outbox.post(&self.server.name, code, &all);
    }
}
