//! Long-running gateway process.
//!
//! Binds the IRC listener, hands every connection a [`Session`] and stops
//! accepting on SIGINT/SIGTERM (Ctrl-C on Windows).

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::app::{GatewayContext, Result};
use crate::irc::IrcServer;
use crate::session::Session;

pub struct Daemon {
    ctx: Arc<GatewayContext>,
    shutdown: CancellationToken,
}

impl Daemon {
    pub fn new(ctx: Arc<GatewayContext>) -> Self {
        Self {
            ctx,
            shutdown: CancellationToken::new(),
        }
    }

    /// Bind the configured address and serve until a shutdown signal.
    pub async fn run(&self) -> Result<()> {
        let server = &self.ctx.config.server;
        let listener = TcpListener::bind((server.host.as_str(), server.port)).await?;

        self.install_signal_handlers();
        self.serve(listener).await
    }

    /// Serve on an already bound listener until [`Daemon::stop`].
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        info!(
            "Gateway {} started on {} (PID: {})",
            self.ctx.config.server.name,
            listener.local_addr()?,
            std::process::id()
        );

        let irc = IrcServer::new(&self.ctx.config.server);
        let ctx = self.ctx.clone();
        irc.serve(
            listener,
            move |outbox| Session::new(ctx.clone(), Arc::new(outbox)),
            self.shutdown.clone(),
        )
        .await;

        info!("Gateway shutting down...");
        Ok(())
    }

    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    fn install_signal_handlers(&self) {
        let shutdown = self.shutdown.clone();

        #[cfg(unix)]
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};

            let (mut sigterm, mut sigint) =
                match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                    (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                    (Err(e), _) | (_, Err(e)) => {
                        warn!("Failed to set up signal handlers: {}", e);
                        return;
                    }
                };

            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM"),
                _ = sigint.recv() => info!("Received SIGINT"),
            }
            shutdown.cancel();
        });

        #[cfg(windows)]
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.cancel();
            }
        });
    }
}
