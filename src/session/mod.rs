//! Per-connection gateway session.
//!
//! A [`Session`] is created for every accepted IRC connection. Once the
//! client registers it joins the feed channel, grants the client operator
//! status, parses the client options and starts the timeline [`Poller`].
//! Disconnecting cancels the poller.

pub mod poller;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::app::GatewayContext;
use crate::domain::{Category, ClientOptions, PollRatio};
use crate::irc::{Post, Registration, SessionHooks, JOIN, MODE, NOTICE};

pub use poller::{PollSettings, Poller, PollerHandle, PollerState, TimelineState};

pub struct Session {
    ctx: Arc<GatewayContext>,
    outbox: Arc<dyn Post>,
    options: Option<ClientOptions>,
    poller: Option<PollerHandle>,
}

impl Session {
    pub fn new(ctx: Arc<GatewayContext>, outbox: Arc<dyn Post>) -> Self {
        Self {
            ctx,
            outbox,
            options: None,
            poller: None,
        }
    }

    pub fn options(&self) -> Option<&ClientOptions> {
        self.options.as_ref()
    }

    pub fn poller_state(&self) -> Option<PollerState> {
        self.poller.as_ref().map(PollerHandle::state)
    }

    /// Tell the client something through a channel notice.
    fn log(&self, message: &str) {
        let message = message.replace('\n', " ");
        self.outbox.post(
            &self.ctx.config.server.name,
            NOTICE,
            &[&self.ctx.config.feed.channel, &message],
        );
    }

    fn default_ratio(&self) -> PollRatio {
        let raw = &self.ctx.config.feed.default_ratio;
        raw.parse().unwrap_or_else(|e| {
            warn!("Invalid default ratio {:?}: {}", raw, e);
            PollRatio::default()
        })
    }
}

impl SessionHooks for Session {
    fn on_user(&mut self, registration: &Registration) {
        let server_name = self.ctx.config.server.name.clone();
        let feed = self.ctx.config.feed.clone();

        self.outbox.post(&registration.prefix(), JOIN, &[&feed.channel]);
        self.outbox
            .post(&server_name, MODE, &[&feed.channel, "+o", &registration.nick]);

        let raw = feed.name.as_deref().unwrap_or(&registration.real_name);
        let options = ClientOptions::parse(raw, &registration.nick);
        info!("Client Options: {}", options);
        self.log(&format!("Client Options: {}", options));

        let ratio = options.ratio(self.default_ratio());
        let interval = ratio.interval(Category::Timeline, feed.hourly_limit);

        let poller = Poller::new(
            self.ctx.fetcher.clone(),
            self.ctx.resolver.clone(),
            self.outbox.clone(),
            PollSettings {
                nick: registration.nick.clone(),
                account: options.account().to_string(),
                channel: feed.channel.clone(),
                api_host: self.ctx.api_host.clone(),
                interval,
                startup_delay: Duration::from_secs(feed.startup_delay_secs),
            },
            TimelineState::new(feed.recent_window),
        );

        if let Some(previous) = self.poller.replace(poller.spawn()) {
            previous.cancel();
        }
        self.options = Some(options);
    }

    fn on_disconnected(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.cancel();
            info!("Stopped polling");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(poller) = &self.poller {
            poller.cancel();
        }
    }
}
