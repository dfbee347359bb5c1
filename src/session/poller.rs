//! Background timeline polling.
//!
//! One [`Poller`] task runs per registered session:
//!
//! ```text
//! Idle ──(startup delay)──▶ Fetching ──▶ Dispatching ──▶ Sleeping ─┐
//!                              ▲                                   │
//!                              └───────────────────────────────────┘
//! ```
//!
//! Cancellation from any state ends in `Cancelled`. Failed fetches go
//! straight to `Sleeping`; nothing that happens inside a cycle stops the loop.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn, Instrument};

use crate::domain::{RecentIds, Status};
use crate::fetcher::{Query, TimelineFetcher};
use crate::irc::{Post, PRIVMSG, TOPIC};
use crate::normalizer::Normalizer;
use crate::resolver::UrlResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Fetching,
    Dispatching,
    Sleeping,
    Cancelled,
}

/// Mutable state carried from cycle to cycle.
#[derive(Debug, Clone)]
pub struct TimelineState {
    pub recent: RecentIds,
    pub last_poll: Option<DateTime<Utc>>,
}

impl TimelineState {
    pub fn new(window: usize) -> Self {
        Self {
            recent: RecentIds::new(window),
            last_poll: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PollSettings {
    /// The client's IRC nick; statuses by this author become topic changes
    pub nick: String,
    /// Remote account whose friends timeline is polled
    pub account: String,
    pub channel: String,
    /// Host part of the synthesized `author!author@host` senders
    pub api_host: String,
    pub interval: Duration,
    pub startup_delay: Duration,
}

pub struct Poller {
    fetcher: Arc<dyn TimelineFetcher>,
    resolver: Arc<UrlResolver>,
    normalizer: Normalizer,
    outbox: Arc<dyn Post>,
    settings: PollSettings,
    state: TimelineState,
    state_tx: watch::Sender<PollerState>,
}

/// Owner side of a running poller.
pub struct PollerHandle {
    token: CancellationToken,
    state: watch::Receiver<PollerState>,
    task: JoinHandle<TimelineState>,
}

impl PollerHandle {
    /// Ask the task to stop. Nothing is dispatched after this returns.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn state(&self) -> PollerState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollerState> {
        self.state.clone()
    }

    /// Wait for the task to finish and take back its state.
    pub async fn join(self) -> Option<TimelineState> {
        match self.task.await {
            Ok(state) => Some(state),
            Err(e) => {
                error!("Poller task failed: {}", e);
                None
            }
        }
    }
}

impl Poller {
    pub fn new(
        fetcher: Arc<dyn TimelineFetcher>,
        resolver: Arc<UrlResolver>,
        outbox: Arc<dyn Post>,
        settings: PollSettings,
        state: TimelineState,
    ) -> Self {
        let (state_tx, _) = watch::channel(PollerState::Idle);
        Self {
            fetcher,
            resolver,
            normalizer: Normalizer::new(),
            outbox,
            settings,
            state,
            state_tx,
        }
    }

    pub fn spawn(self) -> PollerHandle {
        let token = CancellationToken::new();
        let state = self.state_tx.subscribe();
        let span = tracing::info_span!("poller", account = %self.settings.account);
        let task = tokio::spawn(self.run(token.clone()).instrument(span));

        PollerHandle { token, state, task }
    }

    async fn run(mut self, token: CancellationToken) -> TimelineState {
        debug!(
            "Polling every {}s after {}s",
            self.settings.interval.as_secs(),
            self.settings.startup_delay.as_secs()
        );

        let started = tokio::select! {
            _ = token.cancelled() => false,
            _ = tokio::time::sleep(self.settings.startup_delay) => true,
        };

        if started {
            loop {
                let cycle = AssertUnwindSafe(self.poll_once(&token)).catch_unwind().await;
                if let Err(panic) = cycle {
                    error!("Poll cycle panicked: {}", panic_message(panic.as_ref()));
                }

                if token.is_cancelled() {
                    break;
                }

                self.state_tx.send_replace(PollerState::Sleeping);
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(self.settings.interval) => {}
                }
            }
        }

        self.state_tx.send_replace(PollerState::Cancelled);
        debug!("Poller stopped");
        self.state
    }

    /// Fetch once and dispatch whatever is new. Returns the number of
    /// statuses sent to the client.
    pub async fn poll_once(&mut self, token: &CancellationToken) -> usize {
        self.state_tx.send_replace(PollerState::Fetching);

        let path = format!("{}/statuses/friends_timeline", self.settings.account);
        let fetched = tokio::select! {
            biased;
            _ = token.cancelled() => return 0,
            fetched = self.fetcher.fetch(&path, Query::new()) => fetched,
        };

        let statuses = match fetched {
            Ok(statuses) => statuses,
            Err(e) if e.is_rate_limited() => {
                warn!("Rate limited: {}", e);
                return 0;
            }
            Err(e) => {
                error!("Failed to fetch timeline: {}", e);
                return 0;
            }
        };

        self.state_tx.send_replace(PollerState::Dispatching);
        let delivered = self.dispatch(statuses, token).await;

        debug!("recent window size = {}", self.state.recent.len());
        self.state.last_poll = Some(Utc::now());
        delivered
    }

    /// The API lists newest first; deliver oldest first.
    async fn dispatch(&mut self, statuses: Vec<Status>, token: &CancellationToken) -> usize {
        let mut delivered = 0;

        for status in statuses.into_iter().rev() {
            if token.is_cancelled() {
                break;
            }

            let Some(id) = status.id.clone() else {
                continue;
            };
            if !self.state.recent.insert(id.clone()) {
                continue;
            }

            let text = self.normalizer.format(&status);
            debug!(
                id = %id,
                author = %status.user_login_id,
                created = ?status.created_time(),
                "{}",
                text
            );
            let text = self.resolver.resolve(&text).await;

            if token.is_cancelled() {
                break;
            }

            let author = &status.user_login_id;
            let sender = format!("{0}!{0}@{1}", author, self.settings.api_host);
            let command = if *author == self.settings.nick {
                TOPIC
            } else {
                PRIVMSG
            };
            self.outbox
                .post(&sender, command, &[&self.settings.channel, &text]);
            delivered += 1;
        }

        delivered
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
