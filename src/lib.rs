//! # Runnel
//!
//! An IRC gateway that presents a status timeline as an IRC channel.
//!
//! ## Architecture
//!
//! Every IRC connection gets its own [`Session`](session::Session), and
//! every registered session runs one background poller:
//!
//! ```text
//! Fetcher → Normalizer → Resolver → IRC post
//! ```
//!
//! - [`fetcher`]: API client with status classification and `304` support
//! - [`normalizer`]: Turns status text into a single IRC line
//! - [`resolver`]: Expands short links through their `Location` header
//! - [`session`]: Connection lifecycle and the adaptive poll loop
//! - [`irc`]: Line codec and the TCP server driving sessions
//!
//! ## Quick Start
//!
//! ```bash
//! # Listen on localhost:16672
//! runnel --foreground
//!
//! # Then point an IRC client at it with the account as real name:
//! #   /set realname "hatena-id ratio=10:3:5"
//! ```

/// Shared context and error types.
///
/// The [`GatewayContext`](app::GatewayContext) struct wires together the
/// fetcher, the short-link resolver and the configuration.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// TOML configuration plus command-line overrides.
pub mod config;

/// Process runner: listener, signal handling, shutdown.
pub mod daemon;

/// Core domain models.
///
/// - [`Status`](domain::Status): One remote post
/// - [`ClientOptions`](domain::ClientOptions): Options from the IRC real name
/// - [`PollRatio`](domain::PollRatio): Per-category share of the request budget
/// - [`RecentIds`](domain::RecentIds): Deduplication window
pub mod domain;

/// Remote API access.
///
/// - [`TimelineFetcher`](fetcher::TimelineFetcher): Async trait for timeline fetching
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// IRC wire format, the `post` capability and the connection server.
pub mod irc;

/// Status text normalization.
pub mod normalizer;

/// Short-link expansion.
pub mod resolver;

/// Per-connection sessions and the timeline poller.
pub mod session;
