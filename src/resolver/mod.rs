//! Short-link expansion.
//!
//! Links on known redirecting hosts are replaced by their `Location`
//! target before a status reaches IRC. Any failure leaves the link as is.

pub mod http_probe;

use std::ops::Range;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use futures::future::join_all;
use regex::Regex;

use crate::app::Result;

pub use http_probe::HttpProbe;

static SHORT_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)http://(preview\.)?tinyurl\.com/[0-9a-z=]+").expect("hard-coded pattern")
});

/// Asks a short-link host where a link points.
#[async_trait]
pub trait RedirectProbe: Send + Sync {
    /// The `Location` header returned for `url`, if any.
    async fn location(&self, url: &str) -> Result<Option<String>>;
}

struct ShortLink {
    span: Range<usize>,
    /// Where the probe is sent (the `preview.` label removed)
    request_url: String,
}

pub struct UrlResolver {
    probe: Arc<dyn RedirectProbe>,
}

impl UrlResolver {
    pub fn new(probe: Arc<dyn RedirectProbe>) -> Self {
        Self { probe }
    }

    /// Replace every short link in `text` by its redirect target.
    pub async fn resolve(&self, text: &str) -> String {
        let links: Vec<ShortLink> = SHORT_LINK
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let request_url = match caps.get(1) {
                    Some(preview) => format!(
                        "{}{}",
                        &text[whole.start()..preview.start()],
                        &text[preview.end()..whole.end()]
                    ),
                    None => whole.as_str().to_string(),
                };
                Some(ShortLink {
                    span: whole.range(),
                    request_url,
                })
            })
            .collect();

        if links.is_empty() {
            return text.to_string();
        }

        let targets = join_all(links.iter().map(|link| self.expand(link))).await;

        let mut resolved = String::with_capacity(text.len());
        let mut cursor = 0;
        for (link, target) in links.iter().zip(targets) {
            resolved.push_str(&text[cursor..link.span.start]);
            match target {
                Some(target) => resolved.push_str(&target),
                None => resolved.push_str(&text[link.span.clone()]),
            }
            cursor = link.span.end;
        }
        resolved.push_str(&text[cursor..]);
        resolved
    }

    async fn expand(&self, link: &ShortLink) -> Option<String> {
        match self.probe.location(&link.request_url).await {
            Ok(Some(target)) => {
                tracing::debug!("Resolved {} -> {}", link.request_url, target);
                Some(target)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::debug!("Could not resolve {}: {}", link.request_url, e);
                None
            }
        }
    }
}
