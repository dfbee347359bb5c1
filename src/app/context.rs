use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::app::Result;
use crate::config::Config;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::TimelineFetcher;
use crate::resolver::{HttpProbe, RedirectProbe, UrlResolver};

/// Everything a session needs, shared by all connections.
pub struct GatewayContext {
    pub config: Config,
    pub fetcher: Arc<dyn TimelineFetcher>,
    pub resolver: Arc<UrlResolver>,
    pub api_host: String,
}

impl GatewayContext {
    pub fn new(config: Config) -> Result<Self> {
        let fetcher: Arc<dyn TimelineFetcher> =
            Arc::new(HttpFetcher::new(&config.feed.api_base, &config.feed.source)?);
        let probe: Arc<dyn RedirectProbe> = Arc::new(HttpProbe::new(Duration::from_secs(
            config.feed.resolve_timeout_secs,
        ))?);

        Self::with_parts(config, fetcher, probe)
    }

    pub fn with_parts(
        config: Config,
        fetcher: Arc<dyn TimelineFetcher>,
        probe: Arc<dyn RedirectProbe>,
    ) -> Result<Self> {
        let api_host = Url::parse(&config.feed.api_base)?
            .host_str()
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            config,
            fetcher,
            resolver: Arc::new(UrlResolver::new(probe)),
            api_host,
        })
    }
}
