use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::Client;

use crate::app::Result;
use crate::fetcher::http_fetcher::USER_AGENT;
use crate::resolver::RedirectProbe;

/// Sends `HEAD` requests without following redirects.
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    /// `timeout` bounds both connecting and the whole request.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .redirect(Policy::none())
            .connect_timeout(timeout)
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl RedirectProbe for HttpProbe {
    async fn location(&self, url: &str) -> Result<Option<String>> {
        let response = self.client.head(url).send().await?;

        Ok(response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from))
    }
}
