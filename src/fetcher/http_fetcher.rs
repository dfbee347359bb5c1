use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::{Captures, Regex};
use reqwest::header::{HeaderMap, HeaderValue, IF_MODIFIED_SINCE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::app::Result;
use crate::domain::Status;
use crate::fetcher::{ApiError, Query, TimelineFetcher};

pub const USER_AGENT: &str = concat!("runnel/", env!("CARGO_PKG_VERSION"));

/// The API sometimes single-quotes literals (`'yes'`, `'null'`, ...). String
/// values are matched first so quotes inside them are never rewritten.
static LOOSE_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:[^"\\]|\\.)*"|'(y(?:es)?|no?|true|false|null)'"#)
        .expect("hard-coded pattern")
});

pub struct HttpFetcher {
    client: Client,
    api_base: Url,
    source: String,
}

impl HttpFetcher {
    pub fn new(api_base: &str, source: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .gzip(true)
            .brotli(true)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            api_base: Url::parse(api_base)?,
            source: source.to_string(),
        })
    }

    pub fn api_host(&self) -> &str {
        self.api_base.host_str().unwrap_or_default()
    }

    /// `{api_base}/{path}.json?{query}`
    pub fn request_url(&self, path: &str, query: &Query) -> Url {
        let mut url = self.api_base.clone();
        url.set_path(&format!("/{}.json", path.trim_start_matches('/')));
        url.set_query(None);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }
}

#[async_trait]
impl TimelineFetcher for HttpFetcher {
    async fn fetch(
        &self,
        path: &str,
        mut query: Query,
    ) -> std::result::Result<Vec<Status>, ApiError> {
        query
            .entry("source".to_string())
            .or_insert_with(|| self.source.clone());

        let url = self.request_url(path, &query);

        let mut headers = HeaderMap::new();
        if let Some(since) = query.get("since") {
            if let Ok(value) = HeaderValue::from_str(since) {
                headers.insert(IF_MODIFIED_SINCE, value);
            }
        }

        tracing::debug!("GET {}", url);
        let response = self.client.get(url).headers(headers).send().await?;
        let status = response.status();

        if status != StatusCode::OK {
            return classify_status(status);
        }

        let body = response.text().await?;
        parse_body(&body)
    }
}

/// Outcome of any non-200 response.
pub fn classify_status(status: StatusCode) -> std::result::Result<Vec<Status>, ApiError> {
    let reason = status.canonical_reason().unwrap_or_default().to_string();
    match status {
        StatusCode::OK | StatusCode::NOT_MODIFIED => Ok(Vec::new()),
        StatusCode::BAD_REQUEST => Err(ApiError::RateLimited {
            status: status.as_u16(),
            reason,
        }),
        _ => Err(ApiError::UnexpectedStatus {
            status: status.as_u16(),
            reason,
        }),
    }
}

/// Parse a 200 body, surfacing an `{"error": ...}` object as [`ApiError::Server`].
///
/// Records that don't look like a status are skipped one by one.
pub fn parse_body(body: &str) -> std::result::Result<Vec<Status>, ApiError> {
    let body = LOOSE_LITERAL.replace_all(body, |caps: &Captures| match caps.get(1) {
        Some(literal) => format!("\"{}\"", literal.as_str()),
        None => caps[0].to_string(),
    });
    let value: Value = serde_json::from_str(&body)?;

    if let Some(error) = value.as_object().and_then(|obj| obj.get("error")) {
        match error {
            Value::Null | Value::Bool(false) => {}
            Value::String(message) => return Err(ApiError::Server(message.clone())),
            other => return Err(ApiError::Server(other.to_string())),
        }
    }

    let records: Vec<Value> = serde_json::from_value(value)?;
    Ok(records
        .into_iter()
        .filter_map(|record| match Status::deserialize(record) {
            Ok(status) => Some(status),
            Err(e) => {
                tracing::debug!("Skipping malformed status: {}", e);
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;
    use tokio_test::assert_ok;

    /// Serve one canned HTTP response, handing back the raw request.
    async fn serve_once(response: impl Into<String>) -> (String, oneshot::Receiver<String>) {
        let response = response.into();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            let _ = tx.send(String::from_utf8_lossy(&request).into_owned());
        });

        (format!("http://{}/", addr), rx)
    }

    #[test]
    fn test_request_url() {
        let fetcher = HttpFetcher::new("http://api.example.com/", "hig.rb").unwrap();
        let mut query = Query::new();
        query.insert("source".into(), "hig.rb".into());
        query.insert("since".into(), "Sat, 01 Jan 2000 00:00:00 GMT".into());

        let url = fetcher.request_url("alice/statuses/friends_timeline", &query);
        assert_eq!(url.path(), "/alice/statuses/friends_timeline.json");
        assert_eq!(
            url.query(),
            Some("since=Sat%2C+01+Jan+2000+00%3A00%3A00+GMT&source=hig.rb")
        );
        assert_eq!(fetcher.api_host(), "api.example.com");
    }

    #[test]
    fn test_invalid_api_base() {
        assert!(HttpFetcher::new("not a url", "hig.rb").is_err());
    }

    #[test]
    fn test_classify_status() {
        assert!(assert_ok!(classify_status(StatusCode::NOT_MODIFIED)).is_empty());

        let err = classify_status(StatusCode::BAD_REQUEST).unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(err.to_string(), "400: Bad Request");

        let err = classify_status(StatusCode::INTERNAL_SERVER_ERROR).unwrap_err();
        assert!(!err.is_rate_limited());
        assert_eq!(err.to_string(), "Server Returned 500 Internal Server Error");
    }

    #[test]
    fn test_parse_body_server_error() {
        let err = parse_body(r#"{"error":"x"}"#).unwrap_err();
        assert!(matches!(err, ApiError::Server(ref m) if m == "x"));
        assert!(!err.is_rate_limited());
    }

    #[test]
    fn test_parse_body_loose_literals() {
        let statuses = parse_body(
            r#"[{"id": 1, "user_login_id": "alice", "text": "hi", "protected": 'no', "reply": 'null'}]"#,
        )
        .unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].user_login_id, "alice");
    }

    #[test]
    fn test_parse_body_quoted_words_in_text() {
        let statuses = parse_body(
            r#"[{"id": 1, "user_login_id": "bob", "text": "I said 'no' twice, 'yes'"},
                {"id": 2, "user_login_id": "alice", "text": "hi", "reply": ['null', 'y']}]"#,
        )
        .unwrap();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].text, "I said 'no' twice, 'yes'");
    }

    #[test]
    fn test_parse_body_skips_malformed_records() {
        let statuses = parse_body(
            r#"[{"id": 1.5, "user_login_id": "bob", "text": "bad id"},
                {"id": 2, "user_login_id": "carol", "text": "bad date", "created_at": 7},
                "not an object",
                {"id": 3, "user_login_id": "alice", "text": "fine"}]"#,
        )
        .unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].user_login_id, "alice");
    }

    #[test]
    fn test_parse_body_malformed() {
        assert!(matches!(parse_body("<html>"), Err(ApiError::Parse(_))));
        assert!(matches!(parse_body(r#"{"ok": true}"#), Err(ApiError::Parse(_))));
    }

    #[tokio::test]
    async fn test_fetch_ok() {
        let body = r#"[{"id":2,"user_login_id":"bob","text":"second"},{"id":1,"user_login_id":"alice","text":"first"}]"#;
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let (base, request) = serve_once(response).await;

        let fetcher = HttpFetcher::new(&base, "hig.rb").unwrap();
        let statuses = fetcher
            .fetch("alice/statuses/friends_timeline", Query::new())
            .await
            .unwrap();

        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].text, "second");

        let request = request.await.unwrap();
        assert!(request
            .starts_with("GET /alice/statuses/friends_timeline.json?source=hig.rb HTTP/1.1"));
        assert!(request.to_lowercase().contains("user-agent: runnel/"));
        assert!(!request.to_lowercase().contains("if-modified-since"));
    }

    #[tokio::test]
    async fn test_fetch_not_modified_sends_since() {
        let (base, request) =
            serve_once("HTTP/1.1 304 Not Modified\r\nConnection: close\r\n\r\n").await;

        let fetcher = HttpFetcher::new(&base, "hig.rb").unwrap();
        let mut query = Query::new();
        query.insert("since".into(), "Sat, 01 Jan 2000 00:00:00 GMT".into());
        let statuses = fetcher.fetch("alice/statuses/friends_timeline", query).await.unwrap();

        assert!(statuses.is_empty());
        let request = request.await.unwrap().to_lowercase();
        assert!(request.contains("if-modified-since: sat, 01 jan 2000 00:00:00 gmt"));
    }

    #[tokio::test]
    async fn test_fetch_rate_limited() {
        let (base, _request) = serve_once(
            "HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;

        let fetcher = HttpFetcher::new(&base, "hig.rb").unwrap();
        let err = fetcher
            .fetch("alice/statuses/friends_timeline", Query::new())
            .await
            .unwrap_err();
        assert!(err.is_rate_limited());
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_api_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = HttpFetcher::new(&format!("http://{}/", addr), "hig.rb").unwrap();
        let err = fetcher
            .fetch("alice/statuses/friends_timeline", Query::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }
}
