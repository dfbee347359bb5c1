//! Doubles shared by the session and poller tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::Status;
use crate::fetcher::{ApiError, Query, TimelineFetcher};
use crate::irc::{format_line, Post};
use crate::resolver::RedirectProbe;

pub enum Reply {
    Ok(Vec<Status>),
    Err(ApiError),
    Panic,
}

/// Plays back queued replies; an empty queue answers "not modified".
pub struct StubFetcher {
    replies: Mutex<VecDeque<Reply>>,
    paths: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            paths: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> usize {
        self.paths.lock().unwrap().len()
    }

    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

#[async_trait]
impl TimelineFetcher for StubFetcher {
    async fn fetch(&self, path: &str, _query: Query) -> std::result::Result<Vec<Status>, ApiError> {
        self.paths.lock().unwrap().push(path.to_string());
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            None => Ok(Vec::new()),
            Some(Reply::Ok(statuses)) => Ok(statuses),
            Some(Reply::Err(e)) => Err(e),
            Some(Reply::Panic) => panic!("stub fetcher exploded"),
        }
    }
}

#[derive(Default)]
pub struct StubProbe {
    targets: HashMap<String, String>,
}

impl StubProbe {
    pub fn with(url: &str, target: &str) -> Self {
        Self {
            targets: HashMap::from([(url.to_string(), target.to_string())]),
        }
    }
}

#[async_trait]
impl RedirectProbe for StubProbe {
    async fn location(&self, url: &str) -> Result<Option<String>> {
        Ok(self.targets.get(url).cloned())
    }
}

/// Records every posted line in wire format.
#[derive(Default)]
pub struct RecordingPost {
    lines: Mutex<Vec<String>>,
}

impl RecordingPost {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl Post for RecordingPost {
    fn post(&self, prefix: &str, command: &str, params: &[&str]) {
        self.lines
            .lock()
            .unwrap()
            .push(format_line(prefix, command, params));
    }
}

/// Build statuses from `(id, author, text)` triples, keeping their order.
pub fn statuses(specs: &[(&str, &str, &str)]) -> Vec<Status> {
    specs
        .iter()
        .map(|(id, author, text)| Status::new(*id, author, text))
        .collect()
}
