use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Options a client supplies through its IRC real-name field:
/// `<account> [key=value | flag ...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    account: String,
    values: BTreeMap<String, Option<String>>,
}

impl ClientOptions {
    /// Parse an option string. The first token is the account handle; when
    /// the string is blank `fallback_account` (the client's nick) is used.
    pub fn parse(raw: &str, fallback_account: &str) -> Self {
        let mut tokens = raw.split_whitespace();
        let account = tokens
            .next()
            .map(String::from)
            .unwrap_or_else(|| fallback_account.to_string());

        let values = tokens
            .map(|token| match token.split_once('=') {
                Some((key, value)) => (key.to_string(), Some(value.to_string())),
                None => (token.to_string(), None),
            })
            .collect();

        Self { account, values }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_deref())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Prefix joined nicks with `@` for clients that complete `@nick` replies
    pub fn athack(&self) -> bool {
        self.contains("athack")
    }

    /// The client's `ratio=T:F:C`, or `default` when absent or malformed.
    pub fn ratio(&self, default: PollRatio) -> PollRatio {
        match self.get("ratio") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!("Ignoring ratio {:?}: {}", raw, e);
                default
            }),
            None => default,
        }
    }
}

impl fmt::Display for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "account={}", self.account)?;
        for (key, value) in &self.values {
            match value {
                Some(value) => write!(f, " {}={}", key, value)?,
                None => write!(f, " {}", key)?,
            }
        }
        Ok(())
    }
}

/// Poll categories sharing the hourly request budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Timeline,
    Friends,
    Channel,
}

#[derive(Debug, Error, PartialEq)]
pub enum RatioError {
    #[error("expected three colon-separated weights, got {0}")]
    Arity(usize),

    #[error("invalid weight: {0}")]
    InvalidWeight(String),

    #[error("weights must sum to a positive number")]
    ZeroFooting,
}

/// Relative weights of the three poll categories.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollRatio {
    pub timeline: f64,
    pub friends: f64,
    pub channel: f64,
}

impl Default for PollRatio {
    fn default() -> Self {
        Self {
            timeline: 10.0,
            friends: 3.0,
            channel: 5.0,
        }
    }
}

impl FromStr for PollRatio {
    type Err = RatioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 3 {
            return Err(RatioError::Arity(parts.len()));
        }

        let mut weights = [0.0f64; 3];
        for (slot, part) in weights.iter_mut().zip(&parts) {
            let weight: f64 = part
                .trim()
                .parse()
                .map_err(|_| RatioError::InvalidWeight(part.to_string()))?;
            if !weight.is_finite() || weight < 0.0 {
                return Err(RatioError::InvalidWeight(part.to_string()));
            }
            *slot = weight;
        }

        let ratio = Self {
            timeline: weights[0],
            friends: weights[1],
            channel: weights[2],
        };
        if ratio.footing() <= 0.0 {
            return Err(RatioError::ZeroFooting);
        }
        Ok(ratio)
    }
}

impl PollRatio {
    /// Sum of all weights
    pub fn footing(&self) -> f64 {
        self.timeline + self.friends + self.channel
    }

    pub fn weight(&self, category: Category) -> f64 {
        match category {
            Category::Timeline => self.timeline,
            Category::Friends => self.friends,
            Category::Channel => self.channel,
        }
    }

    pub fn share(&self, category: Category) -> f64 {
        self.weight(category) / self.footing()
    }

    pub fn interval(&self, category: Category, hourly_limit: u32) -> Duration {
        Duration::from_secs(poll_interval_secs(hourly_limit, self.share(category)))
    }
}

/// Seconds between polls for a category holding `share` of `hourly_limit`.
///
/// At least one request per hour and at least one second between requests.
pub fn poll_interval_secs(hourly_limit: u32, share: f64) -> u64 {
    let requests = (f64::from(hourly_limit) * share).round();
    let requests = if requests.is_finite() && requests >= 1.0 {
        requests as u64
    } else {
        1
    };
    let secs = (3600 / requests).max(1);
    tracing::debug!("Frequency: {}", secs);
    secs
}
