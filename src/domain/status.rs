use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer};

/// Remote status identifier. The API sends either a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatusId(String);

impl StatusId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for StatusId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(u64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Number(n) => StatusId(n.to_string()),
            RawId::Text(s) => StatusId(s),
        })
    }
}

/// One post from the remote timeline. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    #[serde(default)]
    pub id: Option<StatusId>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub user_login_id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub text: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Status {
    pub fn new(id: impl Into<String>, author: &str, text: &str) -> Self {
        Self {
            id: Some(StatusId::new(id)),
            user_login_id: author.to_string(),
            text: text.to_string(),
            created_at: None,
        }
    }

    /// Parsed `created_at`, accepting RFC 2822 and RFC 3339 timestamps
    pub fn created_time(&self) -> Option<DateTime<FixedOffset>> {
        let raw = self.created_at.as_deref()?;
        DateTime::parse_from_rfc2822(raw)
            .or_else(|_| DateTime::parse_from_rfc3339(raw))
            .ok()
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_and_string_ids() {
        let statuses: Vec<Status> = serde_json::from_str(
            r#"[{"id": 42, "user_login_id": "alice", "text": "hi"},
                {"id": "43", "user_login_id": "bob", "text": "yo"}]"#,
        )
        .unwrap();

        assert_eq!(statuses[0].id, Some(StatusId::new("42")));
        assert_eq!(statuses[1].id, Some(StatusId::new("43")));
    }

    #[test]
    fn test_missing_and_null_fields() {
        let statuses: Vec<Status> = serde_json::from_str(
            r#"[{"user_login_id": "alice", "text": null, "extra": [1, 2]},
                {"id": null, "text": "orphan"}]"#,
        )
        .unwrap();

        assert!(statuses[0].id.is_none());
        assert_eq!(statuses[0].text, "");
        assert!(statuses[1].id.is_none());
        assert_eq!(statuses[1].user_login_id, "");
    }

    #[test]
    fn test_created_time() {
        let mut status = Status::new("1", "alice", "hi");
        assert!(status.created_time().is_none());

        status.created_at = Some("Mon, 01 Jan 2024 00:00:00 +0900".into());
        assert!(status.created_time().is_some());

        status.created_at = Some("2024-01-01T00:00:00Z".into());
        assert!(status.created_time().is_some());

        status.created_at = Some("yesterday".into());
        assert!(status.created_time().is_none());
    }
}
