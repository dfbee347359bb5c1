use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::domain::Status;

/// The only entities the API escapes in status bodies.
static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(quot|lt|gt|amp);").expect("hard-coded pattern"));

#[derive(Clone, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Turn a status body into a single IRC-safe line.
    pub fn format(&self, status: &Status) -> String {
        format_text(&status.text)
    }
}

/// Decode `&quot; &lt; &gt; &amp;` in one pass and fold line breaks into spaces.
pub fn format_text(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| match &caps[1] {
            "quot" => "\"",
            "lt" => "<",
            "gt" => ">",
            _ => "&",
        })
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}
