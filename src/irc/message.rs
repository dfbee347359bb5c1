/// One line from an IRC client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl Message {
    /// Parse a line without its trailing CRLF. Returns `None` for blank lines.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut rest = raw.trim_start();

        let prefix = match rest.strip_prefix(':') {
            Some(stripped) => {
                let (prefix, tail) = stripped.split_once(' ')?;
                rest = tail.trim_start();
                Some(prefix.to_string())
            }
            None => None,
        };

        let (command, mut rest) = match rest.split_once(' ') {
            Some((command, tail)) => (command, tail),
            None => (rest, ""),
        };
        if command.is_empty() {
            return None;
        }

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            match rest.split_once(' ') {
                Some((param, tail)) => {
                    params.push(param.to_string());
                    rest = tail;
                }
                None => {
                    params.push(rest.to_string());
                    break;
                }
            }
        }

        Some(Self {
            prefix,
            command: command.to_ascii_uppercase(),
            params,
        })
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }
}

/// Render `:prefix COMMAND params...` (no CRLF).
///
/// The last parameter is sent as a trailing parameter when it needs to be.
/// Line breaks inside parameters become spaces.
pub fn format_line(prefix: &str, command: &str, params: &[&str]) -> String {
    let mut line = String::new();
    if !prefix.is_empty() {
        line.push(':');
        line.push_str(prefix);
        line.push(' ');
    }
    line.push_str(command);

    if let Some((last, middle)) = params.split_last() {
        for param in middle {
            line.push(' ');
            line.push_str(&sanitize(param));
        }
        let last = sanitize(last);
        line.push(' ');
        if last.is_empty() || last.contains(' ') || last.starts_with(':') {
            line.push(':');
        }
        line.push_str(&last);
    }

    line
}

fn sanitize(param: &str) -> String {
    param.replace(['\r', '\n'], " ")
}
