//! Request/reply grammar on top of the raw tokenizer: building outgoing
//! request lines, classifying reply lines, and recognizing the
//! `BEGIN ... / END ...` list framing used by every `LIST` command.

use crate::model::TrackingId;
use crate::tokenizer::{quote_for_wire, tokenize};

/// Build a request line (without the trailing `\n`) from bare, unquoted
/// tokens — identifiers and device/variable names never need quoting.
pub fn encode_request(tokens: &[&str]) -> String {
    tokens.join(" ")
}

/// Build a request line whose final argument is a free-form value that
/// must be wire-quoted (e.g. the new value in `SET VAR`).
pub fn encode_request_with_value(prefix: &[&str], value: &str) -> String {
    let mut line = prefix.join(" ");
    line.push(' ');
    line.push_str(&quote_for_wire(value));
    line
}

/// A single parsed reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok,
    OkTracking(TrackingId),
    Err(String),
    /// Any other line, already tokenized (e.g. a `VAR ups1 name "value"`
    /// body row, or a `BEGIN`/`END` framing line).
    Tokens(Vec<String>),
}

pub fn parse_reply_line(line: &str) -> Reply {
    let tokens = tokenize(line);
    match tokens.first().map(String::as_str) {
        Some("ERR") => Reply::Err(tokens.get(1).cloned().unwrap_or_default()),
        Some("OK") if tokens.len() >= 3 && tokens[1] == "TRACKING" => {
            Reply::OkTracking(tokens[2].clone())
        }
        Some("OK") => Reply::Ok,
        _ => Reply::Tokens(tokens),
    }
}

/// True if `tokens` is the `BEGIN <keyword...>` framing line for `keyword`.
pub fn is_begin(tokens: &[String], keyword: &[&str]) -> bool {
    matches_marker(tokens, "BEGIN", keyword)
}

/// True if `tokens` is the `END <keyword...>` framing line for `keyword`.
pub fn is_end(tokens: &[String], keyword: &[&str]) -> bool {
    matches_marker(tokens, "END", keyword)
}

fn matches_marker(tokens: &[String], marker: &str, keyword: &[&str]) -> bool {
    if tokens.len() != keyword.len() + 1 || tokens[0] != marker {
        return false;
    }
    tokens[1..].iter().zip(keyword).all(|(a, b)| a == b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_plain_request() {
        assert_eq!(encode_request(&["LIST", "VAR", "ups1"]), "LIST VAR ups1");
    }

    #[test]
    fn encodes_request_with_quoted_value() {
        assert_eq!(
            encode_request_with_value(&["SET", "VAR", "ups1", "ups.id"], "lab-A"),
            "SET VAR ups1 ups.id \"lab-A\""
        );
    }

    #[test]
    fn parses_ok_tracking_reply() {
        assert_eq!(
            parse_reply_line("OK TRACKING abc"),
            Reply::OkTracking("abc".to_string())
        );
    }

    #[test]
    fn parses_plain_ok_reply() {
        assert_eq!(parse_reply_line("OK"), Reply::Ok);
    }

    #[test]
    fn parses_err_reply_with_code() {
        assert_eq!(
            parse_reply_line("ERR UNKNOWN-UPS"),
            Reply::Err("UNKNOWN-UPS".to_string())
        );
    }

    #[test]
    fn recognizes_begin_and_end_markers() {
        let begin = tokenize("BEGIN LIST VAR ups1");
        let end = tokenize("END LIST VAR ups1");
        assert!(is_begin(&begin, &["LIST", "VAR", "ups1"]));
        assert!(is_end(&end, &["LIST", "VAR", "ups1"]));
        assert!(!is_begin(&end, &["LIST", "VAR", "ups1"]));
    }
}
