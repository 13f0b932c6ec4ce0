//! Line tokenizer and wire-quoting for the text protocol.
//!
//! The grammar is whitespace-separated tokens, optionally double-quoted,
//! with a single level of backslash escaping. A bare (unquoted) token
//! ends at the first unescaped space; a quoted token ends at the first
//! unescaped `"` and may itself be followed immediately by more
//! unquoted characters belonging to the same token.

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    SimpleString,
    QuotedString,
    SimpleEscape,
    QuotedEscape,
}

/// Split a protocol line into its whitespace/quote-delimited tokens,
/// unescaping `\\` and `\"` along the way.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut res = Vec::new();
    let mut temp = String::new();
    let mut state = State::Init;

    for c in line.chars() {
        match state {
            State::Init => {
                if c == ' ' {
                    // skip
                } else if c == '"' {
                    state = State::QuotedString;
                } else if c == '\\' {
                    state = State::SimpleEscape;
                } else {
                    temp.push(c);
                    state = State::SimpleString;
                }
            }
            State::SimpleString => {
                if c == ' ' {
                    res.push(std::mem::take(&mut temp));
                    state = State::Init;
                } else if c == '\\' {
                    state = State::SimpleEscape;
                } else if c == '"' {
                    res.push(std::mem::take(&mut temp));
                    state = State::QuotedString;
                } else {
                    temp.push(c);
                }
            }
            State::QuotedString => {
                if c == '\\' {
                    state = State::QuotedEscape;
                } else if c == '"' {
                    res.push(std::mem::take(&mut temp));
                    state = State::Init;
                } else {
                    temp.push(c);
                }
            }
            State::SimpleEscape => {
                if c == '\\' || c == '"' || c == ' ' {
                    temp.push(c);
                } else {
                    temp.push('\\');
                    temp.push(c);
                }
                state = State::SimpleString;
            }
            State::QuotedEscape => {
                if c == '\\' || c == '"' {
                    temp.push(c);
                } else {
                    temp.push('\\');
                    temp.push(c);
                }
                state = State::QuotedString;
            }
        }
    }

    if !temp.is_empty() {
        res.push(temp);
    }

    res
}

/// Quote a string for transmission: always wrapped in `"..."`, with `"`
/// and `\` escaped. Outgoing tokens are always quoted, sidestepping the
/// ambiguity between the simple- and quoted-escape states that only
/// matters for bare, unquoted tokens.
pub fn quote_for_wire(s: &str) -> String {
    let mut res = String::with_capacity(s.len() + 2);
    res.push('"');
    for c in s.chars() {
        match c {
            '"' => res.push_str("\\\""),
            '\\' => res.push_str("\\\\"),
            other => res.push(other),
        }
    }
    res.push('"');
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_simple_space_separated_tokens() {
        assert_eq!(tokenize("VAR ups1 battery.charge"), vec!["VAR", "ups1", "battery.charge"]);
    }

    #[test]
    fn unquotes_quoted_token_with_embedded_space() {
        assert_eq!(tokenize(r#"VAR ups1 "Lab UPS""#), vec!["VAR", "ups1", "Lab UPS"]);
    }

    #[test]
    fn unescapes_quote_and_backslash_inside_quoted_token() {
        assert_eq!(
            tokenize(r#""she said \"hi\"\\""#),
            vec![r#"she said "hi"\"#]
        );
    }

    #[test]
    fn quote_then_tokenize_round_trips() {
        let original = "she said \"hi\"\\";
        let wire = quote_for_wire(original);
        assert_eq!(tokenize(&wire), vec![original]);
    }

    #[test]
    fn quote_for_wire_matches_scenario_s2() {
        assert_eq!(quote_for_wire("she said \"hi\"\\"), "\"she said \\\"hi\\\"\\\\\"");
    }
}
