//! RFC-1459 parameter splitting.

/// Extracts the parameters from an IRC line according to RFC 1459.
///
/// Leading whitespace as well as runs of spaces between parameters are
/// skipped. Once at least one parameter has been emitted, a parameter
/// starting with `:` extends to the end of the line (spaces included),
/// without the colon. A leading `:` on the very first token is part of
/// that token.
///
/// The input must already be stripped of its line ending.
///
/// ```
/// use slirc_client::protocol::irc_split;
///
/// assert_eq!(
///     irc_split(":nick!u@h PRIVMSG #c :hello  world"),
///     vec!["nick!u@h", "PRIVMSG", "#c", "hello  world"]
/// );
/// ```
pub fn irc_split(line: &str) -> Vec<String> {
    let bytes = line.as_bytes();
    let mut params: Vec<String> = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        while pos < bytes.len() && bytes[pos] == b' ' {
            pos += 1;
        }
        if pos >= bytes.len() {
            break;
        }

        if bytes[pos] == b':' && !params.is_empty() {
            // Extended parameter: the rest of the line, colon stripped.
            params.push(line[pos + 1..].to_string());
            break;
        }

        let start = pos;
        while pos < bytes.len() && bytes[pos] != b' ' {
            pos += 1;
        }
        params.push(line[start..pos].to_string());
    }

    params
}
