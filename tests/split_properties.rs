//! Property-based tests for the RFC-1459 parameter splitter.
//!
//! Verifies that:
//! 1. `irc_split` never panics on arbitrary input
//! 2. Splitting is deterministic
//! 3. Joining a split with single spaces (colon-prefixing the last
//!    parameter when needed) produces a canonical form whose split equals
//!    the original split

use proptest::prelude::*;

use slirc_client::irc_split;

/// Joins split parameters back into a canonical IRC line.
///
/// The last parameter gets a `:` prefix when it would otherwise not
/// survive a re-split: it contains spaces, starts with a colon, or is
/// empty. The first parameter is emitted verbatim; a leading colon there
/// is part of the token.
fn irc_join(params: &[String]) -> String {
    let mut line = String::new();
    for (i, param) in params.iter().enumerate() {
        if i > 0 {
            line.push(' ');
        }
        let is_last = i == params.len() - 1;
        if is_last && i > 0 && (param.is_empty() || param.contains(' ') || param.starts_with(':'))
        {
            line.push(':');
        }
        line.push_str(param);
    }
    line
}

/// A token that can appear as a non-final IRC parameter.
fn middle_param() -> impl Strategy<Value = String> {
    prop::string::string_regex("[!-9;-~][!-~]{0,15}").expect("valid regex")
}

/// A final parameter: may be empty and may contain spaces and colons.
fn final_param() -> impl Strategy<Value = String> {
    prop::string::string_regex("[ -~]{0,40}").expect("valid regex")
}

proptest! {
    #[test]
    fn split_never_panics(line in "\\PC*") {
        let _ = irc_split(&line);
    }

    #[test]
    fn split_is_deterministic(line in "[ -~]{0,80}") {
        prop_assert_eq!(irc_split(&line), irc_split(&line));
    }

    #[test]
    fn split_output_has_no_spaces_except_last(line in "[ -~]{0,80}") {
        let params = irc_split(&line);
        for param in params.iter().rev().skip(1) {
            prop_assert!(!param.contains(' '));
        }
    }

    #[test]
    fn join_then_split_roundtrips(
        mut params in prop::collection::vec(middle_param(), 1..5),
        last in final_param(),
    ) {
        params.push(last);
        let line = irc_join(&params);
        prop_assert_eq!(irc_split(&line), params);
    }

    #[test]
    fn split_then_join_is_canonical(line in "[ -~]{0,80}") {
        let first = irc_split(&line);
        let rejoined = irc_join(&first);
        prop_assert_eq!(irc_split(&rejoined), first);
    }
}

#[test]
fn join_handles_lone_extended_marker() {
    let params = vec!["CMD".to_string(), String::new()];
    assert_eq!(irc_join(&params), "CMD :");
    assert_eq!(irc_split("CMD :"), params);
}
