// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! CLI-style command translation
//!
//! Turns a human-friendly command string such as
//! `"/ip address add address=10.0.0.1/24 interface=ether1"` into the ordered
//! API words of one outbound sentence:
//! `["/ip/address/add", "=address=10.0.0.1/24", "=interface=ether1"]`.
//!
//! Translation is pure and total: malformed input never fails, unknown
//! tokens fall through to attribute emission.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

/// Console action words. Once the command path ends in one of these the path
/// is complete and any following bare token is an attribute.
const ACTION_WORDS: &[&str] = &[
    "print", "add", "set", "remove", "enable", "disable", "export", "monitor", "getall", "reset",
    "cancel", "unset",
];

/// Translates one whitespace-separated command string into API words.
///
/// Rules, applied token by token:
/// - leading tokens accumulate into the slash-joined command path; `pr` is
///   rewritten to `print`; the path is complete once it ends in a console
///   action word, bare tokens after that are attributes
/// - `unset` joins the path wherever it appears and switches the remaining
///   value-name tokens to `=value-name=<token>` form (tokens containing `*`
///   are left as plain attributes)
/// - a token containing `=`, or the token `detail`, starts attribute mode;
///   attribute tokens are emitted with a leading `=`, every `\s` replaced by
///   a space, and `name=b'<base64>'` values decoded to UTF-8
/// - `where` starts query mode: each following token is emitted as
///   `?<token>`; more than one query term appends the conjunction `?#&`
///
/// Empty input yields an empty word list; the dispatcher treats that as a
/// no-op rather than writing an empty sentence.
#[must_use]
pub fn translate(command: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    let mut attr_mode = false;
    let mut where_mode = false;
    let mut unset_flag = false;
    let mut where_count = 0usize;

    for raw in command.split_whitespace() {
        if raw == "where" {
            where_mode = true;
            attr_mode = false;
            continue;
        }
        if where_mode {
            words.push(format!("?{raw}"));
            where_count += 1;
            continue;
        }
        if raw == "unset" {
            unset_flag = true;
            attr_mode = true;
            join_path(&mut words, "unset");
            continue;
        }
        if !attr_mode && raw != "detail" && !raw.contains('=') {
            let part = if raw == "pr" { "print" } else { raw };
            join_path(&mut words, part);
            if path_complete(&words[0]) {
                attr_mode = true;
            }
            continue;
        }

        attr_mode = true;
        let token = raw.replace("\\s", " ");
        if let Some(word) = decode_base64_value(&token) {
            words.push(word);
        } else if unset_flag && !token.contains('*') {
            words.push(format!("=value-name={token}"));
        } else {
            words.push(format!("={token}"));
        }
    }

    // logical AND of all preceding query terms
    if where_count > 1 {
        words.push("?#&".to_string());
    }
    words
}

/// Appends one component to the command path (always `words[0]`).
fn join_path(words: &mut Vec<String>, part: &str) {
    match words.first_mut() {
        Some(path) => {
            path.push('/');
            path.push_str(part);
        }
        None if part.starts_with('/') => words.push(part.to_string()),
        None => words.push(format!("/{part}")),
    }
}

fn path_complete(path: &str) -> bool {
    path.rsplit('/')
        .next()
        .is_some_and(|last| ACTION_WORDS.contains(&last))
}

/// Decodes the `name=b'<base64>'` escape used for values the simple
/// tokenizer cannot carry. Returns `None` (caller falls back to plain
/// emission) when the token does not match or does not decode to UTF-8.
fn decode_base64_value(token: &str) -> Option<String> {
    let (name, value) = token.split_once('=')?;
    let payload = value.strip_prefix("b'")?.strip_suffix('\'')?;
    let decoded = BASE64.decode(payload).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    Some(format!("={name}={text}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_with_attributes() {
        assert_eq!(
            translate("ip address add address=10.0.0.1/24 interface=ether1"),
            vec!["/ip/address/add", "=address=10.0.0.1/24", "=interface=ether1"]
        );
    }

    #[test]
    fn test_single_where_clause() {
        assert_eq!(
            translate("/interface print where type=ether"),
            vec!["/interface/print", "?type=ether"]
        );
    }

    #[test]
    fn test_multiple_where_clauses_are_conjoined() {
        assert_eq!(
            translate("/ip/route/print where dst-address=0.0.0.0/0 distance=1"),
            vec![
                "/ip/route/print",
                "?dst-address=0.0.0.0/0",
                "?distance=1",
                "?#&"
            ]
        );
    }

    #[test]
    fn test_base64_value_escape() {
        assert_eq!(
            translate("/system/identity/set name=b'Um91dGVyIE9uZQ=='"),
            vec!["/system/identity/set", "=name=Router One"]
        );
    }

    #[test]
    fn test_unset_rewrites_value_names() {
        assert_eq!(
            translate("/user/set admin unset password"),
            vec!["/user/set/unset", "=admin", "=value-name=password"]
        );
    }

    #[test]
    fn test_space_escape() {
        assert_eq!(
            translate("ip firewall filter add comment=hello\\sworld action=accept"),
            vec![
                "/ip/firewall/filter/add",
                "=comment=hello world",
                "=action=accept"
            ]
        );
    }

    #[test]
    fn test_normalized_path_is_idempotent() {
        assert_eq!(translate("/ip/address/print"), vec!["/ip/address/print"]);
        assert_eq!(translate("ip address print"), vec!["/ip/address/print"]);
    }

    #[test]
    fn test_pr_alias() {
        assert_eq!(translate("ip address pr"), vec!["/ip/address/print"]);
    }

    #[test]
    fn test_detail_is_a_bare_attribute() {
        assert_eq!(
            translate("ip address print detail"),
            vec!["/ip/address/print", "=detail"]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(translate("").is_empty());
        assert!(translate("   ").is_empty());
    }

    #[test]
    fn test_unset_leaves_id_tokens_alone() {
        assert_eq!(
            translate("/interface/set unset *2"),
            vec!["/interface/set/unset", "=*2"]
        );
    }

    #[test]
    fn test_malformed_base64_falls_through() {
        assert_eq!(
            translate("/system/identity/set name=b'%%%'"),
            vec!["/system/identity/set", "=name=b'%%%'"]
        );
    }

    #[test]
    fn test_value_with_equals_needs_base64_escape() {
        // literal '=' in the value survives only the first split
        assert_eq!(
            translate("/ppp/secret/add name=u password=a=b"),
            vec!["/ppp/secret/add", "=name=u", "=password=a=b"]
        );
    }
}
