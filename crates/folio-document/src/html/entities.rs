// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTML character-reference decoding: the named entities that word-processor
// converters emit plus decimal and hexadecimal numeric references, in one
// sweep so a decoded `&` never starts another reference.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static CHARACTER_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#([0-9]+)|#[xX]([0-9a-fA-F]+)|([a-zA-Z]+));").expect("valid regex")
});

fn named(name: &str) -> Option<&'static str> {
    let decoded = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        // Non-breaking spaces become plain spaces in Markdown.
        "nbsp" => " ",
        "copy" => "©",
        "reg" => "®",
        "mdash" => "—",
        "ndash" => "–",
        "ldquo" => "“",
        "rdquo" => "”",
        "lsquo" => "‘",
        "rsquo" => "’",
        "hellip" => "…",
        _ => return None,
    };
    Some(decoded)
}

/// Decode character references. Unknown or invalid references are left
/// untouched.
pub fn decode_entities(text: &str) -> String {
    CHARACTER_REFERENCE
        .replace_all(text, |caps: &Captures<'_>| {
            let decoded = match (caps.get(1), caps.get(2), caps.get(3)) {
                (Some(dec), _, _) => dec
                    .as_str()
                    .parse::<u32>()
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from),
                (None, Some(hex), _) => u32::from_str_radix(hex.as_str(), 16)
                    .ok()
                    .and_then(char::from_u32)
                    .map(String::from),
                (None, None, Some(name)) => named(name.as_str()).map(str::to_string),
                (None, None, None) => None,
            };
            decoded.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
