//! Post-processing of generated sources.
//!
//! CFR writes non-ASCII string and comment content as `\uXXXX` escapes.
//! This pass turns them back into UTF-8 text in every `.java` file under the
//! output root. It is idempotent: escapes that would decode to `\`, `u` or an
//! ASCII hex digit stay escaped, so decoding can never assemble a new escape
//! sequence out of its own output.

use ignore::WalkBuilder;
use regex::bytes::{Captures, Regex};
use std::borrow::Cow;
use std::path::Path;
use std::sync::LazyLock;

pub const SOURCE_EXTENSION: &str = "java";

static ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\\u([dD][89abAB][0-9a-fA-F]{2})\\u([dD][c-fC-F][0-9a-fA-F]{2})|\\u([0-9a-fA-F]{4})",
    )
    .expect("escape pattern is valid")
});

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UnicodeStats {
    pub visited: usize,
    pub modified: usize,
}

pub fn decode_unicode_escapes(input: &str) -> String {
    match decode_bytes(input.as_bytes()) {
        Cow::Borrowed(_) => input.to_string(),
        Cow::Owned(bytes) => match String::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        },
    }
}

/// Non-UTF-8 bytes around the escapes pass through untouched.
pub fn decode_bytes(input: &[u8]) -> Cow<'_, [u8]> {
    ESCAPE.replace_all(input, |caps: &Captures<'_>| -> Vec<u8> {
        decode_match(caps).unwrap_or_else(|| caps[0].to_vec())
    })
}

fn decode_match(caps: &Captures<'_>) -> Option<Vec<u8>> {
    let ch = if let (Some(high), Some(low)) = (caps.get(1), caps.get(2)) {
        let high = parse_hex(high.as_bytes())?;
        let low = parse_hex(low.as_bytes())?;
        char::from_u32(0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00))?
    } else {
        // Lone surrogates fail here and are left as written.
        let ch = char::from_u32(parse_hex(caps.get(3)?.as_bytes())?)?;
        if ch == '\\' || ch == 'u' || ch.is_ascii_hexdigit() {
            return None;
        }
        ch
    };

    let mut buf = [0u8; 4];
    Some(ch.encode_utf8(&mut buf).as_bytes().to_vec())
}

fn parse_hex(digits: &[u8]) -> Option<u32> {
    u32::from_str_radix(std::str::from_utf8(digits).ok()?, 16).ok()
}

/// Returns whether the file was rewritten.
pub fn process_file(path: &Path) -> std::io::Result<bool> {
    let original = std::fs::read(path)?;
    let decoded = decode_bytes(&original);
    if decoded.as_ref() == original.as_slice() {
        return Ok(false);
    }
    std::fs::write(path, decoded.as_ref())?;
    Ok(true)
}

/// Decodes escapes in every source file under `root`. Unreadable or
/// unwritable files are skipped and only lower the modified count.
pub fn process_tree(root: &Path) -> UnicodeStats {
    let mut stats = UnicodeStats::default();
    let walk = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .build();

    for entry in walk {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!("unicode pass skipped an entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let is_source = entry
            .path()
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case(SOURCE_EXTENSION));
        if !is_source {
            continue;
        }

        stats.visited += 1;
        match process_file(entry.path()) {
            Ok(true) => stats.modified += 1,
            Ok(false) => {}
            Err(err) => tracing::warn!("unicode pass skipped {}: {err}", entry.path().display()),
        }
    }

    stats
}
