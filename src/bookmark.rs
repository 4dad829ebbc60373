//! Bookmark events back to the host.

use tracing::debug;

use crate::error::SiteError;
use crate::site::{BookmarkEvent, EngineSite, EVENT_INTEREST_BOOKMARK};

/// Raise one bookmark event if the host asked for bookmarks. A no-op otherwise.
pub fn maybe_emit(
    site: &impl EngineSite,
    interest: u64,
    bookmark_text: &str,
) -> Result<(), SiteError> {
    if interest & EVENT_INTEREST_BOOKMARK == 0 {
        return Ok(());
    }

    let event = BookmarkEvent {
        marker: parse_marker(bookmark_text),
        text: bookmark_text.to_string(),
    };
    debug!("Bookmark event {} ({:?})", event.marker, event.text);
    site.add_event(event)
}

/// Parse a bookmark marker the way C `atol` does: skip leading C-locale
/// whitespace (ASCII only, vertical tab included),
/// accept an optional sign, then take leading digits. No digits yields 0.
/// Out-of-range values saturate.
pub fn parse_marker(text: &str) -> i64 {
    let s = text.trim_start_matches(|c: char| c.is_ascii_whitespace() || c == '\x0b');
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        let d = i64::from(b - b'0');
        value = if negative {
            value.saturating_mul(10).saturating_sub(d)
        } else {
            value.saturating_mul(10).saturating_add(d)
        };
    }
    value
}
