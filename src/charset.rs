//! Character encoding detection and best-effort decoding
//!
//! Legacy-era pages arrive with any or no declared charset, so decoding
//! follows a three-level cascade:
//!
//! 1. **Content-Type header**: charset parameter, when the caller has one
//! 2. **HTML meta tags**: `<meta charset>` or `<meta http-equiv="Content-Type">`
//! 3. **Default to UTF-8**: if both fail
//!
//! Decoding never fails: invalid byte sequences for the detected charset
//! are replaced with U+FFFD rather than rejected, since the audience is a
//! best-effort compatibility proxy and a garbled glyph beats an error page.
//!
//! # Examples
//!
//! ```rust
//! use retroweb_transcoder::charset::detect_charset;
//!
//! // Detect from Content-Type header
//! let charset = detect_charset(Some("text/html; charset=ISO-8859-1"), b"<html>...</html>");
//! assert_eq!(charset, "ISO-8859-1");
//!
//! // Detect from HTML meta tag
//! let html = b"<html><head><meta charset=\"UTF-8\"></head></html>";
//! assert_eq!(detect_charset(None, html), "UTF-8");
//!
//! // Default to UTF-8
//! assert_eq!(detect_charset(None, b"<html><body>No charset</body></html>"), "UTF-8");
//! ```

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

/// Default charset when detection fails
const DEFAULT_CHARSET: &str = "UTF-8";

/// Maximum bytes to scan for meta charset tags (first 1024 bytes)
const META_SCAN_LIMIT: usize = 1024;

/// Detect character encoding using the three-level cascade
///
/// Always returns a charset name, defaulting to "UTF-8" when neither the
/// Content-Type header nor the document prefix declares one. Names are
/// normalized to uppercase.
pub fn detect_charset(content_type: Option<&str>, html: &[u8]) -> String {
    // Level 1: Content-Type header charset parameter
    if let Some(ct) = content_type
        && let Some(charset) = extract_charset_from_content_type(ct)
    {
        return normalize_charset(&charset);
    }

    // Level 2: HTML meta charset tags
    if let Some(charset) = extract_charset_from_html(html) {
        return normalize_charset(&charset);
    }

    // Level 3: default
    DEFAULT_CHARSET.to_string()
}

/// Extract charset from a Content-Type header value
///
/// Handles `charset=VALUE`, `charset="VALUE"`, missing spaces, and extra
/// parameters after the charset.
pub fn extract_charset_from_content_type(content_type: &str) -> Option<String> {
    static CHARSET_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    let regex =
        CHARSET_REGEX.get_or_init(|| Regex::new(r#"(?i)charset\s*=\s*"?([^";,\s]+)"?"#).ok());
    let regex = regex.as_ref()?;

    regex
        .captures(content_type)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract charset from HTML meta tags
///
/// Recognizes the HTML5 `<meta charset="...">` form and the HTML4
/// `<meta http-equiv="Content-Type" content="...charset=...">` form.
/// Only the first 1024 bytes are scanned; meta charset declarations
/// belong early in `<head>`.
pub fn extract_charset_from_html(html: &[u8]) -> Option<String> {
    let scan_limit = std::cmp::min(html.len(), META_SCAN_LIMIT);
    let html_prefix = &html[..scan_limit];

    // Lossy conversion is fine for meta tag detection
    let html_str = String::from_utf8_lossy(html_prefix);

    static HTML5_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    let html5_regex =
        HTML5_REGEX.get_or_init(|| Regex::new(r#"(?i)<meta\s+charset\s*=\s*"?([^";>\s]+)"?"#).ok());
    let html5_regex = html5_regex.as_ref()?;

    if let Some(caps) = html5_regex.captures(&html_str)
        && let Some(m) = caps.get(1)
    {
        return Some(m.as_str().to_string());
    }

    static HTML4_REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    let html4_regex = HTML4_REGEX.get_or_init(|| {
        Regex::new(
            r#"(?i)<meta\s+http-equiv\s*=\s*"?Content-Type"?\s+content\s*=\s*"?[^">]*charset\s*=\s*([^";>\s]+)"?"#,
        )
        .ok()
    });
    let html4_regex = html4_regex.as_ref()?;

    if let Some(caps) = html4_regex.captures(&html_str)
        && let Some(m) = caps.get(1)
    {
        return Some(m.as_str().to_string());
    }

    None
}

/// Normalize charset name to uppercase
pub fn normalize_charset(charset: &str) -> String {
    charset.to_uppercase()
}

/// Decode bytes to UTF-8 text, substituting U+FFFD for invalid sequences
///
/// The charset comes from [`detect_charset`]. Unknown charset labels fall
/// back to lossy UTF-8 decoding rather than failing; the proxy's job is to
/// produce *something* renderable.
pub fn decode_lossy<'a>(bytes: &'a [u8], charset: &str) -> Cow<'a, str> {
    if charset.eq_ignore_ascii_case("UTF-8") {
        return String::from_utf8_lossy(bytes);
    }

    match encoding_rs::Encoding::for_label(charset.as_bytes()) {
        Some(encoding) => {
            let (decoded, _, _) = encoding.decode(bytes);
            decoded
        }
        None => {
            log::debug!("unknown charset label {:?}, decoding as lossy UTF-8", charset);
            String::from_utf8_lossy(bytes)
        }
    }
}
