//! HTML5 parser using html5ever
//!
//! Parsing follows the WHATWG HTML5 algorithm, so malformed markup is
//! handled the same way modern browsers handle it: unclosed tags are
//! closed, misnesting is repaired, and parsing never panics. Input bytes
//! are decoded to UTF-8 first via the charset cascade, with U+FFFD
//! substituted for invalid sequences; a page with broken encoding still
//! produces a tree.
//!
//! # Examples
//!
//! ```rust
//! use retroweb_transcoder::parser::parse_html;
//!
//! let dom = parse_html(b"<html><body><h1>Hello</h1></body></html>").unwrap();
//!
//! // Missing closing tags are repaired, not rejected
//! let dom = parse_html(b"<html><body><h1>Hello").unwrap();
//! # let _ = dom;
//! ```

use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{ParseOpts, parse_document};
use markup5ever_rcdom::RcDom;

use crate::charset::{decode_lossy, detect_charset};
use crate::error::TranscodeError;

/// The served clients have no scripting, so parse like a scripting-disabled
/// browser: `<noscript>` content becomes real elements rather than raw text,
/// which the unwrap pass then splices correctly.
fn parse_opts() -> ParseOpts {
    ParseOpts {
        tree_builder: TreeBuilderOpts {
            scripting_enabled: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Parse HTML bytes into a DOM tree with charset detection
///
/// The charset cascade (Content-Type header, then meta tags, then UTF-8)
/// picks the decoder; decoding is lossy, so the only error case is empty
/// input. html5ever itself accepts arbitrary UTF-8.
pub fn parse_html_with_charset(
    html: &[u8],
    content_type: Option<&str>,
) -> Result<RcDom, TranscodeError> {
    if html.is_empty() {
        return Err(TranscodeError::InvalidInput(
            "HTML input is empty".to_string(),
        ));
    }

    let detected_charset = detect_charset(content_type, html);
    let utf8_str = decode_lossy(html, &detected_charset);

    // Parse directly from the UTF-8 string sink; no Read/Cursor overhead.
    let dom = parse_document(RcDom::default(), parse_opts()).one(utf8_str.as_ref());

    Ok(dom)
}

/// Parse an already-decoded UTF-8 string into a DOM tree
///
/// Used by the pipeline after character normalization, which operates on
/// text and would otherwise force a pointless re-decode.
pub fn parse_html_str(html: &str) -> Result<RcDom, TranscodeError> {
    if html.is_empty() {
        return Err(TranscodeError::InvalidInput(
            "HTML input is empty".to_string(),
        ));
    }

    let dom = parse_document(RcDom::default(), parse_opts()).one(html);
    Ok(dom)
}

/// Parse HTML bytes into a DOM tree
///
/// Convenience wrapper over [`parse_html_with_charset`] with no
/// Content-Type header; charset comes from meta tags or defaults to UTF-8.
pub fn parse_html(html: &[u8]) -> Result<RcDom, TranscodeError> {
    parse_html_with_charset(html, None)
}
