//! Structural HTML simplification for legacy rendering
//!
//! Transforms a parsed DOM into markup a 1990s browser can digest. The
//! whole job is done in one linear filtered traversal that serializes as
//! it walks, so cost stays proportional to document size:
//!
//! 1. `class` attributes go away unconditionally (page-weight rule,
//!    independent of policy)
//! 2. elements named in `strip_tags` vanish with their entire subtree
//! 3. elements named in `unwrap_tags` vanish but their children are
//!    spliced into place, order preserved
//! 4. surviving elements lose any attribute named in `strip_attributes`
//! 5. `https://`-prefixed `href`/`src` values on anchor, base, and image
//!    elements are rewritten to `http://` (leading prefix only;
//!    protocol-relative URLs and other schemes pass through untouched)
//!
//! Serialization escapes text and attribute values for HTML **except**
//! `href` and `src`, which are emitted verbatim: re-escaping a URL's
//! query-string delimiters would corrupt it for the legacy client. Void
//! elements are written in unclosed legacy form (`<br>`, `<hr>`, `<img>`),
//! never with XHTML self-closing slashes.
//!
//! Unparseable markup never raises past this module; on parse failure the
//! caller gets its input back unchanged.

use markup5ever_rcdom::{Handle, NodeData};

use crate::parser::parse_html_str;
use crate::policy::SimplificationPolicy;

/// Void elements serialized in unclosed legacy form
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose text children are emitted without escaping
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

/// Attribute values emitted verbatim instead of HTML-escaped
const URL_ATTRIBUTES: &[&str] = &["href", "src"];

/// HTTPS prefix rewritten for legacy clients without TLS
const HTTPS_PREFIX: &str = "https://";
const HTTP_PREFIX: &str = "http://";

/// Callback that maps an image URL to a local replacement reference
///
/// Returning `None` leaves the original URL (scheme-rewritten) in place.
pub type ImageLocalizer<'a> = &'a dyn Fn(&str) -> Option<String>;

/// One-pass DOM filter and serializer
pub struct HtmlSimplifier<'a> {
    policy: &'a SimplificationPolicy,
    image_localizer: Option<ImageLocalizer<'a>>,
}

impl<'a> HtmlSimplifier<'a> {
    pub fn new(policy: &'a SimplificationPolicy) -> Self {
        Self {
            policy,
            image_localizer: None,
        }
    }

    /// Attach a localizer consulted for every `img src` before the scheme
    /// rewrite; used by the pipeline to substitute cached image references
    pub fn with_image_localizer(mut self, localizer: ImageLocalizer<'a>) -> Self {
        self.image_localizer = Some(localizer);
        self
    }

    /// Simplify parsed UTF-8 markup, returning serialized markup
    ///
    /// On parse failure (in practice: empty input) the input is returned
    /// unchanged, already normalized by the earlier pipeline stage.
    pub fn simplify_str(&self, html: &str) -> String {
        match parse_html_str(html) {
            Ok(dom) => {
                let mut output = String::with_capacity(html.len());
                self.emit_node(&dom.document, false, &mut output);
                output
            }
            Err(err) => {
                log::debug!("markup not simplifiable, passing through: {}", err);
                html.to_string()
            }
        }
    }

    /// Byte-level entry point per the component contract
    pub fn simplify(&self, markup: &[u8]) -> Vec<u8> {
        let text = String::from_utf8_lossy(markup);
        self.simplify_str(&text).into_bytes()
    }

    fn emit_node(&self, node: &Handle, in_raw_text: bool, output: &mut String) {
        match node.data {
            NodeData::Document => {
                for child in node.children.borrow().iter() {
                    self.emit_node(child, false, output);
                }
            }
            NodeData::Doctype { ref name, .. } => {
                output.push_str("<!DOCTYPE ");
                output.push_str(name);
                output.push('>');
            }
            NodeData::Text { ref contents } => {
                let text = contents.borrow();
                if in_raw_text {
                    output.push_str(&text);
                } else {
                    escape_text(&text, output);
                }
            }
            NodeData::Comment { ref contents } => {
                output.push_str("<!--");
                output.push_str(contents);
                output.push_str("-->");
            }
            NodeData::Element { ref name, .. } => {
                let tag = name.local.as_ref();

                if self.policy.should_strip(tag) {
                    // Element and entire subtree removed
                    return;
                }
                if self.policy.should_unwrap(tag) {
                    // Element removed, children spliced in place
                    for child in node.children.borrow().iter() {
                        self.emit_node(child, in_raw_text, output);
                    }
                    return;
                }

                self.emit_element(node, tag, output);
            }
            NodeData::ProcessingInstruction { .. } => {}
        }
    }

    fn emit_element(&self, node: &Handle, tag: &str, output: &mut String) {
        output.push('<');
        output.push_str(tag);

        if let NodeData::Element { ref attrs, .. } = node.data {
            for attr in attrs.borrow().iter() {
                let attr_name = attr.name.local.as_ref();

                // Fixed performance rule, independent of policy
                if attr_name == "class" {
                    continue;
                }
                if self.policy.should_strip_attribute(attr_name) {
                    continue;
                }

                output.push(' ');
                output.push_str(attr_name);
                output.push_str("=\"");
                self.emit_attr_value(tag, attr_name, &attr.value, output);
                output.push('"');
            }
        }
        output.push('>');

        if VOID_ELEMENTS.contains(&tag) {
            // Unclosed legacy form; void elements have no children
            return;
        }

        let raw = RAW_TEXT_ELEMENTS.contains(&tag);
        for child in node.children.borrow().iter() {
            self.emit_node(child, raw, output);
        }

        output.push_str("</");
        output.push_str(tag);
        output.push('>');
    }

    fn emit_attr_value(&self, tag: &str, attr_name: &str, value: &str, output: &mut String) {
        if is_rewritable_url(tag, attr_name) {
            if tag == "img"
                && attr_name == "src"
                && let Some(localizer) = self.image_localizer
                && let Some(local) = localizer(value)
            {
                output.push_str(&local);
                return;
            }
            output.push_str(&rewrite_scheme(value));
        } else if URL_ATTRIBUTES.contains(&attr_name) {
            // Still a URL: verbatim, just not scheme-rewritten
            output.push_str(value);
        } else {
            escape_attr(value, output);
        }
    }
}

/// Whether this (tag, attribute) pair gets the https -> http rewrite
fn is_rewritable_url(tag: &str, attr_name: &str) -> bool {
    match tag {
        "a" | "base" => attr_name == "href",
        "img" => attr_name == "src",
        _ => false,
    }
}

/// Rewrite a leading `https://` prefix to `http://`
///
/// Literal prefix replace only: protocol-relative URLs, embedded
/// occurrences, and other schemes are left untouched.
pub fn rewrite_scheme(url: &str) -> String {
    match url.strip_prefix(HTTPS_PREFIX) {
        Some(rest) => format!("{}{}", HTTP_PREFIX, rest),
        None => url.to_string(),
    }
}

fn escape_text(text: &str, output: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            _ => output.push(ch),
        }
    }
}

fn escape_attr(value: &str, output: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            _ => output.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn simplify_default(html: &str) -> String {
        let policy = SimplificationPolicy::default();
        HtmlSimplifier::new(&policy).simplify_str(html)
    }

    #[test]
    fn test_class_attribute_always_removed() {
        let out = simplify_default(r#"<p class="x">Hello</p>"#);
        assert!(out.contains("<p>Hello</p>"), "got: {out}");
    }

    #[test]
    fn test_class_removed_even_when_not_in_strip_attributes() {
        let policy = SimplificationPolicy {
            strip_attributes: Default::default(),
            ..Default::default()
        };
        let out = HtmlSimplifier::new(&policy).simplify_str(r#"<p class="x" id="k">Hi</p>"#);
        assert!(out.contains(r#"<p id="k">Hi</p>"#), "got: {out}");
    }

    #[test]
    fn test_strip_tags_remove_subtree() {
        let out = simplify_default("<div><script>var x = 1;</script><p>keep</p></div>");
        assert!(!out.contains("script"), "got: {out}");
        assert!(!out.contains("var x"), "got: {out}");
        assert!(out.contains("<p>keep</p>"), "got: {out}");
    }

    #[test]
    fn test_strip_tags_remove_nested_descendants() {
        let out = simplify_default("<picture><source srcset=\"a\"><span>gone</span></picture>ok");
        assert!(!out.contains("picture"), "got: {out}");
        assert!(!out.contains("gone"), "got: {out}");
        assert!(out.contains("ok"), "got: {out}");
    }

    #[test]
    fn test_unwrap_keeps_children_in_order() {
        let out = simplify_default("<noscript><b>one</b><i>two</i></noscript>");
        assert!(!out.contains("noscript"), "got: {out}");
        let one = out.find("<b>one</b>").expect("first child kept");
        let two = out.find("<i>two</i>").expect("second child kept");
        assert!(one < two, "child order preserved: {out}");
    }

    #[test]
    fn test_strip_attributes_removed_from_survivors() {
        let out = simplify_default(r#"<p style="color:red" onclick="x()" id="k">Hi</p>"#);
        assert!(!out.contains("style"), "got: {out}");
        assert!(!out.contains("onclick"), "got: {out}");
        assert!(out.contains(r#"id="k""#), "got: {out}");
    }

    #[test]
    fn test_anchor_https_rewritten() {
        let out = simplify_default(r#"<a href="https://example.com/page">Link</a>"#);
        assert!(
            out.contains(r#"<a href="http://example.com/page">Link</a>"#),
            "got: {out}"
        );
    }

    #[test]
    fn test_base_href_rewritten() {
        let out = simplify_default(r#"<head><base href="https://example.com/"></head>"#);
        assert!(out.contains(r#"<base href="http://example.com/">"#), "got: {out}");
    }

    #[test]
    fn test_img_src_rewritten() {
        let out = simplify_default(r#"<img src="https://x.com/a.png">"#);
        assert!(out.contains(r#"<img src="http://x.com/a.png">"#), "got: {out}");
    }

    #[test]
    fn test_protocol_relative_url_untouched() {
        let out = simplify_default(r#"<a href="//example.com/p">x</a>"#);
        assert!(out.contains(r#"href="//example.com/p""#), "got: {out}");
    }

    #[test]
    fn test_embedded_https_not_rewritten() {
        // Only the leading prefix is rewritten
        let out = simplify_default(r#"<a href="http://r.test/?to=https://x.com">x</a>"#);
        assert!(out.contains("to=https://x.com"), "got: {out}");
    }

    #[test]
    fn test_non_anchor_href_not_rewritten() {
        let policy = SimplificationPolicy {
            strip_tags: Default::default(),
            ..Default::default()
        };
        let out =
            HtmlSimplifier::new(&policy).simplify_str(r#"<link rel="x" href="https://c.css">"#);
        assert!(out.contains(r#"href="https://c.css""#), "got: {out}");
    }

    #[test]
    fn test_url_attributes_never_escaped() {
        let out = simplify_default(r#"<a href="http://e.com/?a=1&b=2">x</a>"#);
        assert!(out.contains(r#"href="http://e.com/?a=1&b=2""#), "got: {out}");
    }

    #[test]
    fn test_non_url_attributes_escaped() {
        let out = simplify_default(r#"<p title="a&b">x</p>"#);
        assert!(out.contains(r#"title="a&amp;b""#), "got: {out}");
    }

    #[test]
    fn test_text_escaped() {
        let out = simplify_default("<p>a &amp; b</p>");
        assert!(out.contains("<p>a &amp; b</p>"), "got: {out}");
    }

    #[test]
    fn test_br_hr_unclosed() {
        let out = simplify_default("<p>a<br>b</p><hr>");
        assert!(out.contains("<br>"), "got: {out}");
        assert!(out.contains("<hr>"), "got: {out}");
        assert!(!out.contains("<br/>") && !out.contains("<br />"), "got: {out}");
        assert!(!out.contains("<hr/>") && !out.contains("<hr />"), "got: {out}");
    }

    #[test]
    fn test_self_closing_input_normalized_to_legacy_form() {
        let out = simplify_default("<p>a<br/>b<hr /></p>");
        assert!(out.contains("<br>"), "got: {out}");
        assert!(!out.contains("/>"), "got: {out}");
    }

    #[test]
    fn test_comment_preserved() {
        let out = simplify_default("<p>x</p><!-- note -->");
        assert!(out.contains("<!-- note -->"), "got: {out}");
    }

    #[test]
    fn test_doctype_preserved() {
        let out = simplify_default("<!DOCTYPE html><html><body>x</body></html>");
        assert!(out.starts_with("<!DOCTYPE html>"), "got: {out}");
    }

    #[test]
    fn test_empty_input_passthrough() {
        assert_eq!(simplify_default(""), "");
    }

    #[test]
    fn test_image_localizer_replaces_src() {
        let policy = SimplificationPolicy::default();
        let localizer = |url: &str| {
            (url == "https://x.com/a.png").then(|| "/cached_image/abc.gif".to_string())
        };
        let out = HtmlSimplifier::new(&policy)
            .with_image_localizer(&localizer)
            .simplify_str(r#"<img src="https://x.com/a.png"><img src="https://y.com/b.png">"#);
        assert!(out.contains(r#"<img src="/cached_image/abc.gif">"#), "got: {out}");
        // Unlocalized image falls back to the scheme rewrite
        assert!(out.contains(r#"<img src="http://y.com/b.png">"#), "got: {out}");
    }

    #[test]
    fn test_unwrap_inside_strip_still_removed() {
        // strip wins over unwrap for descendants: the subtree is gone
        let out = simplify_default("<script><noscript>x</noscript></script>done");
        assert!(out.contains("done"), "got: {out}");
        assert!(!out.contains("noscript"), "got: {out}");
    }

    #[test]
    fn test_noscript_unwrap_keeps_img() {
        let out = simplify_default(r#"<noscript><img src="https://x.com/a.png"></noscript>"#);
        assert!(out.contains(r#"<img src="http://x.com/a.png">"#), "got: {out}");
        assert!(!out.contains("noscript"), "got: {out}");
    }

    proptest! {
        // Simplification must never panic on arbitrary markup and stripped
        // tag names must never survive
        #[test]
        fn prop_no_crash_and_stripped_absent(
            tag in prop::sample::select(vec!["div", "p", "span", "table", "li"]),
            content in "[a-zA-Z0-9 ]{0,64}",
            close in prop::bool::ANY,
        ) {
            let mut html = format!("<{tag}><script>bad()</script>{content}");
            if close {
                html.push_str(&format!("</{tag}>"));
            }
            let out = simplify_default(&html);
            prop_assert!(!out.contains("<script"));
            prop_assert!(!out.contains("bad()"));
        }

        #[test]
        fn prop_output_contains_no_self_closed_voids(
            content in "[a-zA-Z0-9 ]{0,32}",
        ) {
            let html = format!("<p>{content}<br/><hr/></p>");
            let out = simplify_default(&html);
            prop_assert!(!out.contains("/>"));
        }
    }
}
