//! Integration tests for the end-to-end HTML transcoding pipeline
//!
//! These exercise the normalization, simplification, and serialization
//! stages together through the public `Pipeline` API, on the kinds of
//! markup the proxy actually sees.

use retroweb_transcoder::policy::{SimplificationPolicy, TranscodeOptions};
use retroweb_transcoder::Pipeline;

fn transcode(html: &str) -> String {
    let pipeline = Pipeline::new(TranscodeOptions::default());
    String::from_utf8(pipeline.transcode_html(html.as_bytes(), None)).expect("output is UTF-8")
}

#[test]
fn test_full_page_simplification() {
    let html = r##"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>body { margin: 0; }</style>
<link rel="stylesheet" href="https://cdn.example/site.css">
</head>
<body bgcolor="#ffffff">
<script src="https://cdn.example/app.js"></script>
<noscript><p>Welcome &mdash; enjoy your stay</p></noscript>
<p class="lead" style="font-size:2em">Prices from &euro;10 &hellip;</p>
<a href="https://example.com/shop?a=1&amp;b=2">Shop</a>
<img class="hero" src="https://example.com/hero.png" alt="A &quot;hero&quot; image">
<hr/>
</body>
</html>"##;

    let out = transcode(html);

    // Stripped subtrees are gone entirely
    assert!(!out.contains("<style"), "got: {out}");
    assert!(!out.contains("<link"), "got: {out}");
    assert!(!out.contains("<script"), "got: {out}");
    assert!(!out.contains("margin: 0"), "got: {out}");

    // noscript unwrapped, children kept in place
    assert!(!out.contains("noscript"), "got: {out}");
    assert!(out.contains("<p>Welcome -- enjoy your stay</p>"), "got: {out}");

    // Attributes: class always removed, policy attributes removed,
    // alt survives with escaping
    assert!(!out.contains("class="), "got: {out}");
    assert!(!out.contains("style="), "got: {out}");
    assert!(!out.contains("bgcolor"), "got: {out}");
    assert!(out.contains(r#"alt="A &quot;hero&quot; image""#), "got: {out}");

    // Entity table applied over text
    assert!(out.contains("Prices from EUR10 ..."), "got: {out}");

    // Scheme rewrites on anchor and image; URL attrs verbatim
    assert!(out.contains(r#"href="http://example.com/shop?a=1&b=2""#), "got: {out}");
    assert!(out.contains(r#"src="http://example.com/hero.png""#), "got: {out}");

    // Legacy void form
    assert!(out.contains("<hr>"), "got: {out}");
    assert!(!out.contains("/>"), "got: {out}");
}

#[test]
fn test_url_attributes_not_double_escaped() {
    let out = transcode(r#"<a href="http://e.com/?q=rust&lang=en" title="Q&A">x</a>"#);
    // Ampersand literal inside href, escaped inside title
    assert!(out.contains(r#"href="http://e.com/?q=rust&lang=en""#), "got: {out}");
    assert!(out.contains(r#"title="Q&amp;A""#), "got: {out}");
}

#[test]
fn test_stripped_elements_and_descendants_absent() {
    let html = r#"<div><picture><source srcset="big.webp"><img src="f.png"></picture><p>text</p></div>"#;
    let out = transcode(html);
    assert!(!out.contains("picture"), "got: {out}");
    assert!(!out.contains("srcset"), "got: {out}");
    // The img inside the stripped picture goes with it
    assert!(!out.contains("f.png"), "got: {out}");
    assert!(out.contains("<p>text</p>"), "got: {out}");
}

#[test]
fn test_unwrapped_children_keep_document_order() {
    let out = transcode("<p>a</p><noscript><p>b</p><p>c</p></noscript><p>d</p>");
    let positions: Vec<_> = ["<p>a</p>", "<p>b</p>", "<p>c</p>", "<p>d</p>"]
        .iter()
        .map(|needle| out.find(needle).unwrap_or_else(|| panic!("missing {needle} in {out}")))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "order broken: {out}");
}

#[test]
fn test_malformed_markup_degrades_gracefully() {
    // Unclosed tags, misnesting, stray brackets: output must still be
    // produced and scripts must still be gone
    let html = "<div><b><i>text</b></i><script>bad()</script><p>tail";
    let out = transcode(html);
    assert!(out.contains("text"), "got: {out}");
    assert!(out.contains("tail"), "got: {out}");
    assert!(!out.contains("bad()"), "got: {out}");
}

#[test]
fn test_custom_policy_round_trip() {
    let mut policy = SimplificationPolicy::default();
    policy.strip_tags.insert("table".to_string());
    policy.unwrap_tags.insert("center".to_string());
    let pipeline = Pipeline::new(TranscodeOptions {
        policy,
        ..Default::default()
    });

    let html = "<center><p>kept</p></center><table><tr><td>gone</td></tr></table>";
    let out = String::from_utf8(pipeline.transcode_html(html.as_bytes(), None)).expect("utf-8");
    assert!(!out.contains("center"), "got: {out}");
    assert!(out.contains("<p>kept</p>"), "got: {out}");
    assert!(!out.contains("table"), "got: {out}");
    assert!(!out.contains("gone"), "got: {out}");
}

#[test]
fn test_content_type_charset_drives_decoding() {
    // windows-1252 euro (0x80) decodes, then normalizes to "EUR"
    let body = b"<p>Price \x80 10</p>";
    let pipeline = Pipeline::new(TranscodeOptions::default());
    let out = pipeline.transcode_html(body, Some("text/html; charset=windows-1252"));
    let out = String::from_utf8(out).expect("utf-8");
    assert!(out.contains("Price EUR 10"), "got: {out}");
}

#[test]
fn test_whitelist_mode_end_to_end() {
    let policy = SimplificationPolicy {
        disable_structural_simplification: true,
        ..Default::default()
    };
    let pipeline = Pipeline::new(TranscodeOptions {
        policy,
        ..Default::default()
    });
    let html = r#"<body onload="t()"><img src="https://a.com/x.png" srcset="y 2x"></body>"#;
    let out = String::from_utf8(pipeline.transcode_html(html.as_bytes(), None)).expect("utf-8");

    // Source structure preserved byte-for-byte apart from the rewrites
    assert!(out.contains(r#"onload="t()""#), "got: {out}");
    assert!(out.contains(r#"srcset="y 2x""#), "got: {out}");
    assert!(out.contains("http://a.com/x.png"), "got: {out}");
    assert!(!out.contains("https://"), "got: {out}");
}
