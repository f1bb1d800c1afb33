//! End-to-end HTML transcoding pipeline
//!
//! Inbound response body -> charset decode -> character normalization ->
//! structural simplification -> UTF-8 output bytes. The pipeline is a
//! value type with no cross-request state; the hosting proxy builds one
//! per configuration and runs each request on its own worker.
//!
//! In raw/whitelist mode (structural simplification disabled) the body is
//! never parsed: only character normalization and a whole-text
//! `https://` -> `http://` rewrite apply, reproducing the proxy's
//! whitelisted-domain behavior.

use crate::charset::{decode_lossy, detect_charset};
use crate::chartable::{ConversionTable, normalize};
use crate::policy::TranscodeOptions;
use crate::resolver::{ImageOutcome, ImageResolver, is_image_url};
use crate::simplify::HtmlSimplifier;

/// Configured HTML transcoding pipeline
pub struct Pipeline {
    options: TranscodeOptions,
    table: ConversionTable,
    image_resolver: Option<ImageResolver>,
}

impl Pipeline {
    /// Build a pipeline with the built-in conversion table
    pub fn new(options: TranscodeOptions) -> Self {
        Self {
            options,
            table: ConversionTable::builtin().clone(),
            image_resolver: None,
        }
    }

    /// Override the conversion table (already validated by construction)
    pub fn with_table(mut self, table: ConversionTable) -> Self {
        self.table = table;
        self
    }

    /// Localize recognized image URLs through a resolver while
    /// simplifying, substituting `/cached_image/...` references
    pub fn with_image_resolver(mut self, resolver: ImageResolver) -> Self {
        self.image_resolver = Some(resolver);
        self
    }

    /// Transcode an HTML response body for a legacy client
    ///
    /// Never fails: every degraded path falls back toward the original
    /// content. Output is always valid UTF-8.
    pub fn transcode_html(&self, body: &[u8], content_type: Option<&str>) -> Vec<u8> {
        let charset = detect_charset(content_type, body);
        let decoded = decode_lossy(body, &charset);

        let text = if self.options.disable_char_conversion {
            decoded.into_owned()
        } else {
            normalize(&decoded, &self.table)
        };

        if self.options.policy.disable_structural_simplification {
            // Raw mode: no DOM, so the scheme rewrite is text-wide
            return text.replace("https://", "http://").into_bytes();
        }

        let localizer = self.image_resolver.as_ref().map(|resolver| {
            move |url: &str| -> Option<String> {
                if !is_image_url(url) {
                    return None;
                }
                match resolver.resolve(url, None) {
                    Ok(ImageOutcome::Cached(reference)) => Some(reference),
                    Ok(ImageOutcome::Passthrough(_)) => None,
                    Err(err) => {
                        log::warn!("image localization failed for {}: {}", url, err);
                        None
                    }
                }
            }
        });

        let mut simplifier = HtmlSimplifier::new(&self.options.policy);
        if let Some(ref localizer) = localizer {
            simplifier = simplifier.with_image_localizer(localizer);
        }
        simplifier.simplify_str(&text).into_bytes()
    }
}
