//! Simplification policy and top-level transcode options
//!
//! The hosting proxy decides *which* responses get transcoded (per-domain
//! whitelisting and the like); this crate only consumes the resulting
//! policy. Defaults target MacWeb 2.0-class browsers.

use std::collections::HashSet;

/// Structural simplification policy for one request
#[derive(Debug, Clone)]
pub struct SimplificationPolicy {
    /// Tags whose element node is removed but whose children are spliced
    /// into its former position, in order
    pub unwrap_tags: HashSet<String>,
    /// Tags removed together with their entire subtree
    pub strip_tags: HashSet<String>,
    /// Attributes removed from every surviving element
    pub strip_attributes: HashSet<String>,
    /// Raw/whitelist mode: skip every structural pass, leaving only
    /// character normalization and scheme rewriting
    pub disable_structural_simplification: bool,
}

impl SimplificationPolicy {
    pub fn should_strip(&self, tag: &str) -> bool {
        self.strip_tags.contains(tag)
    }

    pub fn should_unwrap(&self, tag: &str) -> bool {
        self.unwrap_tags.contains(tag)
    }

    pub fn should_strip_attribute(&self, attr: &str) -> bool {
        self.strip_attributes.contains(attr)
    }
}

impl Default for SimplificationPolicy {
    fn default() -> Self {
        let to_set = |names: &[&str]| names.iter().map(|s| s.to_string()).collect();
        Self {
            unwrap_tags: to_set(&["noscript"]),
            strip_tags: to_set(&["script", "link", "style", "source", "picture"]),
            strip_attributes: to_set(&[
                "style", "onclick", "class", "bgcolor", "text", "link", "vlink",
            ]),
            disable_structural_simplification: false,
        }
    }
}

/// Options for one HTML transcode invocation
#[derive(Debug, Clone, Default)]
pub struct TranscodeOptions {
    pub policy: SimplificationPolicy,
    /// Skip the character conversion table entirely
    pub disable_char_conversion: bool,
}
