//! Retroweb Transcoder - content transcoding for vintage browsers
//!
//! This library is the transcoding core of a compatibility proxy that lets
//! HTML4/1-bit-color-era clients render modern web pages. It rewrites
//! fetched pages and images into a form those clients can safely display;
//! request routing, TLS termination, and transcode policy live in the
//! surrounding proxy.
//!
//! # Architecture
//!
//! Three stages, leaves first:
//! - `chartable`: table-driven character/entity normalization to ASCII
//! - `simplify` (with `parser`, `charset`, `policy`): structural HTML
//!   simplification and URL-aware serialization
//! - `imaging` + `cache` + `resolver`: image transcoding behind a
//!   content-addressed, restart-surviving cache
//!
//! `pipeline` ties the text stages together per request; the image
//! subsystem is invoked by the pipeline for inline images or directly by
//! the proxy when a client requests an image URL.
//!
//! # Degradation policy
//!
//! No failure in this crate is fatal to the hosting process: unparseable
//! markup passes through normalized, undecodable images pass through
//! verbatim, and fetch or storage problems surface as explicit errors the
//! caller maps to degraded content.

// Module declarations
pub mod cache;
pub mod charset;
pub mod chartable;
pub mod error;
pub mod imaging;
pub mod parser;
pub mod pipeline;
pub mod policy;
pub mod resolver;
pub mod simplify;

// Re-export main types for convenience
pub use cache::ImageCache;
pub use chartable::{ConversionRule, ConversionTable, normalize};
pub use error::TranscodeError;
pub use imaging::{Dithering, ImageTranscodeConfig, TargetFormat};
pub use parser::parse_html;
pub use pipeline::Pipeline;
pub use policy::{SimplificationPolicy, TranscodeOptions};
pub use resolver::{Fetch, HttpFetcher, ImageOutcome, ImageResolver};
pub use simplify::HtmlSimplifier;
