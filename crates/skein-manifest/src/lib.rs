#![forbid(unsafe_code)]

//! Manifest data model for the playback-orchestration core.
//!
//! This crate owns the typed view of an adaptive manifest: the raw variant
//! descriptors handed over by the transport layer, the synthesized
//! [`QualityCatalog`] shown to users, the per-refresh [`ManifestSnapshot`]
//! with segment/interstitial metadata, and the declarative ad-marker rules
//! that decide whether the newest segment sits inside an [`AdWindow`].

pub mod ads;
pub mod catalog;
pub mod snapshot;
pub mod variant;

pub use ads::{AdMarkerSource, AdRules, AdWindow};
pub use catalog::{CatalogStrings, QualityCatalog, QualityEntry, QualityKind};
pub use snapshot::{Interstitial, ManifestSnapshot, SegmentInfo};
pub use variant::RawVariant;
