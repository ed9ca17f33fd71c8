use tracing::trace;

use crate::snapshot::{Interstitial, ManifestSnapshot, SegmentInfo};

/// Where an ad window was detected from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdMarkerSource {
    SegmentTitle,
    Interstitial,
}

/// A detected ad span on the stream timeline. Recomputed from the latest
/// snapshot on every timeline change; never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdWindow {
    pub start_time_us: i64,
    /// `None` means the window end is not yet known (open interstitial).
    pub end_time_us: Option<i64>,
    pub source: AdMarkerSource,
}

impl AdWindow {
    /// `[start, end)` containment; an open window contains everything at or
    /// after its start.
    pub fn contains(&self, time_us: i64) -> bool {
        time_us >= self.start_time_us && self.end_time_us.map_or(true, |end| time_us < end)
    }
}

/// Declarative ad-marker rules: the vendor list is data, not code.
#[derive(Clone, Debug)]
pub struct AdRules {
    /// Segment-title substrings that mark a segment as ad content.
    pub title_markers: Vec<String>,
    /// Interstitial id prefixes used by server-side ad stitching.
    pub interstitial_prefixes: Vec<String>,
    /// `CLASS` attribute values that mark an interstitial as an ad.
    pub interstitial_classes: Vec<String>,
}

impl Default for AdRules {
    fn default() -> Self {
        Self {
            title_markers: vec!["Amazon".to_owned(), "Adform".to_owned(), "DCM".to_owned()],
            interstitial_prefixes: vec!["stitched-ad".to_owned()],
            interstitial_classes: vec!["twitch-stitched-ad".to_owned()],
        }
    }
}

impl AdRules {
    pub fn segment_is_ad(&self, segment: &SegmentInfo) -> bool {
        let Some(title) = segment.title.as_deref() else {
            return false;
        };
        self.title_markers.iter().any(|m| title.contains(m.as_str()))
    }

    /// The ad window declared by this interstitial, if its markers match.
    pub fn interstitial_window(&self, interstitial: &Interstitial) -> Option<AdWindow> {
        let id_match = self
            .interstitial_prefixes
            .iter()
            .any(|p| interstitial.id.starts_with(p.as_str()));
        let class_match = interstitial
            .attribute("CLASS")
            .is_some_and(|class| self.interstitial_classes.iter().any(|c| c == class));
        if !id_match && !class_match {
            return None;
        }

        let end_time_us = interstitial
            .end_time_us
            .or_else(|| interstitial.duration_us.map(|d| interstitial.start_time_us + d))
            .or_else(|| {
                interstitial
                    .planned_duration_us
                    .map(|d| interstitial.start_time_us + d)
            });

        Some(AdWindow {
            start_time_us: interstitial.start_time_us,
            end_time_us,
            source: AdMarkerSource::Interstitial,
        })
    }

    /// Whether the snapshot's newest segment falls inside an ad window, and
    /// which one. Level-triggered: called once per manifest refresh.
    pub fn detect(&self, snapshot: &ManifestSnapshot) -> Option<AdWindow> {
        let segment = snapshot.newest_segment()?;

        if self.segment_is_ad(segment) {
            trace!(title = ?segment.title, "newest segment carries an ad title marker");
            return Some(AdWindow {
                start_time_us: segment.start_time_us,
                end_time_us: Some(segment.start_time_us + segment.duration_us),
                source: AdMarkerSource::SegmentTitle,
            });
        }

        snapshot.interstitials.iter().find_map(|i| {
            let window = self.interstitial_window(i)?;
            window.contains(segment.start_time_us).then_some(window)
        })
    }
}
