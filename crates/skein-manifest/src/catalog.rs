use std::cmp::Reverse;

use tracing::debug;
use url::Url;

use crate::variant::RawVariant;

/// Localized display strings for the synthetic catalog entries. The core
/// never hard-codes user-facing text; the embedding app supplies it.
#[derive(Clone, Debug)]
pub struct CatalogStrings {
    pub auto: String,
    pub source: String,
    pub audio_only: String,
    pub chat_only: String,
}

impl Default for CatalogStrings {
    fn default() -> Self {
        Self {
            auto: "Auto".to_owned(),
            source: "Source".to_owned(),
            audio_only: "Audio only".to_owned(),
            chat_only: "Chat only".to_owned(),
        }
    }
}

/// What selecting a given catalog entry means to the mode machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QualityKind {
    /// Clear the track override and let the renderer adapt.
    Auto,
    /// A concrete video rendition.
    Rendition,
    /// Keep audio, drop video.
    AudioOnly,
    /// Stop media entirely; chat keeps running (live only).
    ChatOnly,
}

/// One selectable quality. `url == None` for purely symbolic entries.
#[derive(Clone, Debug)]
pub struct QualityEntry {
    pub label: String,
    pub display_name: String,
    pub url: Option<Url>,
    pub kind: QualityKind,
    /// Retained from the variant for ordering; `None` for synthetic entries.
    pub height: Option<u32>,
    pub frame_rate: Option<f64>,
    is_source: bool,
}

pub const AUTO_LABEL: &str = "auto";
pub const AUDIO_ONLY_LABEL: &str = "audio only";
pub const CHAT_ONLY_LABEL: &str = "chat only";

/// Ordered quality list synthesized from one manifest load.
///
/// Built once per manifest/timeline change and immutable afterwards.
/// Invariants: labels are unique; "audio only" is always present and
/// immediately precedes "chat only" when the latter exists; "auto" (when
/// offered) is always first.
#[derive(Clone, Debug, Default)]
pub struct QualityCatalog {
    entries: Vec<QualityEntry>,
}

impl QualityCatalog {
    /// Synthesize the catalog from raw manifest variants.
    ///
    /// An empty `variants` slice (non-multivariant or already-final stream)
    /// yields an empty catalog; that is not an error, it just means no
    /// quality UI is offered.
    pub fn build(
        variants: &[RawVariant],
        live: bool,
        auto_available: bool,
        strings: &CatalogStrings,
    ) -> Self {
        if variants.is_empty() {
            debug!("no variants in manifest, offering no qualities");
            return Self::default();
        }

        // Codec suffix on the "source" entry is only worth showing when at
        // least one stream reports something other than plain H.264/AAC.
        let codecs_informative = variants.iter().any(|v| {
            v.video_codec_family()
                .is_some_and(|f| !f.eq_ignore_ascii_case("avc1"))
        });

        let mut entries: Vec<QualityEntry> = Vec::with_capacity(variants.len() + 3);
        let mut audio_entry: Option<QualityEntry> = None;

        for variant in variants {
            let label = variant.label();

            if label.to_ascii_lowercase().starts_with("audio") {
                // Remap any "audio_*" rendition onto the synthetic key.
                if audio_entry.is_none() {
                    audio_entry = Some(QualityEntry {
                        label: AUDIO_ONLY_LABEL.to_owned(),
                        display_name: strings.audio_only.clone(),
                        url: Some(variant.url.clone()),
                        kind: QualityKind::AudioOnly,
                        height: None,
                        frame_rate: None,
                        is_source: false,
                    });
                }
                continue;
            }

            if entries.iter().any(|e| e.label == label) {
                debug!(label, "duplicate variant label, keeping first");
                continue;
            }

            let is_source = label.eq_ignore_ascii_case("source");
            let display_name = if is_source {
                match variant.video_codec_family().map(normalize_codec) {
                    Some(tag) if codecs_informative => {
                        format!("{} ({tag})", strings.source)
                    }
                    _ => strings.source.clone(),
                }
            } else {
                label.clone()
            };

            entries.push(QualityEntry {
                label,
                display_name,
                url: Some(variant.url.clone()),
                kind: QualityKind::Rendition,
                height: variant.height,
                frame_rate: variant.frame_rate,
                is_source,
            });
        }

        // "audio only" is always present, synthesized empty if the manifest
        // had no audio rendition, and always sits right before "chat only".
        entries.push(audio_entry.unwrap_or_else(|| QualityEntry {
            label: AUDIO_ONLY_LABEL.to_owned(),
            display_name: strings.audio_only.clone(),
            url: None,
            kind: QualityKind::AudioOnly,
            height: None,
            frame_rate: None,
            is_source: false,
        }));

        if live {
            entries.push(QualityEntry {
                label: CHAT_ONLY_LABEL.to_owned(),
                display_name: strings.chat_only.clone(),
                url: None,
                kind: QualityKind::ChatOnly,
                height: None,
                frame_rate: None,
                is_source: false,
            });
        }

        if auto_available {
            entries.insert(
                0,
                QualityEntry {
                    label: AUTO_LABEL.to_owned(),
                    display_name: strings.auto.clone(),
                    url: None,
                    kind: QualityKind::Auto,
                    height: None,
                    frame_rate: None,
                    is_source: false,
                },
            );
            entries.sort_by_key(|e| {
                (
                    rank(e),
                    Reverse(e.height.unwrap_or(0)),
                    Reverse(e.frame_rate.map(|f| (f * 1000.0).round() as u64).unwrap_or(0)),
                )
            });
        }

        debug!(count = entries.len(), live, auto_available, "quality catalog built");
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[QualityEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&QualityEntry> {
        self.entries.get(index)
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.label == label)
    }

    /// Labels in display/index order, the sequence the UI iterates.
    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.label.clone()).collect()
    }

    /// First entry carrying a real URL, used as the last-resort fallback when
    /// a selected entry turns out not to carry a stream.
    pub fn first_playable_url(&self) -> Option<&Url> {
        self.entries.iter().find_map(|e| e.url.as_ref())
    }
}

/// Sort rank when the catalog is re-ordered for an auto-capable source:
/// auto first, then "source", then renditions by resolution/frame rate, with
/// the symbolic entries trailing.
fn rank(entry: &QualityEntry) -> u8 {
    match entry.kind {
        QualityKind::Auto => 0,
        QualityKind::Rendition if entry.is_source => 1,
        QualityKind::Rendition => 2,
        QualityKind::AudioOnly => 3,
        QualityKind::ChatOnly => 4,
    }
}

/// Normalized codec tag for the "source" display suffix. Unknown families
/// are passed through unchanged.
fn normalize_codec(family: &str) -> String {
    match family.to_ascii_lowercase().as_str() {
        "av01" => "AV1".to_owned(),
        "hev1" | "hvc1" => "H.265".to_owned(),
        "avc1" => "H.264".to_owned(),
        _ => family.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("av01", "AV1")]
    #[case("hev1", "H.265")]
    #[case("hvc1", "H.265")]
    #[case("avc1", "H.264")]
    #[case("vp09", "vp09")]
    fn codec_tags_normalize(#[case] family: &str, #[case] expected: &str) {
        assert_eq!(normalize_codec(family), expected);
    }

    fn raw(name: &str, codecs: &str, height: Option<u32>, fps: Option<f64>) -> RawVariant {
        RawVariant {
            name: Some(name.to_owned()),
            url: Url::parse(&format!("https://cdn.example/{name}.m3u8")).unwrap(),
            codecs: Some(codecs.to_owned()),
            height,
            frame_rate: fps,
        }
    }

    #[test]
    fn empty_manifest_offers_no_qualities() {
        let catalog = QualityCatalog::build(&[], true, true, &CatalogStrings::default());
        assert!(catalog.is_empty());
    }

    #[test]
    fn live_catalog_synthesis_matches_expected_order() {
        let variants = [
            raw("720p60", "avc1.4D401F,mp4a.40.2", Some(720), Some(60.0)),
            raw("audio_english", "mp4a.40.2", None, None),
        ];
        let catalog = QualityCatalog::build(&variants, true, true, &CatalogStrings::default());

        assert_eq!(catalog.labels(), vec!["auto", "720p60", "audio only", "chat only"]);

        let audio = catalog.get(catalog.index_of(AUDIO_ONLY_LABEL).unwrap()).unwrap();
        assert_eq!(
            audio.url.as_ref().unwrap().as_str(),
            "https://cdn.example/audio_english.m3u8"
        );
        let chat = catalog.get(3).unwrap();
        assert!(chat.url.is_none());
    }

    #[test]
    fn audio_only_is_synthesized_when_absent() {
        let variants = [raw("480p", "avc1.4D401F,mp4a.40.2", Some(480), Some(30.0))];
        let catalog = QualityCatalog::build(&variants, false, false, &CatalogStrings::default());

        assert_eq!(catalog.labels(), vec!["480p", "audio only"]);
        assert!(catalog.get(1).unwrap().url.is_none());
        // VOD: no chat-only entry.
        assert!(catalog.index_of(CHAT_ONLY_LABEL).is_none());
    }

    #[test]
    fn source_codec_suffix_shown_only_when_informative() {
        let av1 = [
            raw("Source", "av01.0.08M.08,mp4a.40.2", Some(1080), Some(60.0)),
            raw("720p", "avc1.4D401F,mp4a.40.2", Some(720), Some(30.0)),
        ];
        let catalog = QualityCatalog::build(&av1, false, false, &CatalogStrings::default());
        let source = catalog.get(catalog.index_of("Source").unwrap()).unwrap();
        assert_eq!(source.display_name, "Source (AV1)");

        // All-H.264 manifests carry no suffix; it would be uninformative.
        let h264 = [
            raw("Source", "avc1.64002A,mp4a.40.2", Some(1080), Some(60.0)),
            raw("720p", "avc1.4D401F,mp4a.40.2", Some(720), Some(30.0)),
        ];
        let catalog = QualityCatalog::build(&h264, false, false, &CatalogStrings::default());
        let source = catalog.get(catalog.index_of("Source").unwrap()).unwrap();
        assert_eq!(source.display_name, "Source");
    }

    #[test]
    fn auto_sort_orders_source_then_resolution_then_fps() {
        let variants = [
            raw("480p", "avc1.4D401F,mp4a.40.2", Some(480), Some(30.0)),
            raw("720p60", "avc1.4D401F,mp4a.40.2", Some(720), Some(60.0)),
            raw("Source", "avc1.64002A,mp4a.40.2", Some(1080), Some(60.0)),
            raw("720p30", "avc1.4D401F,mp4a.40.2", Some(720), Some(30.0)),
        ];
        let catalog = QualityCatalog::build(&variants, true, true, &CatalogStrings::default());
        assert_eq!(
            catalog.labels(),
            vec!["auto", "Source", "720p60", "720p30", "480p", "audio only", "chat only"]
        );
    }

    #[test]
    fn duplicate_labels_keep_first() {
        let variants = [
            raw("720p", "avc1.4D401F,mp4a.40.2", Some(720), Some(30.0)),
            raw("720p", "avc1.4D401F,mp4a.40.2", Some(720), Some(30.0)),
        ];
        let catalog = QualityCatalog::build(&variants, false, false, &CatalogStrings::default());
        assert_eq!(catalog.labels(), vec!["720p", "audio only"]);
    }
}
