use url::Url;

/// One rendition entry from a multivariant manifest, as handed over by the
/// transport layer. Parsing of the playlist text itself happens upstream;
/// this is already-typed data.
#[derive(Clone, Debug)]
pub struct RawVariant {
    /// Human label from the manifest (`NAME="..."` attribute), if present.
    pub name: Option<String>,
    /// Playable media playlist URL for this rendition.
    pub url: Url,
    /// Raw codecs attribute, e.g. `"avc1.4D401F,mp4a.40.2"`.
    pub codecs: Option<String>,
    /// Vertical resolution in pixels, when the manifest declares one.
    pub height: Option<u32>,
    /// Declared frame rate, when the manifest declares one.
    pub frame_rate: Option<f64>,
}

impl RawVariant {
    /// Label used as the catalog key: the manifest `NAME` when present, else
    /// a join of resolution and frame rate (`"720p"` / `"720p60"`), else the
    /// video codec family, else `"unknown"`.
    pub fn label(&self) -> String {
        if let Some(name) = &self.name {
            if !name.is_empty() {
                return name.clone();
            }
        }
        if let Some(height) = self.height {
            let fps = self.frame_rate.map(|f| f.round() as u32).unwrap_or(0);
            if fps > 30 {
                return format!("{height}p{fps}");
            }
            return format!("{height}p");
        }
        self.video_codec_family()
            .map(str::to_owned)
            .unwrap_or_else(|| "unknown".to_owned())
    }

    /// First codec entry that is not an audio codec, truncated to its family
    /// prefix (`"avc1.4D401F"` -> `"avc1"`).
    pub fn video_codec_family(&self) -> Option<&str> {
        let codecs = self.codecs.as_deref()?;
        codecs
            .split(',')
            .map(str::trim)
            .map(|c| c.split('.').next().unwrap_or(c))
            .find(|family| !family.eq_ignore_ascii_case("mp4a"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(name: Option<&str>, height: Option<u32>, fps: Option<f64>) -> RawVariant {
        RawVariant {
            name: name.map(str::to_owned),
            url: Url::parse("https://cdn.example/v.m3u8").unwrap(),
            codecs: Some("avc1.4D401F,mp4a.40.2".to_owned()),
            height,
            frame_rate: fps,
        }
    }

    #[test]
    fn label_prefers_manifest_name() {
        assert_eq!(variant(Some("720p60"), Some(1080), Some(60.0)).label(), "720p60");
    }

    #[test]
    fn label_falls_back_to_resolution_join() {
        assert_eq!(variant(None, Some(720), Some(59.94)).label(), "720p60");
        assert_eq!(variant(None, Some(480), Some(30.0)).label(), "480p");
        assert_eq!(variant(None, Some(480), None).label(), "480p");
    }

    #[test]
    fn label_falls_back_to_codec_family() {
        assert_eq!(variant(None, None, None).label(), "avc1");
    }
}
