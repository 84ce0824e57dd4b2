/// Reference assets a video workflow can require or forbid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Image,
    ImageEnd,
    Audio,
    Video,
}

impl AssetKind {
    pub const ALL: [AssetKind; 4] = [
        AssetKind::Image,
        AssetKind::ImageEnd,
        AssetKind::Audio,
        AssetKind::Video,
    ];

    pub fn flag(self) -> &'static str {
        match self {
            AssetKind::Image => "--ref",
            AssetKind::ImageEnd => "--ref-end",
            AssetKind::Audio => "--ref-audio",
            AssetKind::Video => "--ref-video",
        }
    }
}

/// Paths or URLs of the reference material supplied with a request.
///
/// Nothing here is fetched; the strings are handed to the client as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetSet {
    pub image: Option<String>,
    pub image_end: Option<String>,
    pub audio: Option<String>,
    pub video: Option<String>,
    pub context_images: Vec<String>,
}

impl AssetSet {
    pub fn get(&self, kind: AssetKind) -> Option<&str> {
        match kind {
            AssetKind::Image => self.image.as_deref(),
            AssetKind::ImageEnd => self.image_end.as_deref(),
            AssetKind::Audio => self.audio.as_deref(),
            AssetKind::Video => self.video.as_deref(),
        }
    }

    pub fn has(&self, kind: AssetKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn has_context_images(&self) -> bool {
        !self.context_images.is_empty()
    }

    pub fn video_reference_flags(&self) -> Vec<&'static str> {
        AssetKind::ALL
            .iter()
            .filter(|kind| self.has(**kind))
            .map(|kind| kind.flag())
            .collect()
    }
}
