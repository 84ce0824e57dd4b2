use serde_json::{json, Map, Value};

use crate::options::{Network, SeedStrategy, TokenType};
use crate::workflow::{RenderMode, Workflow};

/// Where the final seed came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedSource {
    LastRender,
    Explicit,
    Random,
    PromptHash,
}

impl SeedSource {
    pub fn as_str(self) -> &'static str {
        match self {
            SeedSource::LastRender => "last-render",
            SeedSource::Explicit => "explicit",
            SeedSource::Random => "random",
            SeedSource::PromptHash => "prompt-hash",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoSpec {
    pub workflow: Workflow,
    pub fps: u32,
    pub duration_sec: f64,
    pub frames: u32,
    pub image: Option<String>,
    pub image_end: Option<String>,
    pub audio: Option<String>,
    pub video: Option<String>,
}

/// Mode-specific part of a request. Each variant only carries the assets
/// its mode can use.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestShape {
    Image,
    ImageEdit { context_images: Vec<String> },
    Video(VideoSpec),
}

/// Fully resolved generation request handed to the client.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRequest {
    pub prompt: String,
    pub model: String,
    pub width: u32,
    pub height: u32,
    pub count: u32,
    pub token_type: TokenType,
    pub network: Network,
    pub seed: u32,
    pub seed_strategy: SeedStrategy,
    pub seed_source: SeedSource,
    pub steps: Option<u32>,
    pub guidance: Option<f64>,
    pub timeout_sec: u64,
    pub shape: RequestShape,
}

impl ResolvedRequest {
    pub fn mode(&self) -> RenderMode {
        match self.shape {
            RequestShape::Image => RenderMode::Image,
            RequestShape::ImageEdit { .. } => RenderMode::ImageEdit,
            RequestShape::Video(_) => RenderMode::Video,
        }
    }

    pub fn workflow(&self) -> Option<Workflow> {
        match &self.shape {
            RequestShape::Video(spec) => Some(spec.workflow),
            _ => None,
        }
    }

    /// `image` or `video`, as written to payloads and the last-render record.
    pub fn media_type(&self) -> &'static str {
        if self.mode().is_video() {
            "video"
        } else {
            "image"
        }
    }

    /// Per-output seeds; consecutive outputs use consecutive seeds.
    pub fn seeds(&self) -> Vec<u32> {
        (0..self.count.max(1))
            .map(|idx| self.seed.wrapping_add(idx))
            .collect()
    }

    /// Request fields echoed back in JSON results.
    pub fn echo_fields(&self) -> Map<String, Value> {
        let mut out = Map::new();
        out.insert("type".to_string(), json!(self.media_type()));
        out.insert("prompt".to_string(), json!(self.prompt));
        out.insert("model".to_string(), json!(self.model));
        out.insert("width".to_string(), json!(self.width));
        out.insert("height".to_string(), json!(self.height));
        out.insert("count".to_string(), json!(self.count));
        out.insert("tokenType".to_string(), json!(self.token_type.as_str()));
        out.insert("network".to_string(), json!(self.network.as_str()));
        out.insert("seed".to_string(), json!(self.seed));
        out.insert("seedStrategy".to_string(), json!(self.seed_strategy.as_str()));
        out.insert("seedSource".to_string(), json!(self.seed_source.as_str()));
        out.insert("seeds".to_string(), json!(self.seeds()));
        if let Some(steps) = self.steps {
            out.insert("steps".to_string(), json!(steps));
        }
        if let Some(guidance) = self.guidance {
            out.insert("guidance".to_string(), json!(guidance));
        }
        match &self.shape {
            RequestShape::Image => {}
            RequestShape::ImageEdit { context_images } => {
                out.insert("contextImages".to_string(), json!(context_images));
            }
            RequestShape::Video(spec) => {
                out.insert("workflow".to_string(), json!(spec.workflow.as_str()));
                out.insert("fps".to_string(), json!(spec.fps));
                out.insert("duration".to_string(), json!(spec.duration_sec));
                out.insert("frames".to_string(), json!(spec.frames));
                for (key, value) in [
                    ("refImage", &spec.image),
                    ("refImageEnd", &spec.image_end),
                    ("refAudio", &spec.audio),
                    ("refVideo", &spec.video),
                ] {
                    if let Some(value) = value {
                        out.insert(key.to_string(), json!(value));
                    }
                }
            }
        }
        out
    }
}
