use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::request::{RequestShape, ResolvedRequest};

/// Outcome of the previous successful generation.
///
/// Read by `--last`, `--last-seed` and `--last-image`; rewritten after
/// every successful generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastRenderRecord {
    #[serde(default)]
    pub timestamp: String,
    #[serde(rename = "type", default)]
    pub media_type: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub seed: Option<u32>,
    #[serde(default)]
    pub seed_strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_source: Option<String>,
    #[serde(default)]
    pub seeds: Vec<u32>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub local_path: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frames: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_image_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_audio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_video: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_images: Option<Vec<String>>,
}

impl LastRenderRecord {
    pub fn from_request(
        request: &ResolvedRequest,
        project_id: Option<&str>,
        urls: &[String],
        seeds: &[u32],
        local_path: Option<&str>,
    ) -> Self {
        let mut record = Self {
            timestamp: now_utc_iso(),
            media_type: request.media_type().to_string(),
            prompt: request.prompt.clone(),
            model: request.model.clone(),
            width: request.width,
            height: request.height,
            seed: Some(request.seed),
            seed_strategy: Some(request.seed_strategy.as_str().to_string()),
            seed_source: Some(request.seed_source.as_str().to_string()),
            seeds: seeds.to_vec(),
            project_id: project_id.map(str::to_string),
            urls: urls.to_vec(),
            local_path: local_path.map(str::to_string),
            token_type: Some(request.token_type.as_str().to_string()),
            workflow: None,
            fps: None,
            duration: None,
            frames: None,
            ref_image: None,
            ref_image_end: None,
            ref_audio: None,
            ref_video: None,
            context_images: None,
        };
        match &request.shape {
            RequestShape::Image => {}
            RequestShape::ImageEdit { context_images } => {
                record.context_images = Some(context_images.clone());
            }
            RequestShape::Video(spec) => {
                record.workflow = Some(spec.workflow.as_str().to_string());
                record.fps = Some(spec.fps);
                record.duration = Some(spec.duration_sec);
                record.frames = Some(spec.frames);
                record.ref_image = spec.image.clone();
                record.ref_image_end = spec.image_end.clone();
                record.ref_audio = spec.audio.clone();
                record.ref_video = spec.video.clone();
            }
        }
        record
    }

    /// The file or URL `--last-image` should reuse: the local copy when one
    /// was written, otherwise the first returned URL.
    pub fn reusable_image(&self) -> Option<&str> {
        self.local_path
            .as_deref()
            .filter(|path| !path.trim().is_empty())
            .or_else(|| self.urls.first().map(String::as_str))
    }
}

/// File-backed home of the last-render record.
#[derive(Debug, Clone)]
pub struct LastRenderStore {
    path: PathBuf,
}

impl LastRenderStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join("last-render.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing or unreadable state means "no previous render".
    pub fn load(&self) -> Option<LastRenderRecord> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<LastRenderRecord>(&raw) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::debug!(path = %self.path.display(), error = %err, "ignoring corrupt last-render record");
                None
            }
        }
    }

    pub fn save(&self, record: &LastRenderRecord) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(record)?)?;
        Ok(())
    }

    /// Writes the record, logging instead of failing. Returns whether it
    /// was written.
    pub fn save_best_effort(&self, record: &LastRenderRecord) -> bool {
        match self.save(record) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "could not update last-render record");
                false
            }
        }
    }
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
