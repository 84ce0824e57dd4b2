use super::registry::{builtin_video_model, ModelRegistry, DEFAULT_EDIT_MODEL, DEFAULT_IMAGE_MODEL};
use crate::plugin::PluginConfig;
use crate::priority::first_defined_from;
use crate::workflow::{RenderMode, Workflow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSource {
    Explicit,
    PluginConfig,
    BuiltIn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub model: String,
    pub source: ModelSource,
    pub known: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ModelSelector {
    pub registry: ModelRegistry,
}

impl ModelSelector {
    pub fn new(registry: Option<ModelRegistry>) -> Self {
        Self {
            registry: registry.unwrap_or_default(),
        }
    }

    pub fn builtin(mode: RenderMode, workflow: Option<Workflow>) -> &'static str {
        match (mode, workflow) {
            (RenderMode::Video, Some(workflow)) => builtin_video_model(workflow),
            (RenderMode::Video, None) => builtin_video_model(Workflow::T2v),
            (RenderMode::ImageEdit, _) => DEFAULT_EDIT_MODEL,
            (RenderMode::Image, _) => DEFAULT_IMAGE_MODEL,
        }
    }

    /// Picks the model for a request: explicit `--model`, then the plugin's
    /// per-mode model, then the built-in default.
    pub fn select(
        &self,
        requested: Option<&str>,
        config: Option<&PluginConfig>,
        mode: RenderMode,
        workflow: Option<Workflow>,
    ) -> ModelSelection {
        let configured = config.and_then(|config| match (mode, workflow) {
            (RenderMode::Video, Some(workflow)) => config.video_model(workflow),
            (RenderMode::Video, None) => None,
            (RenderMode::ImageEdit, _) => config.default_edit_model.as_deref(),
            (RenderMode::Image, _) => config.default_image_model.as_deref(),
        });
        let requested = requested.map(str::trim).filter(|value| !value.is_empty());

        let (source, model) = first_defined_from([
            (ModelSource::Explicit, requested),
            (ModelSource::PluginConfig, configured),
            (ModelSource::BuiltIn, Some(Self::builtin(mode, workflow))),
        ])
        .unwrap_or((ModelSource::BuiltIn, Self::builtin(mode, workflow)));

        let known = self.registry.get(model).is_some();
        if !known {
            tracing::debug!(model, "model is not in the local registry; passing it through");
        }
        ModelSelection {
            model: model.to_string(),
            source,
            known,
        }
    }
}
