use genline_contracts::assets::AssetSet;
use genline_contracts::errors::ResolveError;
use genline_contracts::plugin::PluginConfig;
use genline_contracts::priority::first_defined_from;
use genline_contracts::workflow::Workflow;

/// Which rule decided the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowSource {
    Explicit,
    Model,
    Assets,
    PluginConfig,
    Fallback,
}

impl WorkflowSource {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowSource::Explicit => "explicit",
            WorkflowSource::Model => "model",
            WorkflowSource::Assets => "assets",
            WorkflowSource::PluginConfig => "plugin-config",
            WorkflowSource::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowResolution {
    pub workflow: Workflow,
    pub source: WorkflowSource,
}

/// Guesses the workflow from whichever references were supplied.
pub fn infer_from_assets(assets: &AssetSet) -> Option<Workflow> {
    if assets.video.is_some() {
        Some(Workflow::AnimateMove)
    } else if assets.audio.is_some() {
        Some(Workflow::S2v)
    } else if assets.image.is_some() || assets.image_end.is_some() {
        Some(Workflow::I2v)
    } else {
        None
    }
}

/// Picks the video workflow: `--workflow`, then the `--model` id, then the
/// supplied assets, then the plugin default, then t2v.
pub fn resolve_workflow(
    explicit: Option<&str>,
    model: Option<&str>,
    assets: &AssetSet,
    config: Option<&PluginConfig>,
) -> Result<WorkflowResolution, ResolveError> {
    let explicit = match explicit.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => Some(
            Workflow::from_alias(raw).ok_or_else(|| ResolveError::UnknownWorkflow(raw.to_string()))?,
        ),
        None => None,
    };
    let model = model.map(str::trim).filter(|model| !model.is_empty());
    let from_model = model.and_then(Workflow::infer_from_model);

    if let (Some(workflow), Some(inferred), Some(model)) = (explicit, from_model, model) {
        if workflow != inferred {
            return Err(ResolveError::WorkflowModelMismatch {
                workflow,
                model: model.to_string(),
                inferred,
            });
        }
    }

    let (source, workflow) = first_defined_from([
        (WorkflowSource::Explicit, explicit),
        (WorkflowSource::Model, from_model),
        (WorkflowSource::Assets, infer_from_assets(assets)),
        (
            WorkflowSource::PluginConfig,
            config.and_then(|config| config.default_video_workflow),
        ),
    ])
    .unwrap_or((WorkflowSource::Fallback, Workflow::T2v));

    tracing::debug!(workflow = %workflow, source = source.as_str(), "resolved video workflow");
    Ok(WorkflowResolution { workflow, source })
}
