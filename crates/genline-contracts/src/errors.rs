use serde::Serialize;

use crate::workflow::Workflow;

/// Everything that can stop a request before (or while) it is generated.
///
/// Each variant has a stable machine code and an actionable hint; the CLI
/// prints both, the JSON mode emits them as `errorCode` / `hint`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    #[error("a prompt is required")]
    MissingPrompt,

    #[error("invalid value for {flag}: {reason}")]
    InvalidArgument { flag: String, reason: String },

    #[error("unknown token type '{0}'")]
    InvalidTokenType(String),

    #[error("unknown seed strategy '{0}'")]
    InvalidSeedStrategy(String),

    #[error("unknown network '{0}'")]
    InvalidNetwork(String),

    #[error("plugin config {path} could not be read: {reason}")]
    InvalidConfig { path: String, reason: String },

    #[error("count must be between 1 and {max}, got {count}")]
    InvalidCount { count: u32, max: u32 },

    #[error("{width}x{height} is not a valid {mode} size: {reason}")]
    InvalidDimensions {
        width: u32,
        height: u32,
        mode: &'static str,
        reason: String,
        suggested: (u32, u32),
    },

    #[error("unknown workflow '{0}'")]
    UnknownWorkflow(String),

    #[error("--workflow {workflow} conflicts with model '{model}', which is a {inferred} model")]
    WorkflowModelMismatch {
        workflow: Workflow,
        model: String,
        inferred: Workflow,
    },

    #[error("{} only apply to video generation", .flags.join(", "))]
    VideoOnlyFlag { flags: Vec<&'static str> },

    #[error("workflow {workflow} requires {requirement}")]
    MissingAsset {
        workflow: Workflow,
        requirement: &'static str,
        missing: Vec<&'static str>,
    },

    #[error("{context} does not accept {}", .flags.join(", "))]
    ForbiddenAsset {
        context: String,
        flags: Vec<&'static str>,
    },

    #[error("model '{model}' accepts at most {max} context images, got {supplied}")]
    TooManyContextImages {
        model: String,
        supplied: usize,
        max: u32,
    },

    #[error("model '{model}' does not accept context images")]
    ContextUnsupported { model: String },

    #[error("no previous render is recorded")]
    NoLastRender,

    #[error("generation failed: {0}")]
    GenerationFailed(String),

    #[error("timed out after {seconds}s waiting for the job to finish")]
    Timeout { seconds: u64 },
}

impl ResolveError {
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::MissingPrompt => "MISSING_PROMPT",
            ResolveError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            ResolveError::InvalidTokenType(_) => "INVALID_TOKEN_TYPE",
            ResolveError::InvalidSeedStrategy(_) => "INVALID_SEED_STRATEGY",
            ResolveError::InvalidNetwork(_) => "INVALID_NETWORK",
            ResolveError::InvalidConfig { .. } => "INVALID_CONFIG",
            ResolveError::InvalidCount { .. } => "INVALID_COUNT",
            ResolveError::InvalidDimensions { .. } => "INVALID_DIMENSIONS",
            ResolveError::UnknownWorkflow(_) => "UNKNOWN_WORKFLOW",
            ResolveError::WorkflowModelMismatch { .. } => "WORKFLOW_MODEL_MISMATCH",
            ResolveError::VideoOnlyFlag { .. } => "VIDEO_ONLY_FLAG",
            ResolveError::MissingAsset { .. } => "MISSING_ASSET",
            ResolveError::ForbiddenAsset { .. } => "FORBIDDEN_ASSET",
            ResolveError::TooManyContextImages { .. } => "TOO_MANY_CONTEXT_IMAGES",
            ResolveError::ContextUnsupported { .. } => "CONTEXT_UNSUPPORTED",
            ResolveError::NoLastRender => "NO_LAST_RENDER",
            ResolveError::GenerationFailed(_) => "GENERATION_FAILED",
            ResolveError::Timeout { .. } => "TIMEOUT",
        }
    }

    pub fn hint(&self) -> String {
        match self {
            ResolveError::MissingPrompt => {
                "Pass the prompt as the last argument, e.g. genline \"a cat wearing a hat\".".to_string()
            }
            ResolveError::InvalidArgument { flag, .. } => {
                format!("Check the value passed to {flag}.")
            }
            ResolveError::InvalidTokenType(_) => {
                "Use --token-type spark or --token-type sogni.".to_string()
            }
            ResolveError::InvalidSeedStrategy(_) => {
                "Use --seed-strategy random or --seed-strategy prompt-hash.".to_string()
            }
            ResolveError::InvalidNetwork(_) => {
                "Use --network fast or --network relaxed.".to_string()
            }
            ResolveError::InvalidConfig { path, .. } => {
                format!("Fix the JSON in {path} or point GENLINE_CONFIG elsewhere.")
            }
            ResolveError::InvalidCount { max, .. } => {
                format!("Use --count between 1 and {max}.")
            }
            ResolveError::InvalidDimensions { suggested, .. } => {
                format!("try --width {} --height {}", suggested.0, suggested.1)
            }
            ResolveError::UnknownWorkflow(_) => {
                let names = Workflow::ALL
                    .iter()
                    .map(|workflow| workflow.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("Use one of: {names}.")
            }
            ResolveError::WorkflowModelMismatch { workflow, .. } => {
                format!("Drop --model to use the default {workflow} model, or drop --workflow.")
            }
            ResolveError::VideoOnlyFlag { flags } => {
                format!("Add --video, or remove {}.", flags.join(", "))
            }
            ResolveError::MissingAsset { requirement, .. } => {
                format!("Supply {requirement}.")
            }
            ResolveError::ForbiddenAsset { flags, .. } => {
                format!("Remove {} or pick a workflow that uses them.", flags.join(", "))
            }
            ResolveError::TooManyContextImages { max, .. } => {
                format!("Pass at most {max} --context images.")
            }
            ResolveError::ContextUnsupported { .. } => {
                "Drop --model to use the default edit model, or choose a model that supports editing."
                    .to_string()
            }
            ResolveError::NoLastRender => {
                "Generate something first; --last-image reuses the previous render.".to_string()
            }
            ResolveError::GenerationFailed(_) => {
                "Retry, or rerun with RUST_LOG=debug for details.".to_string()
            }
            ResolveError::Timeout { seconds } => {
                format!("Raise --timeout above {seconds}.")
            }
        }
    }

    pub fn payload(&self, prompt: Option<&str>) -> ErrorPayload {
        ErrorPayload {
            success: false,
            error_code: self.code(),
            error: self.to_string(),
            hint: self.hint(),
            prompt: prompt.map(str::to_string),
        }
    }
}

/// Machine-readable failure emitted in `--json` mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub success: bool,
    pub error_code: &'static str,
    pub error: String,
    pub hint: String,
    pub prompt: Option<String>,
}
