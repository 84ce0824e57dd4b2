use genline_contracts::assets::AssetSet;
use genline_contracts::errors::ResolveError;
use genline_contracts::options::{MAX_GUIDANCE, MAX_STEPS};
use genline_contracts::plugin::{ModelDefaults, PluginConfig};
use genline_contracts::priority::first_defined;
use genline_contracts::request::{RequestShape, ResolvedRequest, VideoSpec};
use genline_contracts::workflow::{RenderMode, Workflow};

use crate::merge::ResolvedOptions;
use crate::seed::SeedResolution;

pub const MIN_DIMENSION: u32 = 256;
pub const MAX_DIMENSION: u32 = 2048;
pub const VIDEO_DIMENSION_MULTIPLE: u32 = 16;
pub const MAX_COUNT: u32 = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sampling {
    pub steps: Option<u32>,
    pub guidance: Option<f64>,
}

fn is_lightning(model: &str) -> bool {
    let model = model.to_ascii_lowercase();
    model.contains("lightning") || model.contains("lightx2v")
}

/// Hardcoded steps/guidance used when neither the user nor the plugin
/// config sets them. Plain image models keep their own defaults.
pub fn builtin_sampling(model: &str, mode: RenderMode) -> Sampling {
    let (steps, guidance) = match mode {
        _ if is_lightning(model) => (4, 1.0),
        RenderMode::Video => (20, 5.0),
        RenderMode::ImageEdit => (20, 4.0),
        RenderMode::Image => return Sampling::default(),
    };
    Sampling {
        steps: Some(steps),
        guidance: Some(guidance),
    }
}

pub fn resolve_sampling(
    options: &ResolvedOptions,
    model: &str,
    mode: RenderMode,
    config: Option<&PluginConfig>,
) -> Sampling {
    let configured = config
        .map(|config| config.model_defaults(model))
        .unwrap_or(ModelDefaults::default());
    let builtin = builtin_sampling(model, mode);
    Sampling {
        steps: first_defined([options.steps, configured.steps, builtin.steps]),
        guidance: first_defined([options.guidance, configured.guidance, builtin.guidance]),
    }
}

pub fn frame_count(explicit: Option<u32>, fps: u32, duration_sec: f64) -> u32 {
    explicit.unwrap_or_else(|| ((f64::from(fps) * duration_sec).round() as u32).max(1))
}

fn snap_multiple(value: u32, multiple: u32) -> u32 {
    if multiple <= 1 {
        return value.max(1);
    }
    let rounded = ((value as f64 / multiple as f64).round() as u32) * multiple;
    rounded.max(multiple)
}

fn nearest_valid_side(value: u32, mode: RenderMode) -> u32 {
    let clamped = value.clamp(MIN_DIMENSION, MAX_DIMENSION);
    if mode.is_video() {
        snap_multiple(clamped, VIDEO_DIMENSION_MULTIPLE)
    } else {
        clamped
    }
}

pub fn validate_dimensions(width: u32, height: u32, mode: RenderMode) -> Result<(), ResolveError> {
    let in_range = |side: u32| (MIN_DIMENSION..=MAX_DIMENSION).contains(&side);
    let reason = if !in_range(width) || !in_range(height) {
        format!("sides must be between {MIN_DIMENSION} and {MAX_DIMENSION} pixels")
    } else if mode.is_video()
        && (width % VIDEO_DIMENSION_MULTIPLE != 0 || height % VIDEO_DIMENSION_MULTIPLE != 0)
    {
        format!("video sides must be multiples of {VIDEO_DIMENSION_MULTIPLE}")
    } else {
        return Ok(());
    };
    Err(ResolveError::InvalidDimensions {
        width,
        height,
        mode: if mode.is_video() { "video" } else { "image" },
        reason,
        suggested: (
            nearest_valid_side(width, mode),
            nearest_valid_side(height, mode),
        ),
    })
}

pub fn validate_count(count: u32) -> Result<(), ResolveError> {
    if (1..=MAX_COUNT).contains(&count) {
        Ok(())
    } else {
        Err(ResolveError::InvalidCount {
            count,
            max: MAX_COUNT,
        })
    }
}

fn invalid(flag: &str, reason: impl Into<String>) -> ResolveError {
    ResolveError::InvalidArgument {
        flag: flag.to_string(),
        reason: reason.into(),
    }
}

/// Range checks for the numeric flags that have no dedicated error code.
pub fn validate_numeric(options: &ResolvedOptions) -> Result<(), ResolveError> {
    if let Some(steps) = options.steps {
        if !(1..=MAX_STEPS).contains(&steps) {
            return Err(invalid("--steps", format!("must be between 1 and {MAX_STEPS}")));
        }
    }
    if let Some(guidance) = options.guidance {
        if !guidance.is_finite() || !(0.0..=MAX_GUIDANCE).contains(&guidance) {
            return Err(invalid(
                "--guidance",
                format!("must be a number between 0 and {MAX_GUIDANCE}"),
            ));
        }
    }
    if options.video {
        if options.fps == 0 {
            return Err(invalid("--fps", "must be at least 1"));
        }
        if !options.duration_sec.is_finite() || options.duration_sec <= 0.0 {
            return Err(invalid("--duration", "must be a positive number of seconds"));
        }
        if options.frames == Some(0) {
            return Err(invalid("--frames", "must be at least 1"));
        }
    }
    Ok(())
}

/// Everything decided before the request is assembled. The assets and
/// workflow have already passed validation for `mode`.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub prompt: String,
    pub model: String,
    pub mode: RenderMode,
    pub workflow: Option<Workflow>,
    pub assets: AssetSet,
    pub seed: SeedResolution,
    pub sampling: Sampling,
}

pub fn build_request(options: &ResolvedOptions, plan: BuildPlan) -> ResolvedRequest {
    let BuildPlan {
        prompt,
        model,
        mode,
        workflow,
        assets,
        seed,
        sampling,
    } = plan;

    let shape = match (mode, workflow) {
        (RenderMode::Video, workflow) => RequestShape::Video(VideoSpec {
            workflow: workflow.unwrap_or(Workflow::T2v),
            fps: options.fps,
            duration_sec: options.duration_sec,
            frames: frame_count(options.frames, options.fps, options.duration_sec),
            image: assets.image,
            image_end: assets.image_end,
            audio: assets.audio,
            video: assets.video,
        }),
        (RenderMode::ImageEdit, _) => RequestShape::ImageEdit {
            context_images: assets.context_images,
        },
        (RenderMode::Image, _) => RequestShape::Image,
    };

    ResolvedRequest {
        prompt,
        model,
        width: options.width,
        height: options.height,
        count: options.count,
        token_type: options.token_type,
        network: options.network,
        seed: seed.seed,
        seed_strategy: options.seed_strategy,
        seed_source: seed.source,
        steps: sampling.steps,
        guidance: sampling.guidance,
        timeout_sec: options.timeout.seconds_for(mode),
        shape,
    }
}
