use genline_contracts::assets::AssetSet;
use genline_contracts::options::{Network, OptionField, RawOptions, SeedStrategy, TokenType};
use genline_contracts::plugin::PluginConfig;
use genline_contracts::priority::first_defined;
use genline_contracts::workflow::RenderMode;

pub const VIDEO_TIMEOUT_SEC: u64 = 300;
pub const IMAGE_EDIT_TIMEOUT_SEC: u64 = 60;
pub const IMAGE_TIMEOUT_SEC: u64 = 30;

/// Timeout candidates kept apart until the render mode is known.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeoutSetting {
    pub explicit: Option<u64>,
    pub video_config: Option<u64>,
    pub image_config: Option<u64>,
}

impl TimeoutSetting {
    fn configured(&self, mode: RenderMode) -> Option<u64> {
        match mode {
            RenderMode::Video => self.video_config,
            RenderMode::Image | RenderMode::ImageEdit => self.image_config,
        }
    }

    /// Built-in defaults only apply when nothing was chosen, so editing and
    /// video never override an explicit choice.
    pub fn seconds_for(&self, mode: RenderMode) -> u64 {
        first_defined([self.explicit, self.configured(mode)]).unwrap_or(match mode {
            RenderMode::Video => VIDEO_TIMEOUT_SEC,
            RenderMode::ImageEdit => IMAGE_EDIT_TIMEOUT_SEC,
            RenderMode::Image => IMAGE_TIMEOUT_SEC,
        })
    }
}

/// Options after applying CLI > plugin config > built-in precedence.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOptions {
    pub prompt: Option<String>,
    pub width: u32,
    pub height: u32,
    pub count: u32,
    pub seed: Option<u32>,
    pub seed_strategy: SeedStrategy,
    pub last_seed: bool,
    pub token_type: TokenType,
    pub network: Network,
    pub video: bool,
    pub workflow: Option<String>,
    pub fps: u32,
    pub duration_sec: f64,
    pub frames: Option<u32>,
    pub steps: Option<u32>,
    pub guidance: Option<f64>,
    pub model: Option<String>,
    pub timeout: TimeoutSetting,
    pub assets: AssetSet,
    pub last_image: bool,
    pub video_only_flags: Vec<&'static str>,
}

fn pick<T: Copy>(raw: &RawOptions, field: OptionField, cli: T, configured: Option<T>) -> T {
    let explicit = raw.is_explicit(field).then_some(cli);
    first_defined([explicit, configured]).unwrap_or(cli)
}

/// Overlays plugin configuration onto the parsed command line.
///
/// This is the only place that looks at which fields were typed by the
/// user; later stages work on the returned value alone.
pub fn merge_options(raw: &RawOptions, config: Option<&PluginConfig>) -> ResolvedOptions {
    let cfg = config.cloned().unwrap_or_default();

    let merged = ResolvedOptions {
        prompt: raw
            .prompt
            .as_deref()
            .map(str::trim)
            .filter(|prompt| !prompt.is_empty())
            .map(str::to_string),
        width: pick(raw, OptionField::Width, raw.width, cfg.default_width),
        height: pick(raw, OptionField::Height, raw.height, cfg.default_height),
        count: pick(raw, OptionField::Count, raw.count, cfg.default_count),
        seed: raw.seed,
        seed_strategy: pick(
            raw,
            OptionField::SeedStrategy,
            raw.seed_strategy,
            cfg.seed_strategy,
        ),
        last_seed: raw.last_seed,
        token_type: pick(
            raw,
            OptionField::TokenType,
            raw.token_type,
            cfg.default_token_type,
        ),
        network: pick(raw, OptionField::Network, raw.network, cfg.default_network),
        video: raw.video,
        workflow: raw.workflow.clone(),
        fps: pick(raw, OptionField::Fps, raw.fps, cfg.default_fps),
        duration_sec: pick(
            raw,
            OptionField::Duration,
            raw.duration_sec,
            cfg.default_duration_sec,
        ),
        frames: raw.frames,
        steps: raw.steps,
        guidance: raw.guidance,
        model: raw.model.clone(),
        timeout: TimeoutSetting {
            explicit: raw
                .timeout_sec
                .filter(|_| raw.is_explicit(OptionField::Timeout)),
            video_config: cfg.default_video_timeout_sec,
            image_config: cfg.default_image_timeout_sec,
        },
        assets: raw.assets.clone(),
        last_image: raw.last_image,
        video_only_flags: raw.video_only_flags(),
    };

    for field in raw.explicit.iter() {
        tracing::trace!(flag = field.flag(), "explicit flag takes precedence");
    }
    merged
}
