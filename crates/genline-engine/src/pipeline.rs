use genline_contracts::assets::AssetSet;
use genline_contracts::errors::ResolveError;
use genline_contracts::models::{ModelCapabilities, ModelRegistry, ModelSelector};
use genline_contracts::options::RawOptions;
use genline_contracts::plugin::PluginConfig;
use genline_contracts::request::ResolvedRequest;
use genline_contracts::runs::last_render::LastRenderRecord;
use genline_contracts::workflow::RenderMode;

use crate::assets::{reject_video_only_flags, validate_context_images, validate_video_assets};
use crate::builder::{
    build_request, resolve_sampling, validate_count, validate_dimensions, validate_numeric,
    BuildPlan,
};
use crate::merge::{merge_options, ResolvedOptions};
use crate::seed::{resolve_seed, SeedFingerprint};
use crate::workflow::resolve_workflow;

/// Turns parsed arguments into a validated [`ResolvedRequest`].
///
/// Holds the read-only inputs of one invocation. Nothing here touches the
/// network or writes files.
pub struct Resolver {
    config: Option<PluginConfig>,
    last_render: Option<LastRenderRecord>,
    selector: ModelSelector,
    capabilities: Box<dyn ModelCapabilities>,
}

impl Resolver {
    pub fn new(config: Option<PluginConfig>, last_render: Option<LastRenderRecord>) -> Self {
        let registry = ModelRegistry::default();
        Self {
            config,
            last_render,
            selector: ModelSelector::new(Some(registry.clone())),
            capabilities: Box::new(registry),
        }
    }

    pub fn with_capabilities(mut self, capabilities: impl ModelCapabilities + 'static) -> Self {
        self.capabilities = Box::new(capabilities);
        self
    }

    pub fn resolve(&self, raw: &RawOptions) -> Result<ResolvedRequest, ResolveError> {
        let config = self.config.as_ref();
        let options = merge_options(raw, config);
        let prompt = options.prompt.clone().ok_or(ResolveError::MissingPrompt)?;

        if !options.video {
            reject_video_only_flags(&options.video_only_flags)?;
        }
        let assets = self.apply_last_image(&options)?;
        let mode = if options.video {
            RenderMode::Video
        } else if assets.has_context_images() {
            RenderMode::ImageEdit
        } else {
            RenderMode::Image
        };

        validate_count(options.count)?;
        validate_dimensions(options.width, options.height, mode)?;
        validate_numeric(&options)?;

        let workflow = if mode.is_video() {
            let resolution =
                resolve_workflow(options.workflow.as_deref(), options.model.as_deref(), &assets, config)?;
            validate_video_assets(resolution.workflow, &assets)?;
            Some(resolution.workflow)
        } else {
            None
        };

        let selection = self
            .selector
            .select(options.model.as_deref(), config, mode, workflow);
        if mode == RenderMode::ImageEdit {
            validate_context_images(
                &selection.model,
                assets.context_images.len(),
                self.capabilities.as_ref(),
            )?;
        }

        let seed = resolve_seed(
            options.last_seed,
            self.last_render.as_ref(),
            options.seed,
            options.seed_strategy,
            &SeedFingerprint {
                prompt: &prompt,
                model: &selection.model,
                workflow,
                width: options.width,
                height: options.height,
                assets: &assets,
            },
        );
        let sampling = resolve_sampling(&options, &selection.model, mode, config);

        tracing::debug!(
            mode = mode.as_str(),
            model = %selection.model,
            model_source = ?selection.source,
            seed = seed.seed,
            seed_source = seed.source.as_str(),
            "resolved request"
        );

        Ok(build_request(
            &options,
            BuildPlan {
                prompt,
                model: selection.model,
                mode,
                workflow,
                assets,
                seed,
                sampling,
            },
        ))
    }

    /// `--last-image` feeds the previous output back in: as the start frame
    /// of a video, or as a context image for stills.
    fn apply_last_image(&self, options: &ResolvedOptions) -> Result<AssetSet, ResolveError> {
        let mut assets = options.assets.clone();
        if !options.last_image {
            return Ok(assets);
        }
        if options.video && assets.image.is_some() {
            return Err(ResolveError::ForbiddenAsset {
                context: "video mode with --ref".to_string(),
                flags: vec!["--last-image"],
            });
        }
        let image = self
            .last_render
            .as_ref()
            .and_then(LastRenderRecord::reusable_image)
            .ok_or(ResolveError::NoLastRender)?
            .to_string();
        if options.video {
            assets.image = Some(image);
        } else {
            assets.context_images.push(image);
        }
        Ok(assets)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use genline_contracts::assets::AssetSet;
    use genline_contracts::errors::ResolveError;
    use genline_contracts::models::{ModelCapabilities, DEFAULT_EDIT_MODEL, DEFAULT_IMAGE_MODEL};
    use genline_contracts::options::{ExplicitFields, OptionField, RawOptions, SeedStrategy, TokenType};
    use genline_contracts::plugin::PluginConfig;
    use genline_contracts::request::{RequestShape, SeedSource};
    use genline_contracts::runs::last_render::LastRenderRecord;
    use genline_contracts::workflow::{RenderMode, Workflow};
    use serde_json::json;

    use super::Resolver;
    use crate::seed::{prompt_hash_seed, SeedFingerprint};

    fn prompt(text: &str) -> RawOptions {
        RawOptions {
            prompt: Some(text.to_string()),
            ..RawOptions::default()
        }
    }

    fn video(workflow: Option<&str>, assets: AssetSet) -> RawOptions {
        let mut explicit = Vec::new();
        if workflow.is_some() {
            explicit.push(OptionField::Workflow);
        }
        RawOptions {
            video: true,
            workflow: workflow.map(str::to_string),
            assets,
            explicit: ExplicitFields::new(explicit),
            ..prompt("a dancer on a rooftop")
        }
    }

    fn previous(seed: Option<u32>, local_path: Option<&str>) -> LastRenderRecord {
        LastRenderRecord {
            timestamp: "2026-01-01T00:00:00.000000+00:00".to_string(),
            media_type: "image".to_string(),
            prompt: "earlier".to_string(),
            model: DEFAULT_IMAGE_MODEL.to_string(),
            width: 512,
            height: 512,
            seed,
            seed_strategy: Some("prompt-hash".to_string()),
            seed_source: None,
            seeds: seed.into_iter().collect(),
            project_id: Some("p".to_string()),
            urls: vec!["https://cdn.example/earlier.png".to_string()],
            local_path: local_path.map(str::to_string),
            token_type: Some("spark".to_string()),
            workflow: None,
            fps: None,
            duration: None,
            frames: None,
            ref_image: None,
            ref_image_end: None,
            ref_audio: None,
            ref_video: None,
            context_images: None,
        }
    }

    struct FixedCapacity(u32);

    impl ModelCapabilities for FixedCapacity {
        fn max_context_images(&self, _model: &str) -> u32 {
            self.0
        }
    }

    #[test]
    fn bare_prompt_resolves_to_a_default_image_request() -> Result<(), ResolveError> {
        let request = Resolver::new(None, None).resolve(&prompt("a cat wearing a hat"))?;
        assert_eq!(request.mode(), RenderMode::Image);
        assert_eq!(request.shape, RequestShape::Image);
        assert_eq!((request.width, request.height), (512, 512));
        assert_eq!(request.model, DEFAULT_IMAGE_MODEL);
        assert_eq!(request.token_type, TokenType::Spark);
        assert_eq!(request.seed_source, SeedSource::PromptHash);
        assert_eq!(request.steps, None);
        assert_eq!(request.timeout_sec, 30);

        let assets = AssetSet::default();
        let expected = prompt_hash_seed(&SeedFingerprint {
            prompt: "a cat wearing a hat",
            model: DEFAULT_IMAGE_MODEL,
            workflow: None,
            width: 512,
            height: 512,
            assets: &assets,
        });
        assert_eq!(request.seed, expected);
        Ok(())
    }

    #[test]
    fn i2v_without_references_is_a_missing_asset() {
        let err = Resolver::new(None, None).resolve(&video(Some("i2v"), AssetSet::default()));
        assert_eq!(
            err,
            Err(ResolveError::MissingAsset {
                workflow: Workflow::I2v,
                requirement: "--ref and/or --ref-end",
                missing: vec!["--ref", "--ref-end"],
            })
        );
    }

    #[test]
    fn s2v_with_only_an_image_is_rejected() {
        let assets = AssetSet {
            image: Some("a.jpg".to_string()),
            ..AssetSet::default()
        };
        let err = Resolver::new(None, None).resolve(&video(Some("s2v"), assets));
        assert_eq!(err.map_err(|err| err.code()), Err("MISSING_ASSET"));
    }

    #[test]
    fn explicit_seed_bypasses_random_strategy() -> Result<(), ResolveError> {
        let raw = RawOptions {
            seed: Some(42),
            seed_strategy: SeedStrategy::Random,
            explicit: ExplicitFields::new([OptionField::Seed, OptionField::SeedStrategy]),
            ..prompt("a cat wearing a hat")
        };
        let request = Resolver::new(None, None).resolve(&raw)?;
        assert_eq!(request.seed, 42);
        assert_eq!(request.seed_strategy, SeedStrategy::Random);
        assert_eq!(request.seed_source, SeedSource::Explicit);

        let default_strategy = RawOptions {
            seed: Some(42),
            explicit: ExplicitFields::new([OptionField::Seed]),
            ..prompt("a cat")
        };
        let request = Resolver::new(None, None).resolve(&default_strategy)?;
        assert_eq!(request.seed_strategy, SeedStrategy::PromptHash);
        assert_eq!(request.seed_source, SeedSource::Explicit);
        Ok(())
    }

    #[test]
    fn identical_inputs_give_identical_seeds() -> Result<(), ResolveError> {
        let first = Resolver::new(None, None).resolve(&prompt("same prompt"))?;
        let second = Resolver::new(None, None).resolve(&prompt("same prompt"))?;
        assert_eq!(first.seed, second.seed);
        Ok(())
    }

    #[test]
    fn missing_prompt_is_reported_first() {
        let raw = RawOptions {
            count: 99,
            ..RawOptions::default()
        };
        assert_eq!(
            Resolver::new(None, None).resolve(&raw),
            Err(ResolveError::MissingPrompt)
        );
    }

    #[test]
    fn video_only_flags_need_video_mode() {
        let raw = RawOptions {
            frames: Some(33),
            assets: AssetSet {
                audio: Some("voice.wav".to_string()),
                ..AssetSet::default()
            },
            explicit: ExplicitFields::new([OptionField::Frames]),
            ..prompt("a cat")
        };
        assert_eq!(
            Resolver::new(None, None).resolve(&raw),
            Err(ResolveError::VideoOnlyFlag {
                flags: vec!["--frames", "--ref-audio"],
            })
        );

        let start_frame = RawOptions {
            assets: AssetSet {
                image: Some("a.png".to_string()),
                ..AssetSet::default()
            },
            ..prompt("a cat")
        };
        assert_eq!(
            Resolver::new(None, None).resolve(&start_frame),
            Err(ResolveError::VideoOnlyFlag {
                flags: vec!["--ref"],
            })
        );
    }

    #[test]
    fn clip_timing_is_ignored_for_stills() -> Result<(), ResolveError> {
        let raw = RawOptions {
            fps: 24,
            duration_sec: 2.0,
            explicit: ExplicitFields::new([OptionField::Fps, OptionField::Duration]),
            ..prompt("a cat")
        };
        let request = Resolver::new(None, None).resolve(&raw)?;
        assert_eq!(request.shape, RequestShape::Image);
        assert_eq!(request.timeout_sec, 30);
        Ok(())
    }

    #[test]
    fn s2v_carries_an_end_frame_through() -> Result<(), ResolveError> {
        let assets = AssetSet {
            image: Some("a.jpg".to_string()),
            image_end: Some("c.jpg".to_string()),
            audio: Some("b.wav".to_string()),
            ..AssetSet::default()
        };
        let request = Resolver::new(None, None).resolve(&video(Some("s2v"), assets))?;
        match request.shape {
            RequestShape::Video(spec) => {
                assert_eq!(spec.workflow, Workflow::S2v);
                assert_eq!(spec.image_end.as_deref(), Some("c.jpg"));
            }
            other => panic!("expected a video shape, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn out_of_range_plugin_sampling_falls_back_to_builtins() -> Result<(), ResolveError> {
        let raw_config = json!({
            "modelDefaults": {
                "z_image_turbo_bf16": {"steps": 5000, "guidance": 999},
                "qwen_image_edit_2511_fp8_lightning": {"steps": 500},
            },
        });
        let config = PluginConfig::from_object(raw_config.as_object().unwrap_or(&Default::default()));
        let resolver = Resolver::new(Some(config), None);

        let request = resolver.resolve(&prompt("a cat"))?;
        assert_eq!((request.steps, request.guidance), (None, None));

        let edit = RawOptions {
            assets: AssetSet {
                context_images: vec!["a.png".to_string()],
                ..AssetSet::default()
            },
            ..prompt("make it blue")
        };
        let request = resolver.resolve(&edit)?;
        assert_eq!((request.steps, request.guidance), (Some(4), Some(1.0)));
        Ok(())
    }

    #[test]
    fn video_request_infers_workflow_from_assets() -> Result<(), ResolveError> {
        let assets = AssetSet {
            image: Some("face.png".to_string()),
            audio: Some("voice.wav".to_string()),
            ..AssetSet::default()
        };
        let request = Resolver::new(None, None).resolve(&video(None, assets))?;
        assert_eq!(request.workflow(), Some(Workflow::S2v));
        assert_eq!(request.model, "wan_v2.2-14b-fp8_s2v_lightx2v");
        assert_eq!((request.steps, request.guidance), (Some(4), Some(1.0)));
        assert_eq!(request.timeout_sec, 300);
        match request.shape {
            RequestShape::Video(spec) => {
                assert_eq!(spec.frames, 80);
                assert_eq!(spec.audio.as_deref(), Some("voice.wav"));
            }
            other => panic!("expected a video shape, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn plugin_config_picks_video_model_and_workflow() -> Result<(), ResolveError> {
        let config = PluginConfig {
            default_video_workflow: Some(Workflow::T2v),
            video_models: BTreeMap::from([(Workflow::T2v, "wan_v2.2-14b-fp8_t2v".to_string())]),
            default_video_timeout_sec: Some(600),
            ..PluginConfig::default()
        };
        let request =
            Resolver::new(Some(config), None).resolve(&video(None, AssetSet::default()))?;
        assert_eq!(request.model, "wan_v2.2-14b-fp8_t2v");
        assert_eq!((request.steps, request.guidance), (Some(20), Some(5.0)));
        assert_eq!(request.timeout_sec, 600);
        Ok(())
    }

    #[test]
    fn video_sizes_are_checked_against_the_grid() {
        let raw = RawOptions {
            width: 650,
            explicit: ExplicitFields::new([OptionField::Width]),
            ..video(None, AssetSet::default())
        };
        let err = Resolver::new(None, None).resolve(&raw);
        assert_eq!(
            err.map_err(|err| err.hint()),
            Err("try --width 656 --height 512".to_string())
        );
    }

    #[test]
    fn context_images_switch_to_editing() -> Result<(), ResolveError> {
        let raw = RawOptions {
            assets: AssetSet {
                context_images: vec!["a.png".to_string(), "b.png".to_string()],
                ..AssetSet::default()
            },
            ..prompt("make it blue")
        };
        let request = Resolver::new(None, None).resolve(&raw)?;
        assert_eq!(request.mode(), RenderMode::ImageEdit);
        assert_eq!(request.model, DEFAULT_EDIT_MODEL);
        assert_eq!(request.timeout_sec, 60);
        assert_eq!((request.steps, request.guidance), (Some(4), Some(1.0)));
        Ok(())
    }

    #[test]
    fn context_capacity_comes_from_the_capability_source() {
        let raw = RawOptions {
            assets: AssetSet {
                context_images: vec!["a.png".to_string(), "b.png".to_string()],
                ..AssetSet::default()
            },
            ..prompt("make it blue")
        };
        let err = Resolver::new(None, None)
            .with_capabilities(FixedCapacity(1))
            .resolve(&raw);
        assert_eq!(err.map_err(|err| err.code()), Err("TOO_MANY_CONTEXT_IMAGES"));

        let unsupported = RawOptions {
            model: Some(DEFAULT_IMAGE_MODEL.to_string()),
            explicit: ExplicitFields::new([OptionField::Model]),
            ..raw
        };
        let err = Resolver::new(None, None).resolve(&unsupported);
        assert_eq!(err.map_err(|err| err.code()), Err("CONTEXT_UNSUPPORTED"));
    }

    #[test]
    fn last_seed_adopts_the_recorded_seed() -> Result<(), ResolveError> {
        let raw = RawOptions {
            last_seed: true,
            ..prompt("a cat")
        };
        let request = Resolver::new(None, Some(previous(Some(1234), None))).resolve(&raw)?;
        assert_eq!(request.seed, 1234);
        assert_eq!(request.seed_source, SeedSource::LastRender);

        let fallback = Resolver::new(None, None).resolve(&raw)?;
        assert_eq!(fallback.seed_source, SeedSource::PromptHash);
        Ok(())
    }

    #[test]
    fn last_image_becomes_the_video_start_frame() -> Result<(), ResolveError> {
        let raw = RawOptions {
            last_image: true,
            ..video(None, AssetSet::default())
        };
        let request =
            Resolver::new(None, Some(previous(None, Some("/tmp/earlier.png")))).resolve(&raw)?;
        assert_eq!(request.workflow(), Some(Workflow::I2v));
        match request.shape {
            RequestShape::Video(spec) => assert_eq!(spec.image.as_deref(), Some("/tmp/earlier.png")),
            other => panic!("expected a video shape, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn last_image_becomes_a_context_image_for_stills() -> Result<(), ResolveError> {
        let raw = RawOptions {
            last_image: true,
            ..prompt("now in winter")
        };
        let request = Resolver::new(None, Some(previous(None, None))).resolve(&raw)?;
        assert_eq!(
            request.shape,
            RequestShape::ImageEdit {
                context_images: vec!["https://cdn.example/earlier.png".to_string()],
            }
        );

        let err = Resolver::new(None, None).resolve(&raw);
        assert_eq!(err, Err(ResolveError::NoLastRender));
        Ok(())
    }

    #[test]
    fn last_image_conflicts_with_an_explicit_start_frame() {
        let raw = RawOptions {
            last_image: true,
            ..video(
                Some("i2v"),
                AssetSet {
                    image: Some("start.png".to_string()),
                    ..AssetSet::default()
                },
            )
        };
        let err = Resolver::new(None, Some(previous(None, Some("/tmp/earlier.png")))).resolve(&raw);
        assert_eq!(
            err,
            Err(ResolveError::ForbiddenAsset {
                context: "video mode with --ref".to_string(),
                flags: vec!["--last-image"],
            })
        );
        assert_eq!(
            err.map_err(|err| err.to_string()),
            Err("video mode with --ref does not accept --last-image".to_string())
        );
    }
}
