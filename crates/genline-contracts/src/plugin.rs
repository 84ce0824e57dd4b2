use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;

use serde_json::{Map, Value};

use crate::errors::ResolveError;
use crate::options::{Network, SeedStrategy, TokenType, MAX_GUIDANCE, MAX_STEPS};
use crate::workflow::Workflow;

/// Per-model sampling overrides from `modelDefaults`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModelDefaults {
    pub steps: Option<u32>,
    pub guidance: Option<f64>,
}

/// Defaults supplied by the host plugin.
///
/// Every field is optional. Values of the wrong type, non-finite numbers and
/// unknown enum names are dropped so they fall back to built-in defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginConfig {
    pub default_width: Option<u32>,
    pub default_height: Option<u32>,
    pub default_count: Option<u32>,
    pub default_token_type: Option<TokenType>,
    pub seed_strategy: Option<SeedStrategy>,
    pub default_video_workflow: Option<Workflow>,
    pub default_fps: Option<u32>,
    pub default_duration_sec: Option<f64>,
    pub default_video_timeout_sec: Option<u64>,
    pub default_image_timeout_sec: Option<u64>,
    pub video_models: BTreeMap<Workflow, String>,
    pub default_edit_model: Option<String>,
    pub default_image_model: Option<String>,
    pub default_network: Option<Network>,
    pub model_defaults: BTreeMap<String, ModelDefaults>,
}

impl PluginConfig {
    /// Reads the config at `path`. A missing file means "no plugin config".
    pub fn load(path: &Path) -> Result<Option<Self>, ResolveError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(ResolveError::InvalidConfig {
                    path: path.display().to_string(),
                    reason: err.to_string(),
                })
            }
        };
        let parsed: Value =
            serde_json::from_str(&raw).map_err(|err| ResolveError::InvalidConfig {
                path: path.display().to_string(),
                reason: err.to_string(),
            })?;
        let Some(obj) = parsed.as_object() else {
            return Err(ResolveError::InvalidConfig {
                path: path.display().to_string(),
                reason: "expected a JSON object".to_string(),
            });
        };
        Ok(Some(Self::from_object(obj)))
    }

    pub fn from_object(obj: &Map<String, Value>) -> Self {
        let video_models = obj
            .get("videoModels")
            .and_then(Value::as_object)
            .map(|models| {
                models
                    .iter()
                    .filter_map(|(key, value)| {
                        let Some(workflow) = Workflow::from_alias(key) else {
                            tracing::warn!(key = %key, "ignoring videoModels entry for unknown workflow");
                            return None;
                        };
                        non_empty(value).map(|model| (workflow, model))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let model_defaults = obj
            .get("modelDefaults")
            .and_then(Value::as_object)
            .map(|models| {
                models
                    .iter()
                    .filter_map(|(model, value)| {
                        let row = value.as_object()?;
                        let steps = positive_u32(row.get("steps"));
                        let guidance = finite_f64(row.get("guidance"));
                        let defaults = ModelDefaults {
                            steps: steps.filter(|steps| *steps <= MAX_STEPS),
                            guidance: guidance
                                .filter(|guidance| (0.0..=MAX_GUIDANCE).contains(guidance)),
                        };
                        if defaults.steps != steps || defaults.guidance != guidance {
                            tracing::warn!(model = %model, "ignoring out-of-range modelDefaults values");
                        }
                        Some((model.clone(), defaults))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            default_width: positive_u32(obj.get("defaultWidth")),
            default_height: positive_u32(obj.get("defaultHeight")),
            default_count: positive_u32(obj.get("defaultCount")),
            default_token_type: parse_enum(obj, "defaultTokenType", TokenType::parse),
            seed_strategy: parse_enum(obj, "seedStrategy", SeedStrategy::parse),
            default_video_workflow: obj
                .get("defaultVideoWorkflow")
                .and_then(non_empty)
                .and_then(|raw| {
                    let workflow = Workflow::from_alias(&raw);
                    if workflow.is_none() {
                        tracing::warn!(value = %raw, "ignoring unknown defaultVideoWorkflow");
                    }
                    workflow
                }),
            default_fps: positive_u32(obj.get("defaultFps")),
            default_duration_sec: finite_f64(obj.get("defaultDurationSec"))
                .filter(|value| *value > 0.0),
            default_video_timeout_sec: positive_u32(obj.get("defaultVideoTimeoutSec"))
                .map(u64::from),
            default_image_timeout_sec: positive_u32(obj.get("defaultImageTimeoutSec"))
                .map(u64::from),
            video_models,
            default_edit_model: obj.get("defaultEditModel").and_then(non_empty),
            default_image_model: obj.get("defaultImageModel").and_then(non_empty),
            default_network: parse_enum(obj, "defaultNetwork", Network::parse),
            model_defaults,
        }
    }

    pub fn video_model(&self, workflow: Workflow) -> Option<&str> {
        self.video_models.get(&workflow).map(String::as_str)
    }

    pub fn model_defaults(&self, model: &str) -> ModelDefaults {
        self.model_defaults.get(model).copied().unwrap_or_default()
    }
}

fn finite_f64(value: Option<&Value>) -> Option<f64> {
    let number = match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn positive_u32(value: Option<&Value>) -> Option<u32> {
    let number = finite_f64(value)?;
    if number < 1.0 || number > f64::from(u32::MAX) {
        return None;
    }
    Some(number.round() as u32)
}

fn non_empty(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn parse_enum<T>(
    obj: &Map<String, Value>,
    key: &str,
    parse: impl Fn(&str) -> Result<T, ResolveError>,
) -> Option<T> {
    let raw = obj.get(key).and_then(non_empty)?;
    match parse(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(key, error = %err, "ignoring plugin config value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::{ModelDefaults, PluginConfig};
    use crate::errors::ResolveError;
    use crate::options::{Network, SeedStrategy, TokenType};
    use crate::workflow::Workflow;

    fn config(value: Value) -> PluginConfig {
        let obj = value.as_object().cloned().unwrap_or_default();
        PluginConfig::from_object(&obj)
    }

    #[test]
    fn recognized_keys_are_extracted() {
        let parsed = config(json!({
            "defaultWidth": 768,
            "defaultHeight": 640.0,
            "defaultCount": 2,
            "defaultTokenType": "sogni",
            "seedStrategy": "random",
            "defaultVideoWorkflow": "image-to-video",
            "defaultFps": 24,
            "defaultDurationSec": 3.5,
            "defaultVideoTimeoutSec": 600,
            "defaultImageTimeoutSec": 45,
            "videoModels": {"t2v": "custom_t2v_model", "animate_move": "custom_move"},
            "defaultEditModel": "edit-model",
            "defaultImageModel": "image-model",
            "defaultNetwork": "relaxed",
            "modelDefaults": {"image-model": {"steps": 12, "guidance": 3.5}},
        }));
        assert_eq!(parsed.default_width, Some(768));
        assert_eq!(parsed.default_height, Some(640));
        assert_eq!(parsed.default_count, Some(2));
        assert_eq!(parsed.default_token_type, Some(TokenType::Sogni));
        assert_eq!(parsed.seed_strategy, Some(SeedStrategy::Random));
        assert_eq!(parsed.default_video_workflow, Some(Workflow::I2v));
        assert_eq!(parsed.default_fps, Some(24));
        assert_eq!(parsed.default_duration_sec, Some(3.5));
        assert_eq!(parsed.default_video_timeout_sec, Some(600));
        assert_eq!(parsed.default_image_timeout_sec, Some(45));
        assert_eq!(parsed.video_model(Workflow::T2v), Some("custom_t2v_model"));
        assert_eq!(parsed.video_model(Workflow::AnimateMove), Some("custom_move"));
        assert_eq!(parsed.video_model(Workflow::S2v), None);
        assert_eq!(parsed.default_edit_model.as_deref(), Some("edit-model"));
        assert_eq!(parsed.default_image_model.as_deref(), Some("image-model"));
        assert_eq!(parsed.default_network, Some(Network::Relaxed));
        assert_eq!(
            parsed.model_defaults("image-model"),
            ModelDefaults {
                steps: Some(12),
                guidance: Some(3.5)
            }
        );
        assert_eq!(parsed.model_defaults("other"), ModelDefaults::default());
    }

    #[test]
    fn undefined_or_malformed_values_are_dropped() {
        let parsed = config(json!({
            "defaultWidth": "wide",
            "defaultHeight": null,
            "defaultCount": 0,
            "defaultTokenType": "gold",
            "seedStrategy": 7,
            "defaultVideoWorkflow": "slideshow",
            "defaultDurationSec": -1,
            "videoModels": {"nonsense": "x", "s2v": ""},
            "modelDefaults": {"m": {"steps": "many", "guidance": -2}},
        }));
        assert_eq!(parsed.default_width, None);
        assert_eq!(parsed.default_height, None);
        assert_eq!(parsed.default_count, None);
        assert_eq!(parsed.default_token_type, None);
        assert_eq!(parsed.seed_strategy, None);
        assert_eq!(parsed.default_video_workflow, None);
        assert_eq!(parsed.default_duration_sec, None);
        assert!(parsed.video_models.is_empty());
        assert_eq!(parsed.model_defaults("m"), ModelDefaults::default());
    }

    #[test]
    fn out_of_range_model_defaults_are_dropped() {
        let parsed = config(json!({
            "modelDefaults": {
                "z_image_turbo_bf16": {"steps": 5000, "guidance": 999},
                "edge": {"steps": 100, "guidance": 30},
            },
        }));
        assert_eq!(
            parsed.model_defaults("z_image_turbo_bf16"),
            ModelDefaults::default()
        );
        assert_eq!(
            parsed.model_defaults("edge"),
            ModelDefaults {
                steps: Some(100),
                guidance: Some(30.0)
            }
        );
    }

    #[test]
    fn load_treats_missing_file_as_absent_and_garbage_as_error() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let missing = temp.path().join("missing.json");
        assert_eq!(PluginConfig::load(&missing)?, None);

        let broken = temp.path().join("broken.json");
        std::fs::write(&broken, "{not json")?;
        let err = PluginConfig::load(&broken).err();
        assert!(matches!(err, Some(ResolveError::InvalidConfig { .. })));

        let valid = temp.path().join("config.json");
        std::fs::write(&valid, r#"{"defaultWidth": 1024}"#)?;
        let loaded = PluginConfig::load(&valid)?;
        assert_eq!(loaded.and_then(|cfg| cfg.default_width), Some(1024));
        Ok(())
    }
}
