use indexmap::IndexMap;

use crate::workflow::Workflow;

pub const DEFAULT_IMAGE_MODEL: &str = "z_image_turbo_bf16";
pub const DEFAULT_EDIT_MODEL: &str = "qwen_image_edit_2511_fp8_lightning";

/// Model used for a video workflow when neither the user nor the plugin
/// config picks one.
pub fn builtin_video_model(workflow: Workflow) -> &'static str {
    match workflow {
        Workflow::T2v => "wan_v2.2-14b-fp8_t2v_lightx2v",
        Workflow::I2v => "wan_v2.2-14b-fp8_i2v_lightx2v",
        Workflow::S2v => "wan_v2.2-14b-fp8_s2v_lightx2v",
        Workflow::AnimateMove => "wan_v2.2-14b-fp8_animate-move_lightx2v",
        Workflow::AnimateReplace => "wan_v2.2-14b-fp8_animate-replace_lightx2v",
    }
}

/// What the resolution engine needs to know about a model.
pub trait ModelCapabilities {
    /// How many context images the model accepts for editing; 0 means none.
    fn max_context_images(&self, model: &str) -> u32;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub capabilities: Vec<String>,
    pub max_context_images: u32,
}

impl ModelSpec {
    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|item| item == capability)
    }
}

#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: IndexMap<String, ModelSpec>,
}

impl ModelRegistry {
    pub fn new(models: Option<IndexMap<String, ModelSpec>>) -> Self {
        Self {
            models: models.unwrap_or_else(default_models),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name)
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ModelCapabilities for ModelRegistry {
    fn max_context_images(&self, model: &str) -> u32 {
        self.get(model)
            .filter(|spec| spec.supports("edit"))
            .map(|spec| spec.max_context_images)
            .unwrap_or(0)
    }
}

fn default_models() -> IndexMap<String, ModelSpec> {
    let mut map = IndexMap::new();

    let mut insert = |name: &str, capabilities: &[&str], max_context_images: u32| {
        map.insert(
            name.to_string(),
            ModelSpec {
                name: name.to_string(),
                capabilities: capabilities
                    .iter()
                    .map(|item| (*item).to_string())
                    .collect(),
                max_context_images,
            },
        );
    };

    insert(DEFAULT_IMAGE_MODEL, &["image"], 0);
    insert("flux1-schnell-fp8", &["image"], 0);
    insert("chroma-v.46-flash_fp8", &["image"], 0);
    insert("flux2_dev_fp8", &["image", "edit"], 6);
    insert(DEFAULT_EDIT_MODEL, &["edit"], 3);
    insert("qwen_image_edit_2511_fp8", &["edit"], 3);
    for workflow in Workflow::ALL {
        insert(builtin_video_model(workflow), &["video"], 0);
    }
    insert("wan_v2.2-14b-fp8_t2v", &["video"], 0);
    insert("wan_v2.2-14b-fp8_i2v", &["video"], 0);

    map
}
