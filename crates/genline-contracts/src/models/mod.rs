mod registry;
mod selectors;

pub use registry::{
    builtin_video_model, ModelCapabilities, ModelRegistry, ModelSpec, DEFAULT_EDIT_MODEL,
    DEFAULT_IMAGE_MODEL,
};
pub use selectors::{ModelSelection, ModelSelector, ModelSource};
