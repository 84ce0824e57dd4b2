use std::fmt;

use serde::{Deserialize, Serialize};

/// Video generation mode. Decides which reference assets a request may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Workflow {
    #[serde(rename = "t2v")]
    T2v,
    #[serde(rename = "i2v")]
    I2v,
    #[serde(rename = "s2v")]
    S2v,
    #[serde(rename = "animate-move")]
    AnimateMove,
    #[serde(rename = "animate-replace")]
    AnimateReplace,
}

const WORKFLOW_ALIASES: &[(&str, Workflow)] = &[
    ("t2v", Workflow::T2v),
    ("text-to-video", Workflow::T2v),
    ("text2video", Workflow::T2v),
    ("txt2vid", Workflow::T2v),
    ("i2v", Workflow::I2v),
    ("image-to-video", Workflow::I2v),
    ("image2video", Workflow::I2v),
    ("img2vid", Workflow::I2v),
    ("s2v", Workflow::S2v),
    ("sound-to-video", Workflow::S2v),
    ("speech-to-video", Workflow::S2v),
    ("audio-to-video", Workflow::S2v),
    ("animate-move", Workflow::AnimateMove),
    ("move", Workflow::AnimateMove),
    ("animate-replace", Workflow::AnimateReplace),
    ("replace", Workflow::AnimateReplace),
];

impl Workflow {
    pub const ALL: [Workflow; 5] = [
        Workflow::T2v,
        Workflow::I2v,
        Workflow::S2v,
        Workflow::AnimateMove,
        Workflow::AnimateReplace,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Workflow::T2v => "t2v",
            Workflow::I2v => "i2v",
            Workflow::S2v => "s2v",
            Workflow::AnimateMove => "animate-move",
            Workflow::AnimateReplace => "animate-replace",
        }
    }

    /// Normalizes a user-facing workflow name through the alias table.
    ///
    /// Matching ignores case and treats `_` and `-` as the same character.
    pub fn from_alias(raw: &str) -> Option<Workflow> {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");
        if normalized.is_empty() {
            return None;
        }
        WORKFLOW_ALIASES
            .iter()
            .find(|(alias, _)| *alias == normalized)
            .map(|(_, workflow)| *workflow)
    }

    /// Infers a workflow from the substring conventions used in model ids.
    pub fn infer_from_model(model: &str) -> Option<Workflow> {
        let lowered = model.trim().to_ascii_lowercase();
        if lowered.contains("animate-move") || lowered.contains("animate_move") {
            return Some(Workflow::AnimateMove);
        }
        if lowered.contains("animate-replace") || lowered.contains("animate_replace") {
            return Some(Workflow::AnimateReplace);
        }
        let markers = [
            ("t2v", Workflow::T2v),
            ("i2v", Workflow::I2v),
            ("s2v", Workflow::S2v),
        ];
        markers
            .iter()
            .find(|(marker, _)| {
                lowered.contains(&format!("_{marker}")) || lowered.contains(&format!("-{marker}"))
            })
            .map(|(_, workflow)| *workflow)
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three request shapes the engine can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Image,
    ImageEdit,
    Video,
}

impl RenderMode {
    pub fn is_video(self) -> bool {
        matches!(self, RenderMode::Video)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RenderMode::Image => "image",
            RenderMode::ImageEdit => "image-edit",
            RenderMode::Video => "video",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Workflow;

    #[test]
    fn aliases_normalize_case_and_separators() {
        assert_eq!(Workflow::from_alias("Text-To-Video"), Some(Workflow::T2v));
        assert_eq!(Workflow::from_alias("image_to_video"), Some(Workflow::I2v));
        assert_eq!(Workflow::from_alias(" S2V "), Some(Workflow::S2v));
        assert_eq!(
            Workflow::from_alias("animate_replace"),
            Some(Workflow::AnimateReplace)
        );
        assert_eq!(Workflow::from_alias("move"), Some(Workflow::AnimateMove));
        assert_eq!(Workflow::from_alias("slideshow"), None);
        assert_eq!(Workflow::from_alias(""), None);
    }

    #[test]
    fn canonical_names_round_trip_through_aliases() {
        for workflow in Workflow::ALL {
            assert_eq!(Workflow::from_alias(workflow.as_str()), Some(workflow));
        }
    }

    #[test]
    fn model_ids_map_to_workflows() {
        assert_eq!(
            Workflow::infer_from_model("wan_v2.2-14b-fp8_t2v_lightx2v"),
            Some(Workflow::T2v)
        );
        assert_eq!(
            Workflow::infer_from_model("wan-i2v-preview"),
            Some(Workflow::I2v)
        );
        assert_eq!(
            Workflow::infer_from_model("WAN_S2V_BASE"),
            Some(Workflow::S2v)
        );
        assert_eq!(
            Workflow::infer_from_model("wan_v2.2-14b-fp8_animate-move_lightx2v"),
            Some(Workflow::AnimateMove)
        );
        assert_eq!(
            Workflow::infer_from_model("wan_animate_replace"),
            Some(Workflow::AnimateReplace)
        );
        assert_eq!(Workflow::infer_from_model("z_image_turbo_bf16"), None);
        assert_eq!(Workflow::infer_from_model("t2vision"), None);
    }
}
