use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::assets::AssetSet;
use crate::errors::ResolveError;

pub const DEFAULT_WIDTH: u32 = 512;
pub const DEFAULT_HEIGHT: u32 = 512;
pub const DEFAULT_COUNT: u32 = 1;
pub const DEFAULT_FPS: u32 = 16;
pub const DEFAULT_DURATION_SEC: f64 = 5.0;
pub const MAX_STEPS: u32 = 100;
pub const MAX_GUIDANCE: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    #[default]
    Spark,
    Sogni,
}

impl TokenType {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenType::Spark => "spark",
            TokenType::Sogni => "sogni",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ResolveError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "spark" => Ok(TokenType::Spark),
            "sogni" => Ok(TokenType::Sogni),
            _ => Err(ResolveError::InvalidTokenType(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeedStrategy {
    Random,
    #[default]
    PromptHash,
}

impl SeedStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            SeedStrategy::Random => "random",
            SeedStrategy::PromptHash => "prompt-hash",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ResolveError> {
        match raw.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "random" => Ok(SeedStrategy::Random),
            "prompt-hash" | "hash" => Ok(SeedStrategy::PromptHash),
            _ => Err(ResolveError::InvalidSeedStrategy(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Fast,
    Relaxed,
}

impl Network {
    pub fn as_str(self) -> &'static str {
        match self {
            Network::Fast => "fast",
            Network::Relaxed => "relaxed",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ResolveError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Network::Fast),
            "relaxed" => Ok(Network::Relaxed),
            _ => Err(ResolveError::InvalidNetwork(raw.to_string())),
        }
    }
}

/// Every option whose precedence depends on whether the user typed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionField {
    Width,
    Height,
    Count,
    Seed,
    SeedStrategy,
    TokenType,
    Network,
    Workflow,
    Fps,
    Duration,
    Frames,
    Steps,
    Guidance,
    Model,
    Timeout,
}

impl OptionField {
    pub fn flag(self) -> &'static str {
        match self {
            OptionField::Width => "--width",
            OptionField::Height => "--height",
            OptionField::Count => "--count",
            OptionField::Seed => "--seed",
            OptionField::SeedStrategy => "--seed-strategy",
            OptionField::TokenType => "--token-type",
            OptionField::Network => "--network",
            OptionField::Workflow => "--workflow",
            OptionField::Fps => "--fps",
            OptionField::Duration => "--duration",
            OptionField::Frames => "--frames",
            OptionField::Steps => "--steps",
            OptionField::Guidance => "--guidance",
            OptionField::Model => "--model",
            OptionField::Timeout => "--timeout",
        }
    }
}

impl fmt::Display for OptionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.flag())
    }
}

/// The set of fields the user supplied on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplicitFields(BTreeSet<OptionField>);

impl ExplicitFields {
    pub fn new(fields: impl IntoIterator<Item = OptionField>) -> Self {
        Self(fields.into_iter().collect())
    }

    pub fn contains(&self, field: OptionField) -> bool {
        self.0.contains(&field)
    }

    pub fn iter(&self) -> impl Iterator<Item = OptionField> + '_ {
        self.0.iter().copied()
    }
}

/// Parsed command line: user values where given, built-in defaults elsewhere.
///
/// Fields without a scalar built-in default stay `None` until the engine
/// resolves them against the active mode.
#[derive(Debug, Clone, PartialEq)]
pub struct RawOptions {
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
    pub timeout_sec: Option<u64>,
    pub assets: AssetSet,
    pub last_image: bool,
    pub explicit: ExplicitFields,
}

impl Default for RawOptions {
    fn default() -> Self {
        Self {
            prompt: None,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            count: DEFAULT_COUNT,
            seed: None,
            seed_strategy: SeedStrategy::default(),
            last_seed: false,
            token_type: TokenType::default(),
            network: Network::default(),
            video: false,
            workflow: None,
            fps: DEFAULT_FPS,
            duration_sec: DEFAULT_DURATION_SEC,
            frames: None,
            steps: None,
            guidance: None,
            model: None,
            timeout_sec: None,
            assets: AssetSet::default(),
            last_image: false,
            explicit: ExplicitFields::default(),
        }
    }
}

impl RawOptions {
    pub fn is_explicit(&self, field: OptionField) -> bool {
        self.explicit.contains(field)
    }

    /// Video-only flags the user supplied, in flag order.
    ///
    /// `--fps` and `--duration` only shape a clip and are ignored outside
    /// video mode. Every `--ref*` flag counts, since an image request has
    /// nowhere to carry a start or end frame.
    pub fn video_only_flags(&self) -> Vec<&'static str> {
        let mut flags = [OptionField::Workflow, OptionField::Frames]
            .into_iter()
            .filter(|field| self.is_explicit(*field))
            .map(OptionField::flag)
            .collect::<Vec<_>>();
        flags.extend(self.assets.video_reference_flags());
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::{ExplicitFields, Network, OptionField, RawOptions, SeedStrategy, TokenType};
    use crate::assets::AssetSet;
    use crate::errors::ResolveError;

    #[test]
    fn enum_values_parse_case_insensitively() {
        assert_eq!(TokenType::parse("SPARK"), Ok(TokenType::Spark));
        assert_eq!(TokenType::parse("sogni"), Ok(TokenType::Sogni));
        assert_eq!(SeedStrategy::parse("Prompt_Hash"), Ok(SeedStrategy::PromptHash));
        assert_eq!(SeedStrategy::parse("random"), Ok(SeedStrategy::Random));
        assert_eq!(Network::parse("relaxed"), Ok(Network::Relaxed));
    }

    #[test]
    fn malformed_enum_values_are_configuration_errors() {
        assert_eq!(
            TokenType::parse("gold"),
            Err(ResolveError::InvalidTokenType("gold".to_string()))
        );
        assert_eq!(
            SeedStrategy::parse("sequential"),
            Err(ResolveError::InvalidSeedStrategy("sequential".to_string()))
        );
        assert_eq!(
            Network::parse("slow"),
            Err(ResolveError::InvalidNetwork("slow".to_string()))
        );
    }

    #[test]
    fn video_only_flags_lists_fields_and_references() {
        let options = RawOptions {
            workflow: Some("i2v".to_string()),
            frames: Some(33),
            assets: AssetSet {
                audio: Some("voice.wav".to_string()),
                ..AssetSet::default()
            },
            explicit: ExplicitFields::new([OptionField::Workflow, OptionField::Frames]),
            ..RawOptions::default()
        };
        assert_eq!(
            options.video_only_flags(),
            vec!["--workflow", "--frames", "--ref-audio"]
        );
        assert!(RawOptions::default().video_only_flags().is_empty());
    }

    #[test]
    fn clip_timing_flags_are_not_video_only() {
        let options = RawOptions {
            fps: 24,
            duration_sec: 2.0,
            explicit: ExplicitFields::new([OptionField::Fps, OptionField::Duration]),
            ..RawOptions::default()
        };
        assert!(options.video_only_flags().is_empty());
    }
}
