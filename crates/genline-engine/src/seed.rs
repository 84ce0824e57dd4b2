use genline_contracts::assets::AssetSet;
use genline_contracts::options::SeedStrategy;
use genline_contracts::request::SeedSource;
use genline_contracts::runs::last_render::LastRenderRecord;
use genline_contracts::workflow::Workflow;
use rand::Rng;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// Every parameter that feeds a prompt-hash seed.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedFingerprint<'a> {
    pub prompt: &'a str,
    pub model: &'a str,
    pub workflow: Option<Workflow>,
    pub width: u32,
    pub height: u32,
    pub assets: &'a AssetSet,
}

impl SeedFingerprint<'_> {
    /// Canonical payload: a fixed-order JSON array with absent assets as "".
    pub fn payload(&self) -> Value {
        let asset = |value: &Option<String>| value.clone().unwrap_or_default();
        json!([
            self.prompt,
            self.model,
            self.workflow.map(Workflow::as_str).unwrap_or("image"),
            self.width,
            self.height,
            asset(&self.assets.image),
            asset(&self.assets.image_end),
            asset(&self.assets.audio),
            asset(&self.assets.video),
            self.assets.context_images,
        ])
    }
}

pub fn prompt_hash_seed(fingerprint: &SeedFingerprint<'_>) -> u32 {
    let bytes = serde_json::to_vec(&fingerprint.payload()).unwrap_or_default();
    let digest = Sha256::digest(bytes);
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

pub fn random_seed() -> u32 {
    rand::thread_rng().gen()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedResolution {
    pub seed: u32,
    pub source: SeedSource,
}

/// `--last-seed` > `--seed` > strategy.
///
/// A `--last-seed` with no recorded seed falls through to the next rule.
pub fn resolve_seed(
    last_seed: bool,
    last_render: Option<&LastRenderRecord>,
    explicit: Option<u32>,
    strategy: SeedStrategy,
    fingerprint: &SeedFingerprint<'_>,
) -> SeedResolution {
    if last_seed {
        match last_render.and_then(|record| record.seed) {
            Some(seed) => {
                return SeedResolution {
                    seed,
                    source: SeedSource::LastRender,
                }
            }
            None => tracing::warn!("--last-seed given but no previous seed is recorded; ignoring it"),
        }
    }
    if let Some(seed) = explicit {
        return SeedResolution {
            seed,
            source: SeedSource::Explicit,
        };
    }
    match strategy {
        SeedStrategy::Random => SeedResolution {
            seed: random_seed(),
            source: SeedSource::Random,
        },
        SeedStrategy::PromptHash => SeedResolution {
            seed: prompt_hash_seed(fingerprint),
            source: SeedSource::PromptHash,
        },
    }
}
