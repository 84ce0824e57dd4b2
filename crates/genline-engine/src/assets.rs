use genline_contracts::assets::{AssetKind, AssetSet};
use genline_contracts::errors::ResolveError;
use genline_contracts::models::ModelCapabilities;
use genline_contracts::workflow::Workflow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    None,
    AnyOf(&'static [AssetKind]),
    AllOf(&'static [AssetKind]),
}

/// What a workflow needs and refuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetRule {
    pub requirement: Requirement,
    pub label: &'static str,
    pub forbidden: &'static [AssetKind],
}

pub fn asset_rule(workflow: Workflow) -> AssetRule {
    match workflow {
        Workflow::T2v => AssetRule {
            requirement: Requirement::None,
            label: "no reference assets",
            forbidden: &[
                AssetKind::Image,
                AssetKind::ImageEnd,
                AssetKind::Audio,
                AssetKind::Video,
            ],
        },
        Workflow::I2v => AssetRule {
            requirement: Requirement::AnyOf(&[AssetKind::Image, AssetKind::ImageEnd]),
            label: "--ref and/or --ref-end",
            forbidden: &[AssetKind::Audio, AssetKind::Video],
        },
        Workflow::S2v => AssetRule {
            requirement: Requirement::AllOf(&[AssetKind::Image, AssetKind::Audio]),
            label: "--ref and --ref-audio",
            forbidden: &[AssetKind::Video],
        },
        Workflow::AnimateMove | Workflow::AnimateReplace => AssetRule {
            requirement: Requirement::AllOf(&[AssetKind::Image, AssetKind::Video]),
            label: "--ref and --ref-video",
            forbidden: &[AssetKind::Audio],
        },
    }
}

/// Checks the references of a video request against its workflow's rule.
///
/// Forbidden assets are reported before missing ones, and context images
/// are never accepted here.
pub fn validate_video_assets(workflow: Workflow, assets: &AssetSet) -> Result<(), ResolveError> {
    if assets.has_context_images() {
        return Err(ResolveError::ForbiddenAsset {
            context: "video mode".to_string(),
            flags: vec!["--context"],
        });
    }

    let rule = asset_rule(workflow);
    let forbidden = rule
        .forbidden
        .iter()
        .filter(|kind| assets.has(**kind))
        .map(|kind| kind.flag())
        .collect::<Vec<_>>();
    if !forbidden.is_empty() {
        return Err(ResolveError::ForbiddenAsset {
            context: format!("workflow {workflow}"),
            flags: forbidden,
        });
    }

    let missing = match rule.requirement {
        Requirement::None => Vec::new(),
        Requirement::AnyOf(kinds) if kinds.iter().any(|kind| assets.has(*kind)) => Vec::new(),
        Requirement::AnyOf(kinds) => kinds.iter().map(|kind| kind.flag()).collect(),
        Requirement::AllOf(kinds) => kinds
            .iter()
            .filter(|kind| !assets.has(**kind))
            .map(|kind| kind.flag())
            .collect(),
    };
    if !missing.is_empty() {
        return Err(ResolveError::MissingAsset {
            workflow,
            requirement: rule.label,
            missing,
        });
    }
    Ok(())
}

pub fn reject_video_only_flags(flags: &[&'static str]) -> Result<(), ResolveError> {
    if flags.is_empty() {
        return Ok(());
    }
    Err(ResolveError::VideoOnlyFlag {
        flags: flags.to_vec(),
    })
}

/// Image editing: the model must accept context images, and at most as many
/// as it advertises.
pub fn validate_context_images(
    model: &str,
    supplied: usize,
    capabilities: &dyn ModelCapabilities,
) -> Result<(), ResolveError> {
    if supplied == 0 {
        return Ok(());
    }
    let max = capabilities.max_context_images(model);
    if max == 0 {
        return Err(ResolveError::ContextUnsupported {
            model: model.to_string(),
        });
    }
    if supplied > max as usize {
        return Err(ResolveError::TooManyContextImages {
            model: model.to_string(),
            supplied,
            max,
        });
    }
    Ok(())
}
