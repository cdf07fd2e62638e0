//! Switcher model detection and per-model input tables.
//!
//! The protocol engine never enforces these; they back the advisory
//! [`SourceValidator`] so the console can warn when an operator picks an
//! input the connected model does not have.

use std::fmt;

use atem_core::domain::inputs;
use atem_core::SourceValidator;

/// Known switcher models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitcherModel {
    Mini,
    MiniPro,
    MiniProIso,
    MiniExtreme,
    MiniExtremeIso,
    TelevisionStudioHd,
    TelevisionStudioHd8,
    TelevisionStudioHd8Iso,
    TelevisionStudio4k8,
    ProductionStudio4k,
    ConstellationHd,
    Constellation4k,
    Constellation8k,
    Sdi,
    SdiProIso,
    SdiExtremeIso,
}

/// Which sources a model exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelCapabilities {
    pub model: SwitcherModel,
    pub name: &'static str,
    pub camera_inputs: u16,
    pub media_players: u8,
    pub color_generators: u8,
    pub has_multiview: bool,
    pub has_program_out: bool,
    pub has_preview_out: bool,
}

const fn caps(
    model: SwitcherModel,
    name: &'static str,
    camera_inputs: u16,
    media_players: u8,
    has_outputs: bool,
) -> ModelCapabilities {
    ModelCapabilities {
        model,
        name,
        camera_inputs,
        media_players,
        color_generators: 2,
        has_multiview: has_outputs,
        has_program_out: has_outputs,
        has_preview_out: has_outputs,
    }
}

static CAPABILITIES: [ModelCapabilities; 16] = [
    caps(SwitcherModel::Mini, "ATEM Mini", 4, 1, false),
    caps(SwitcherModel::MiniPro, "ATEM Mini Pro", 4, 1, true),
    caps(SwitcherModel::MiniProIso, "ATEM Mini Pro ISO", 4, 1, true),
    caps(SwitcherModel::MiniExtreme, "ATEM Mini Extreme", 8, 2, true),
    caps(SwitcherModel::MiniExtremeIso, "ATEM Mini Extreme ISO", 8, 2, true),
    caps(SwitcherModel::TelevisionStudioHd, "ATEM Television Studio HD", 4, 2, true),
    caps(SwitcherModel::TelevisionStudioHd8, "ATEM Television Studio HD8", 8, 2, true),
    caps(SwitcherModel::TelevisionStudioHd8Iso, "ATEM Television Studio HD8 ISO", 8, 2, true),
    caps(SwitcherModel::TelevisionStudio4k8, "ATEM Television Studio 4K8", 8, 4, true),
    caps(SwitcherModel::ProductionStudio4k, "ATEM Production Studio 4K", 20, 4, true),
    caps(SwitcherModel::ConstellationHd, "ATEM Constellation HD", 40, 4, true),
    caps(SwitcherModel::Constellation4k, "ATEM Constellation 4K", 40, 4, true),
    caps(SwitcherModel::Constellation8k, "ATEM Constellation 8K", 40, 4, true),
    caps(SwitcherModel::Sdi, "ATEM SDI", 8, 1, false),
    caps(SwitcherModel::SdiProIso, "ATEM SDI Pro ISO", 8, 2, true),
    caps(SwitcherModel::SdiExtremeIso, "ATEM SDI Extreme ISO", 8, 2, true),
];

impl SwitcherModel {
    pub fn capabilities(self) -> &'static ModelCapabilities {
        // The table is indexed in declaration order.
        &CAPABILITIES[self as usize]
    }
}

impl fmt::Display for SwitcherModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.capabilities().name)
    }
}

/// Guesses the model from a product name such as `"ATEM Mini Pro ISO"`.
///
/// Matching is case-insensitive and checks the most specific names first,
/// so `"Mini Pro ISO"` is not mistaken for `"Mini Pro"`.
pub fn detect_model(product_name: &str) -> Option<SwitcherModel> {
    const PATTERNS: &[(&str, SwitcherModel)] = &[
        ("mini extreme iso", SwitcherModel::MiniExtremeIso),
        ("mini extreme", SwitcherModel::MiniExtreme),
        ("mini pro iso", SwitcherModel::MiniProIso),
        ("mini pro", SwitcherModel::MiniPro),
        ("mini", SwitcherModel::Mini),
        ("television studio hd8 iso", SwitcherModel::TelevisionStudioHd8Iso),
        ("television studio hd8", SwitcherModel::TelevisionStudioHd8),
        ("television studio 4k8", SwitcherModel::TelevisionStudio4k8),
        ("television studio hd", SwitcherModel::TelevisionStudioHd),
        ("production studio 4k", SwitcherModel::ProductionStudio4k),
        ("constellation 8k", SwitcherModel::Constellation8k),
        ("constellation 4k", SwitcherModel::Constellation4k),
        ("constellation hd", SwitcherModel::ConstellationHd),
        ("sdi extreme iso", SwitcherModel::SdiExtremeIso),
        ("sdi pro iso", SwitcherModel::SdiProIso),
        ("sdi", SwitcherModel::Sdi),
    ];

    let name = product_name.to_lowercase();
    PATTERNS
        .iter()
        .find(|(pattern, _)| name.contains(pattern))
        .map(|&(_, model)| model)
}

impl SourceValidator for ModelCapabilities {
    fn is_valid_source(&self, source: u16) -> bool {
        let players = u16::from(self.media_players);
        match source {
            inputs::BLACK | inputs::BARS => true,
            s if (1..=self.camera_inputs).contains(&s) => true,
            inputs::COLOR_1 => self.color_generators >= 1,
            inputs::COLOR_2 => self.color_generators >= 2,
            // Media player n fill is 30n0, its key 30n1.
            3010..=3041 if source % 10 <= 1 => (source - 3000) / 10 <= players,
            inputs::PROGRAM_OUT => self.has_program_out,
            inputs::PREVIEW_OUT => self.has_preview_out,
            inputs::MULTIVIEW => self.has_multiview,
            _ => false,
        }
    }
}

impl SourceValidator for &'static ModelCapabilities {
    fn is_valid_source(&self, source: u16) -> bool {
        (**self).is_valid_source(source)
    }
}
