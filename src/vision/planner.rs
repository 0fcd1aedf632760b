//! Recognition pass planning
//!
//! Decides which image variants get recognized for one request. The original
//! image always runs; bright images add preprocessed variants when multi-pass
//! mode is on.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::brightness::{BrightnessReport, OVEREXPOSED_LUMINANCE};
use super::ocr_preprocess::{self, PreprocessingLevel};
use crate::capture::PixelImage;

/// Luminance above which auto mode preprocesses even without overexposure
pub const AUTO_PREPROCESS_LUMINANCE: f32 = 0.7;
/// Luminance above which auto mode picks the aggressive level
pub const AGGRESSIVE_LUMINANCE: f32 = 0.85;

/// Requested preprocessing level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreprocessingSelection {
    /// Pick a level from measured brightness
    #[default]
    Auto,
    Light,
    Moderate,
    Aggressive,
}

impl PreprocessingSelection {
    /// Level for an explicit selection, `None` for auto
    pub fn fixed_level(&self) -> Option<PreprocessingLevel> {
        match self {
            PreprocessingSelection::Auto => None,
            PreprocessingSelection::Light => Some(PreprocessingLevel::Light),
            PreprocessingSelection::Moderate => Some(PreprocessingLevel::Moderate),
            PreprocessingSelection::Aggressive => Some(PreprocessingLevel::Aggressive),
        }
    }
}

impl std::str::FromStr for PreprocessingSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(PreprocessingSelection::Auto),
            "light" => Ok(PreprocessingSelection::Light),
            "moderate" => Ok(PreprocessingSelection::Moderate),
            "aggressive" => Ok(PreprocessingSelection::Aggressive),
            other => Err(format!("unknown preprocessing level '{}'", other)),
        }
    }
}

/// Request options that drive planning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassOptions {
    pub enhance_for_brightness: bool,
    pub preprocessing: PreprocessingSelection,
    pub multi_pass: bool,
}

impl Default for PassOptions {
    fn default() -> Self {
        Self {
            enhance_for_brightness: true,
            preprocessing: PreprocessingSelection::Auto,
            multi_pass: true,
        }
    }
}

impl PassOptions {
    /// Brightness only matters when auto mode is allowed to enhance
    pub fn needs_brightness(&self) -> bool {
        self.preprocessing == PreprocessingSelection::Auto && self.enhance_for_brightness
    }
}

/// Label attached to every detection a pass produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassLabel {
    Original,
    Enhanced,
    Aggressive,
}

impl PassLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassLabel::Original => "original",
            PassLabel::Enhanced => "enhanced",
            PassLabel::Aggressive => "aggressive",
        }
    }
}

impl std::fmt::Display for PassLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One planned pass before its image is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassSpec {
    pub label: PassLabel,
    /// Preprocessing to apply; `None` recognizes the original as-is
    pub level: Option<PreprocessingLevel>,
}

/// Outcome of planning
#[derive(Debug, Clone, PartialEq)]
pub struct PassPlan {
    pub passes: Vec<PassSpec>,
    pub should_preprocess: bool,
    pub effective_level: Option<PreprocessingLevel>,
}

impl PassPlan {
    pub fn labels(&self) -> Vec<PassLabel> {
        self.passes.iter().map(|p| p.label).collect()
    }
}

/// A rendered pass ready for recognition
#[derive(Debug, Clone)]
pub struct Pass {
    pub label: PassLabel,
    pub image: PixelImage,
}

/// Auto-mode level for a measured luminance
pub fn level_for_luminance(luminance: f32) -> PreprocessingLevel {
    if luminance > AGGRESSIVE_LUMINANCE {
        PreprocessingLevel::Aggressive
    } else if luminance > OVEREXPOSED_LUMINANCE {
        PreprocessingLevel::Moderate
    } else {
        PreprocessingLevel::Light
    }
}

/// Decide which passes to run
///
/// `brightness` is only consulted in auto mode with enhancement enabled.
pub fn plan(brightness: Option<BrightnessReport>, options: &PassOptions) -> PassPlan {
    let original = PassSpec {
        label: PassLabel::Original,
        level: None,
    };

    let (should_preprocess, effective_level) = match options.preprocessing.fixed_level() {
        Some(level) => (options.enhance_for_brightness, Some(level)),
        None if options.enhance_for_brightness => match brightness {
            Some(report) => (
                report.overexposed || report.luminance > AUTO_PREPROCESS_LUMINANCE,
                Some(level_for_luminance(report.luminance)),
            ),
            None => (false, None),
        },
        None => (false, None),
    };

    let mut passes = vec![original];

    if options.multi_pass && should_preprocess {
        if let Some(level) = effective_level {
            passes.push(PassSpec {
                label: PassLabel::Enhanced,
                level: Some(level),
            });

            // Same parameters as the enhanced pass, kept as a separate pass
            if level == PreprocessingLevel::Aggressive {
                passes.push(PassSpec {
                    label: PassLabel::Aggressive,
                    level: Some(PreprocessingLevel::Aggressive),
                });
            }
        }
    }

    PassPlan {
        passes,
        should_preprocess,
        effective_level,
    }
}

/// Produce the image for every planned pass
///
/// Each distinct level is rendered once; passes sharing a level share the buffer.
pub fn render(plan: &PassPlan, original: &PixelImage) -> Vec<Pass> {
    let mut rendered: HashMap<PreprocessingLevel, PixelImage> = HashMap::new();

    plan.passes
        .iter()
        .map(|spec| {
            let image = match spec.level {
                None => original.clone(),
                Some(level) => rendered
                    .entry(level)
                    .or_insert_with(|| ocr_preprocess::apply(original, level))
                    .clone(),
            };
            debug!(
                "Prepared pass '{}' ({})",
                spec.label,
                spec.level.map_or("none", |l| l.as_str())
            );
            Pass {
                label: spec.label,
                image,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::brightness;

    fn report(luminance: f32) -> BrightnessReport {
        BrightnessReport {
            luminance,
            overexposed: luminance > OVEREXPOSED_LUMINANCE,
        }
    }

    #[test]
    fn test_level_thresholds() {
        assert_eq!(level_for_luminance(0.95), PreprocessingLevel::Aggressive);
        assert_eq!(level_for_luminance(0.851), PreprocessingLevel::Aggressive);
        assert_eq!(level_for_luminance(0.85), PreprocessingLevel::Moderate);
        assert_eq!(level_for_luminance(0.76), PreprocessingLevel::Moderate);
        assert_eq!(level_for_luminance(0.75), PreprocessingLevel::Light);
        assert_eq!(level_for_luminance(0.2), PreprocessingLevel::Light);
    }

    #[test]
    fn test_dark_image_runs_original_only() {
        let plan = plan(Some(report(0.4)), &PassOptions::default());
        assert!(!plan.should_preprocess);
        assert_eq!(plan.labels(), vec![PassLabel::Original]);
    }

    #[test]
    fn test_bright_but_not_overexposed_uses_light() {
        let plan = plan(Some(report(0.72)), &PassOptions::default());
        assert!(plan.should_preprocess);
        assert_eq!(plan.effective_level, Some(PreprocessingLevel::Light));
        assert_eq!(plan.labels(), vec![PassLabel::Original, PassLabel::Enhanced]);
    }

    #[test]
    fn test_overexposed_uses_moderate() {
        let plan = plan(Some(report(0.8)), &PassOptions::default());
        assert_eq!(plan.passes[1].level, Some(PreprocessingLevel::Moderate));
        assert_eq!(plan.passes.len(), 2);
    }

    #[test]
    fn test_very_bright_adds_aggressive_pass() {
        let plan = plan(Some(report(0.9)), &PassOptions::default());
        assert_eq!(
            plan.labels(),
            vec![PassLabel::Original, PassLabel::Enhanced, PassLabel::Aggressive]
        );
        assert_eq!(plan.passes[1].level, Some(PreprocessingLevel::Aggressive));
        assert_eq!(plan.passes[2].level, Some(PreprocessingLevel::Aggressive));
    }

    #[test]
    fn test_single_pass_ignores_brightness() {
        let options = PassOptions {
            multi_pass: false,
            ..Default::default()
        };
        for luminance in [0.1, 0.72, 0.8, 0.99] {
            let plan = plan(Some(report(luminance)), &options);
            assert_eq!(plan.passes, vec![PassSpec {
                label: PassLabel::Original,
                level: None,
            }]);
        }
    }

    #[test]
    fn test_explicit_level_follows_enhance_flag() {
        let options = PassOptions {
            preprocessing: PreprocessingSelection::Moderate,
            ..Default::default()
        };
        let plan_on = plan(None, &options);
        assert!(plan_on.should_preprocess);
        assert_eq!(plan_on.labels(), vec![PassLabel::Original, PassLabel::Enhanced]);
        assert_eq!(plan_on.passes[1].level, Some(PreprocessingLevel::Moderate));

        let options = PassOptions {
            enhance_for_brightness: false,
            ..options
        };
        let plan_off = plan(None, &options);
        assert!(!plan_off.should_preprocess);
        assert_eq!(plan_off.labels(), vec![PassLabel::Original]);
    }

    #[test]
    fn test_explicit_level_ignores_brightness() {
        let options = PassOptions {
            preprocessing: PreprocessingSelection::Light,
            ..Default::default()
        };
        let plan = plan(Some(report(0.99)), &options);
        assert_eq!(plan.effective_level, Some(PreprocessingLevel::Light));
        assert_eq!(plan.passes.len(), 2);
    }

    #[test]
    fn test_explicit_aggressive_adds_redundant_pass() {
        let options = PassOptions {
            preprocessing: PreprocessingSelection::Aggressive,
            ..Default::default()
        };
        let plan = plan(None, &options);
        assert_eq!(
            plan.labels(),
            vec![PassLabel::Original, PassLabel::Enhanced, PassLabel::Aggressive]
        );
    }

    #[test]
    fn test_auto_without_enhance_skips_analysis() {
        let options = PassOptions {
            enhance_for_brightness: false,
            ..Default::default()
        };
        assert!(!options.needs_brightness());
        let plan = plan(Some(report(0.99)), &options);
        assert_eq!(plan.labels(), vec![PassLabel::Original]);
        assert_eq!(plan.effective_level, None);
    }

    #[test]
    fn test_near_white_scenario() {
        let image = PixelImage::filled(32, 32, [235, 232, 230, 255]);
        let report = brightness::analyze(&image);
        assert!(report.luminance > 0.85);

        let plan = plan(Some(report), &PassOptions::default());
        let passes = render(&plan, &image);

        assert_eq!(passes.len(), 3);
        assert_eq!(passes[0].label, PassLabel::Original);
        assert_eq!(passes[0].image, image);
        assert_eq!(passes[1].label, PassLabel::Enhanced);
        assert_eq!(passes[2].label, PassLabel::Aggressive);

        let expected = ocr_preprocess::apply(&image, PreprocessingLevel::Aggressive);
        assert_eq!(passes[1].image, expected);
        assert_eq!(passes[2].image, expected);
        assert_ne!(passes[1].image, image);
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!("auto".parse::<PreprocessingSelection>(), Ok(PreprocessingSelection::Auto));
        assert_eq!("aggressive".parse::<PreprocessingSelection>(), Ok(PreprocessingSelection::Aggressive));
        assert!("extreme".parse::<PreprocessingSelection>().is_err());
    }
}
