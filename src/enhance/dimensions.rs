use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PORTRAIT_SHORT_EDGE: u32 = 1080;
pub const LANDSCAPE_SHORT_EDGE: u32 = 1080;
pub const PORTRAIT_LONG_EDGE: u32 = 1920;
pub const LANDSCAPE_LONG_EDGE: u32 = 1920;

/// Fallback applied when a custom spec carries a zero dimension.
pub const DEFAULT_CUSTOM_WIDTH: u32 = 1920;
pub const DEFAULT_CUSTOM_HEIGHT: u32 = 1080;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "preset", rename_all = "camelCase")]
pub enum TargetSpec {
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "16:9")]
    Landscape,
    Custom { width: u32, height: u32 },
}

/// Both derivations of the preset long edge were shipped at some point, so the
/// choice is explicit configuration instead of a hard-coded formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoundingPolicy {
    /// Fixed canonical pairs: 1080x1920 and 1920x1080.
    #[default]
    Canonical,
    /// Long edge computed as round(short * 16 / 9).
    Derived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DimensionError {
    #[error("custom dimensions must be positive, got {width}x{height}")]
    InvalidDimension { width: u32, height: u32 },
}

/// Maps a target spec to concrete output dimensions.
pub fn plan(spec: &TargetSpec, policy: RoundingPolicy) -> Result<Dimensions, DimensionError> {
    match *spec {
        TargetSpec::Portrait => Ok(Dimensions {
            width: PORTRAIT_SHORT_EDGE,
            height: match policy {
                RoundingPolicy::Canonical => PORTRAIT_LONG_EDGE,
                RoundingPolicy::Derived => derive_long_edge(PORTRAIT_SHORT_EDGE),
            },
        }),
        TargetSpec::Landscape => Ok(Dimensions {
            width: match policy {
                RoundingPolicy::Canonical => LANDSCAPE_LONG_EDGE,
                RoundingPolicy::Derived => derive_long_edge(LANDSCAPE_SHORT_EDGE),
            },
            height: LANDSCAPE_SHORT_EDGE,
        }),
        TargetSpec::Custom { width, height } => {
            if width == 0 || height == 0 {
                Err(DimensionError::InvalidDimension { width, height })
            } else {
                Ok(Dimensions { width, height })
            }
        }
    }
}

/// Replaces an invalid custom spec with the documented 1920x1080 default,
/// reporting the substitution as a warning for the batch report.
pub fn normalize(spec: TargetSpec) -> (TargetSpec, Option<String>) {
    match spec {
        TargetSpec::Custom { width, height } if width == 0 || height == 0 => {
            let warning = format!(
                "custom dimensions {}x{} are invalid, using {}x{}",
                width, height, DEFAULT_CUSTOM_WIDTH, DEFAULT_CUSTOM_HEIGHT
            );
            (
                TargetSpec::Custom {
                    width: DEFAULT_CUSTOM_WIDTH,
                    height: DEFAULT_CUSTOM_HEIGHT,
                },
                Some(warning),
            )
        }
        other => (other, None),
    }
}

/// Filename fragment identifying the target: `9x16`, `16x9` or `{w}x{h}`.
pub fn suffix(spec: &TargetSpec) -> String {
    match *spec {
        TargetSpec::Portrait => "9x16".to_string(),
        TargetSpec::Landscape => "16x9".to_string(),
        TargetSpec::Custom { width, height } => format!("{}x{}", width, height),
    }
}

fn derive_long_edge(short: u32) -> u32 {
    ((short as f64) * 16.0 / 9.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn portrait_preset_uses_canonical_pair() {
        let dims = plan(&TargetSpec::Portrait, RoundingPolicy::Canonical).expect("dims");
        assert_eq!(dims, Dimensions { width: 1080, height: 1920 });
    }

    #[test]
    fn landscape_preset_swaps_roles() {
        let dims = plan(&TargetSpec::Landscape, RoundingPolicy::Canonical).expect("dims");
        assert_eq!(dims, Dimensions { width: 1920, height: 1080 });
    }

    #[test]
    fn derived_policy_computes_long_edge() {
        let portrait = plan(&TargetSpec::Portrait, RoundingPolicy::Derived).expect("dims");
        assert_eq!(portrait, Dimensions { width: 1080, height: 1920 });

        let landscape = plan(&TargetSpec::Landscape, RoundingPolicy::Derived).expect("dims");
        assert_eq!(landscape, Dimensions { width: 1920, height: 1080 });
    }

    #[test]
    fn custom_dimensions_pass_through() {
        let spec = TargetSpec::Custom { width: 640, height: 480 };
        let dims = plan(&spec, RoundingPolicy::Canonical).expect("dims");
        assert_eq!(dims, Dimensions { width: 640, height: 480 });
    }

    #[test]
    fn zero_custom_dimension_is_rejected() {
        let spec = TargetSpec::Custom { width: 0, height: 1080 };
        let err = plan(&spec, RoundingPolicy::Canonical).expect_err("must reject");
        assert_eq!(err, DimensionError::InvalidDimension { width: 0, height: 1080 });
    }

    #[test]
    fn normalize_substitutes_default_for_invalid_custom() {
        let (spec, warning) = normalize(TargetSpec::Custom { width: 0, height: 1080 });
        assert_eq!(spec, TargetSpec::Custom { width: 1920, height: 1080 });
        assert!(warning.expect("warning").contains("0x1080"));

        let (kept, none) = normalize(TargetSpec::Custom { width: 800, height: 600 });
        assert_eq!(kept, TargetSpec::Custom { width: 800, height: 600 });
        assert!(none.is_none());
    }

    #[test]
    fn suffix_matches_output_naming() {
        assert_eq!(suffix(&TargetSpec::Portrait), "9x16");
        assert_eq!(suffix(&TargetSpec::Landscape), "16x9");
        assert_eq!(suffix(&TargetSpec::Custom { width: 512, height: 512 }), "512x512");
    }

    #[test]
    fn target_spec_wire_format_uses_preset_tag() {
        let spec: TargetSpec = serde_json::from_str(r#"{"preset":"9:16"}"#).expect("parse");
        assert_eq!(spec, TargetSpec::Portrait);

        let custom: TargetSpec =
            serde_json::from_str(r#"{"preset":"custom","width":800,"height":600}"#).expect("parse");
        assert_eq!(custom, TargetSpec::Custom { width: 800, height: 600 });
    }
}
