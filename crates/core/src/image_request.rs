//! Image generation request model, defaults and validation.
//!
//! A [`GenerationRequest`] is always fully specified: the prompt is
//! trimmed and non-empty, and every unset option has been replaced by its
//! default (`4:3`, `block_medium_and_above`, `png`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Error message for an empty or whitespace-only prompt.
pub const EMPTY_PROMPT_MESSAGE: &str = "Prompt is required and cannot be empty";

// ---------------------------------------------------------------------------
// Option enums
// ---------------------------------------------------------------------------

/// Output aspect ratio accepted by the image model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[default]
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "16:9")]
    Wide16x9,
    #[serde(rename = "9:16")]
    Tall9x16,
}

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Landscape4x3 => "4:3",
            Self::Portrait3x4 => "3:4",
            Self::Wide16x9 => "16:9",
            Self::Tall9x16 => "9:16",
        }
    }
}

/// Provider-side content safety threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyFilterLevel {
    BlockLowAndAbove,
    #[default]
    BlockMediumAndAbove,
    BlockOnlyHigh,
}

impl SafetyFilterLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BlockLowAndAbove => "block_low_and_above",
            Self::BlockMediumAndAbove => "block_medium_and_above",
            Self::BlockOnlyHigh => "block_only_high",
        }
    }
}

/// Encoded image format of the generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpg,
    Webp,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Webp => "webp",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for SafetyFilterLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Caller-supplied image options; any field may be omitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSettings {
    pub aspect_ratio: Option<AspectRatio>,
    pub safety_filter_level: Option<SafetyFilterLevel>,
    pub output_format: Option<OutputFormat>,
}

/// A validated image generation request with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub aspect_ratio: AspectRatio,
    pub safety_filter_level: SafetyFilterLevel,
    pub output_format: OutputFormat,
}

impl GenerationRequest {
    /// Build a request from a raw prompt and optional settings.
    ///
    /// The prompt is trimmed; an empty result is rejected with
    /// [`CoreError::Validation`].
    pub fn new(prompt: &str, settings: ImageSettings) -> Result<Self, CoreError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(CoreError::Validation(EMPTY_PROMPT_MESSAGE.to_string()));
        }

        Ok(Self {
            prompt: prompt.to_string(),
            aspect_ratio: settings.aspect_ratio.unwrap_or_default(),
            safety_filter_level: settings.safety_filter_level.unwrap_or_default(),
            output_format: settings.output_format.unwrap_or_default(),
        })
    }
}

// ---------------------------------------------------------------------------
// Aspect ratio suggestion
// ---------------------------------------------------------------------------

const PORTRAIT_HINTS: &[&str] = &["portrait", "person", "face", "character"];
const LANDSCAPE_HINTS: &[&str] = &["landscape", "scenery", "panorama", "horizon"];
const VERTICAL_HINTS: &[&str] = &["mobile", "story", "vertical"];
const SQUARE_HINTS: &[&str] = &["logo", "icon", "social media", "profile"];

/// Suggest an aspect ratio from the subject matter of a prompt.
///
/// Hint groups are checked in order (portrait, landscape, vertical,
/// square); the first group with a substring hit wins. Falls back to 4:3.
pub fn suggest_aspect_ratio(prompt: &str) -> AspectRatio {
    let lower = prompt.to_lowercase();
    let hit = |hints: &[&str]| hints.iter().any(|h| lower.contains(h));

    if hit(PORTRAIT_HINTS) {
        AspectRatio::Portrait3x4
    } else if hit(LANDSCAPE_HINTS) {
        AspectRatio::Wide16x9
    } else if hit(VERTICAL_HINTS) {
        AspectRatio::Tall9x16
    } else if hit(SQUARE_HINTS) {
        AspectRatio::Square
    } else {
        AspectRatio::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_unset_fields() {
        let req = GenerationRequest::new("  a red fox  ", ImageSettings::default()).unwrap();
        assert_eq!(req.prompt, "a red fox");
        assert_eq!(req.aspect_ratio, AspectRatio::Landscape4x3);
        assert_eq!(req.safety_filter_level, SafetyFilterLevel::BlockMediumAndAbove);
        assert_eq!(req.output_format, OutputFormat::Png);
    }

    #[test]
    fn explicit_settings_are_kept() {
        let settings = ImageSettings {
            aspect_ratio: Some(AspectRatio::Tall9x16),
            safety_filter_level: Some(SafetyFilterLevel::BlockOnlyHigh),
            output_format: Some(OutputFormat::Webp),
        };
        let req = GenerationRequest::new("fox", settings).unwrap();
        assert_eq!(req.aspect_ratio, AspectRatio::Tall9x16);
        assert_eq!(req.safety_filter_level, SafetyFilterLevel::BlockOnlyHigh);
        assert_eq!(req.output_format, OutputFormat::Webp);
    }

    #[test]
    fn whitespace_prompt_is_rejected() {
        let err = GenerationRequest::new(" \n\t ", ImageSettings::default()).unwrap_err();
        match err {
            CoreError::Validation(msg) => assert_eq!(msg, EMPTY_PROMPT_MESSAGE),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn settings_deserialize_from_wire_strings() {
        let settings: ImageSettings = serde_json::from_str(
            r#"{"aspect_ratio":"16:9","safety_filter_level":"block_low_and_above","output_format":"jpg"}"#,
        )
        .unwrap();
        assert_eq!(settings.aspect_ratio, Some(AspectRatio::Wide16x9));
        assert_eq!(
            settings.safety_filter_level,
            Some(SafetyFilterLevel::BlockLowAndAbove)
        );
        assert_eq!(settings.output_format, Some(OutputFormat::Jpg));
    }

    #[test]
    fn unknown_aspect_ratio_fails_to_parse() {
        let parsed: Result<ImageSettings, _> = serde_json::from_str(r#"{"aspect_ratio":"2:1"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn serialized_request_uses_wire_strings() {
        let req = GenerationRequest::new("fox", ImageSettings::default()).unwrap();
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["aspect_ratio"], "4:3");
        assert_eq!(json["safety_filter_level"], "block_medium_and_above");
        assert_eq!(json["output_format"], "png");
    }

    #[test]
    fn suggestion_by_subject() {
        assert_eq!(suggest_aspect_ratio("Portrait of an old sailor"), AspectRatio::Portrait3x4);
        assert_eq!(suggest_aspect_ratio("mountain panorama at dawn"), AspectRatio::Wide16x9);
        assert_eq!(suggest_aspect_ratio("an instagram story cover"), AspectRatio::Tall9x16);
        assert_eq!(suggest_aspect_ratio("a logo for a bakery"), AspectRatio::Square);
        assert_eq!(suggest_aspect_ratio("a bowl of fruit"), AspectRatio::Landscape4x3);
    }

    #[test]
    fn portrait_hints_win_over_later_groups() {
        // Contains both "character" and "logo".
        assert_eq!(
            suggest_aspect_ratio("character mascot logo"),
            AspectRatio::Portrait3x4
        );
    }
}
