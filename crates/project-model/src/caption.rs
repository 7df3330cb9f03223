//! Timed captions and their persisted style.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::project::ProjectId;
use crate::store::InvalidRecord;

/// Caption identifier.
pub type CaptionId = u64;

/// Horizontal position used when a caption has no `x`: centered.
pub const DEFAULT_CAPTION_X: &str = "(w-text_w)/2";
/// Vertical position used when a caption has no `y`: 80% down the frame.
pub const DEFAULT_CAPTION_Y: &str = "h*0.8";
pub const DEFAULT_FONT_SIZE: f64 = 36.0;
pub const DEFAULT_CAPTION_COLOR: &str = "white";

const MAX_FONT_SIZE: f64 = 512.0;

/// A timed line of subtitle text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub id: CaptionId,

    pub project_id: ProjectId,

    /// Start of the caption in source seconds.
    pub start_time: f64,

    /// End of the caption in source seconds. Always greater than `start_time`.
    pub end_time: f64,

    pub text: String,

    /// Per-caption style overrides.
    #[serde(default)]
    pub style: Option<CaptionStyle>,
}

impl Caption {
    /// Whether this caption is visible at any point of `[start, end)`.
    ///
    /// Partial overlap counts; the caption does not have to be contained.
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        self.end_time > start && self.start_time < end
    }

    /// Style with every default filled in.
    pub fn resolved_style(&self) -> ResolvedStyle {
        self.style
            .as_ref()
            .map(CaptionStyle::resolve)
            .unwrap_or_default()
    }

    /// Check timing and style.
    pub fn validate(&self) -> Result<(), InvalidRecord> {
        if !self.start_time.is_finite() || !self.end_time.is_finite() {
            return Err(InvalidRecord::new(format!("caption {} has a non-finite time", self.id)));
        }
        if self.end_time <= self.start_time {
            return Err(InvalidRecord::new(format!(
                "caption {} ends at {:.3}s before it starts at {:.3}s",
                self.id, self.end_time, self.start_time
            )));
        }
        if let Some(style) = &self.style {
            style
                .validate()
                .map_err(|e| InvalidRecord::new(format!("caption {}: {e}", self.id)))?;
        }
        Ok(())
    }
}

/// Persisted caption style.
///
/// Serialized with the same keys the editor writes (`x`, `y`, `fontSize`,
/// `color`, `fontFamily`). Every key is optional and unknown keys are
/// ignored so stored styles from older editors keep loading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CaptionStyle {
    /// Horizontal position of the text's left edge. Default: centered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<Coordinate>,

    /// Vertical position of the text's top edge. Default: 80% of height.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<Coordinate>,

    /// Font size in output pixels. Default: 36.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,

    /// Color name or `#rrggbb`. Default: white.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// Preferred font family. Stored for the editor; not used when burning in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
}

/// A position either in output pixels or as an engine expression over the
/// frame (`w`, `h`) and text (`text_w`, `text_h`) dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coordinate {
    Pixels(f64),
    Expr(String),
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coordinate::Pixels(px) => write!(f, "{px}"),
            Coordinate::Expr(expr) => f.write_str(expr),
        }
    }
}

/// A caption style with all defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStyle {
    pub x: String,
    pub y: String,
    pub font_size: f64,
    pub color: String,
}

impl Default for ResolvedStyle {
    fn default() -> Self {
        Self {
            x: DEFAULT_CAPTION_X.to_string(),
            y: DEFAULT_CAPTION_Y.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            color: DEFAULT_CAPTION_COLOR.to_string(),
        }
    }
}

impl CaptionStyle {
    /// Fill in defaults for every unset field.
    pub fn resolve(&self) -> ResolvedStyle {
        let defaults = ResolvedStyle::default();
        ResolvedStyle {
            x: self.x.as_ref().map(|c| c.to_string()).unwrap_or(defaults.x),
            y: self.y.as_ref().map(|c| c.to_string()).unwrap_or(defaults.y),
            font_size: self.font_size.unwrap_or(defaults.font_size),
            color: self.color.clone().unwrap_or(defaults.color),
        }
    }

    /// Reject values that cannot be embedded in an overlay filter.
    pub fn validate(&self) -> Result<(), InvalidRecord> {
        for (axis, coord) in [("x", &self.x), ("y", &self.y)] {
            match coord {
                Some(Coordinate::Pixels(px)) if !px.is_finite() => {
                    return Err(InvalidRecord::new(format!("{axis} is not a finite number")));
                }
                Some(Coordinate::Expr(expr)) if !is_safe_expression(expr) => {
                    return Err(InvalidRecord::new(format!(
                        "{axis} expression {expr:?} contains unsupported characters"
                    )));
                }
                _ => {}
            }
        }

        if let Some(size) = self.font_size {
            if !size.is_finite() || size <= 0.0 || size > MAX_FONT_SIZE {
                return Err(InvalidRecord::new(format!(
                    "font size {size} is outside (0, {MAX_FONT_SIZE}]"
                )));
            }
        }

        if let Some(color) = &self.color {
            if !is_safe_color(color) {
                return Err(InvalidRecord::new(format!(
                    "color {color:?} is not a color name or hex value"
                )));
            }
        }

        Ok(())
    }
}

/// Arithmetic over named variables only; anything that could close the
/// option or the filter (`:` `,` `'` `;` `[` `]`) is refused.
fn is_safe_expression(expr: &str) -> bool {
    !expr.trim().is_empty()
        && expr.chars().all(|c| {
            c.is_ascii_alphanumeric()
                || matches!(c, '_' | '+' | '-' | '*' | '/' | '(' | ')' | '.' | ' ')
        })
}

/// Color names, `#rrggbb[aa]`, `0xrrggbb`, optionally with `@alpha`.
fn is_safe_color(color: &str) -> bool {
    !color.is_empty()
        && color
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '#' | '@' | '.'))
}
