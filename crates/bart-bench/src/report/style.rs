// SPDX-License-Identifier: AGPL-3.0-only

//! Text box styling with recursive overrides
//!
//! Styles carry full defaults. Overrides are patches of `Option` fields:
//! `Some` replaces the default, `None` keeps it, and nested groups are merged
//! field by field instead of being replaced wholesale.

/// Field-by-field overlay of a patch onto a value
pub trait Merge {
    /// Partial value with every field optional
    type Patch;

    /// Overlay `patch` onto `self`
    fn merge(&mut self, patch: Self::Patch);

    /// Overlay `patch` and return the result
    #[must_use]
    fn merged(mut self, patch: Self::Patch) -> Self
    where
        Self: Sized,
    {
        self.merge(patch);
        self
    }
}

/// Background box drawn behind the text
#[derive(Debug, Clone, PartialEq)]
pub struct BoxStyle {
    /// Fill color
    pub facecolor: String,
    /// Opacity of fill and edge
    pub alpha: f64,
    /// Edge color
    pub edgecolor: String,
    /// Round the corners
    pub rounded: bool,
}

impl Default for BoxStyle {
    fn default() -> Self {
        Self {
            facecolor: "white".to_string(),
            alpha: 0.75,
            edgecolor: "#ccc".to_string(),
            rounded: true,
        }
    }
}

/// Overrides for [`BoxStyle`]
#[derive(Debug, Clone, Default, PartialEq)]
#[allow(missing_docs)]
pub struct BoxStylePatch {
    pub facecolor: Option<String>,
    pub alpha: Option<f64>,
    pub edgecolor: Option<String>,
    pub rounded: Option<bool>,
}

impl Merge for BoxStyle {
    type Patch = BoxStylePatch;

    fn merge(&mut self, patch: BoxStylePatch) {
        if let Some(v) = patch.facecolor {
            self.facecolor = v;
        }
        if let Some(v) = patch.alpha {
            self.alpha = v;
        }
        if let Some(v) = patch.edgecolor {
            self.edgecolor = v;
        }
        if let Some(v) = patch.rounded {
            self.rounded = v;
        }
    }
}

/// Text box appearance
#[derive(Debug, Clone, PartialEq)]
pub struct TextBoxStyle {
    /// Font size in points
    pub font_size: f64,
    /// Text color
    pub color: String,
    /// Space between text and box edge, in multiples of the font size
    pub pad: f64,
    /// Inward margin from the axes edge, in points
    pub margin: f64,
    /// Background box
    pub bbox: BoxStyle,
}

impl Default for TextBoxStyle {
    fn default() -> Self {
        Self {
            font_size: 10.0,
            color: "black".to_string(),
            pad: 0.3,
            margin: super::anchor::DEFAULT_MARGIN,
            bbox: BoxStyle::default(),
        }
    }
}

/// Overrides for [`TextBoxStyle`]; `bbox` merges into the default box
#[derive(Debug, Clone, Default, PartialEq)]
#[allow(missing_docs)]
pub struct TextBoxPatch {
    pub font_size: Option<f64>,
    pub color: Option<String>,
    pub pad: Option<f64>,
    pub margin: Option<f64>,
    pub bbox: BoxStylePatch,
}

impl Merge for TextBoxStyle {
    type Patch = TextBoxPatch;

    fn merge(&mut self, patch: TextBoxPatch) {
        if let Some(v) = patch.font_size {
            self.font_size = v;
        }
        if let Some(v) = patch.color {
            self.color = v;
        }
        if let Some(v) = patch.pad {
            self.pad = v;
        }
        if let Some(v) = patch.margin {
            self.margin = v;
        }
        self.bbox.merge(patch.bbox);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_patch_keeps_defaults() {
        let style = TextBoxStyle::default().merged(TextBoxPatch::default());
        assert_eq!(style, TextBoxStyle::default());
    }

    #[test]
    fn nested_patch_keeps_sibling_fields() {
        let style = TextBoxStyle::default().merged(TextBoxPatch {
            bbox: BoxStylePatch {
                facecolor: Some("#eef".into()),
                ..BoxStylePatch::default()
            },
            ..TextBoxPatch::default()
        });
        assert_eq!(style.bbox.facecolor, "#eef");
        assert!((style.bbox.alpha - 0.75).abs() < f64::EPSILON);
        assert_eq!(style.bbox.edgecolor, "#ccc");
        assert!(style.bbox.rounded);
    }

    #[test]
    fn top_level_fields_replace() {
        let style = TextBoxStyle::default().merged(TextBoxPatch {
            font_size: Some(12.0),
            margin: Some(4.0),
            ..TextBoxPatch::default()
        });
        assert!((style.font_size - 12.0).abs() < f64::EPSILON);
        assert!((style.margin - 4.0).abs() < f64::EPSILON);
        assert_eq!(style.color, "black");
    }
}
