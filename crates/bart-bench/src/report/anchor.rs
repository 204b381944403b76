// SPDX-License-Identifier: AGPL-3.0-only

//! Text box anchors
//!
//! An anchor names one of nine positions on the axes, `{lower, center,
//! upper} × {left, center, right}`. Each maps to an attachment point in axes
//! fractions, an offset in points pushing the box inwards by a margin, and
//! the alignment of the box against the offset point.

use std::fmt;
use std::str::FromStr;

use crate::error::BenchError;

/// Default inward margin, in points
pub const DEFAULT_MARGIN: f64 = 8.0;

/// Vertical alignment of the box against its anchor point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VAlign {
    /// Box bottom on the point
    Bottom,
    /// Box centered on the point
    Center,
    /// Box top on the point
    Top,
}

/// Horizontal alignment of the box against its anchor point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HAlign {
    /// Box left edge on the point
    Left,
    /// Box centered on the point
    Center,
    /// Box right edge on the point
    Right,
}

/// One of the nine text box positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(missing_docs)]
pub enum Anchor {
    LowerLeft,
    LowerCenter,
    #[default]
    LowerRight,
    CenterLeft,
    CenterCenter,
    CenterRight,
    UpperLeft,
    UpperCenter,
    UpperRight,
}

/// Where and how a box attaches to the axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Attachment point in axes fractions, origin lower left
    pub xy: (f64, f64),
    /// Offset from the attachment point in points, y pointing up
    pub offset: (f64, f64),
    /// Vertical alignment
    pub valign: VAlign,
    /// Horizontal alignment
    pub halign: HAlign,
}

impl Anchor {
    /// All anchors, row by row from the bottom
    pub const ALL: [Anchor; 9] = [
        Self::LowerLeft,
        Self::LowerCenter,
        Self::LowerRight,
        Self::CenterLeft,
        Self::CenterCenter,
        Self::CenterRight,
        Self::UpperLeft,
        Self::UpperCenter,
        Self::UpperRight,
    ];

    /// Vertical alignment implied by the row
    pub const fn valign(self) -> VAlign {
        match self {
            Self::LowerLeft | Self::LowerCenter | Self::LowerRight => VAlign::Bottom,
            Self::CenterLeft | Self::CenterCenter | Self::CenterRight => VAlign::Center,
            Self::UpperLeft | Self::UpperCenter | Self::UpperRight => VAlign::Top,
        }
    }

    /// Horizontal alignment implied by the column
    pub const fn halign(self) -> HAlign {
        match self {
            Self::LowerLeft | Self::CenterLeft | Self::UpperLeft => HAlign::Left,
            Self::LowerCenter | Self::CenterCenter | Self::UpperCenter => HAlign::Center,
            Self::LowerRight | Self::CenterRight | Self::UpperRight => HAlign::Right,
        }
    }

    /// Placement with an inward margin of `margin` points
    pub fn placement(self, margin: f64) -> Placement {
        let (x, dx) = match self.halign() {
            HAlign::Left => (0.0, margin),
            HAlign::Center => (0.5, 0.0),
            HAlign::Right => (1.0, -margin),
        };
        let (y, dy) = match self.valign() {
            VAlign::Bottom => (0.0, margin),
            VAlign::Center => (0.5, 0.0),
            VAlign::Top => (1.0, -margin),
        };
        Placement {
            xy: (x, y),
            offset: (dx, dy),
            valign: self.valign(),
            halign: self.halign(),
        }
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let row = match self.valign() {
            VAlign::Bottom => "lower",
            VAlign::Center => "center",
            VAlign::Top => "upper",
        };
        let col = match self.halign() {
            HAlign::Left => "left",
            HAlign::Center => "center",
            HAlign::Right => "right",
        };
        write!(f, "{row} {col}")
    }
}

impl FromStr for Anchor {
    type Err = BenchError;

    /// Parse `"lower right"`, `"upper-left"` and similar.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_'], " ");
        let words: Vec<&str> = normalized.split_whitespace().collect();
        let anchor = match words.as_slice() {
            ["lower", "left"] => Self::LowerLeft,
            ["lower", "center"] => Self::LowerCenter,
            ["lower", "right"] => Self::LowerRight,
            ["center", "left"] => Self::CenterLeft,
            ["center", "center"] => Self::CenterCenter,
            ["center", "right"] => Self::CenterRight,
            ["upper", "left"] => Self::UpperLeft,
            ["upper", "center"] => Self::UpperCenter,
            ["upper", "right"] => Self::UpperRight,
            _ => return Err(BenchError::Anchor(s.to_string())),
        };
        Ok(anchor)
    }
}
