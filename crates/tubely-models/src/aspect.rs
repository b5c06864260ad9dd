//! Aspect categories and classification.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Absolute tolerance (in ratio units) used when matching a category.
pub const ASPECT_TOLERANCE: f64 = 0.1;

/// Named geometry category of a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AspectCategory {
    /// Landscape (16:9)
    Wide,
    /// Portrait (9:16)
    Tall,
    /// Anything that matched no category
    Other,
}

/// Category table in match precedence order. `Other` is the fallback and is not listed.
const CATEGORY_TABLE: [(AspectCategory, f64); 2] = [
    (AspectCategory::Wide, 16.0 / 9.0),
    (AspectCategory::Tall, 9.0 / 16.0),
];

impl AspectCategory {
    pub fn label(&self) -> &'static str {
        match self {
            AspectCategory::Wide => "wide",
            AspectCategory::Tall => "tall",
            AspectCategory::Other => "other",
        }
    }
}

impl fmt::Display for AspectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Classify a frame geometry.
///
/// Computes `width / height` and returns the first table entry whose target
/// ratio lies within [`ASPECT_TOLERANCE`] of it, or [`AspectCategory::Other`].
/// `height` must be non-zero; a zero height yields `Other`.
pub fn classify_aspect(width: u32, height: u32) -> AspectCategory {
    if height == 0 {
        return AspectCategory::Other;
    }

    let ratio = width as f64 / height as f64;
    CATEGORY_TABLE
        .iter()
        .find(|(_, target)| (ratio - target).abs() <= ASPECT_TOLERANCE)
        .map(|(category, _)| *category)
        .unwrap_or(AspectCategory::Other)
}
