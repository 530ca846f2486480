use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::layout::LayoutNode;
use crate::style::{BlockStyle, Color, TextStyle};

static DEFAULT_PROFILE: &str = include_str!("default_profile.toml");

/// Text and block styling for one element kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockFormat {
    pub text: TextStyle,
    pub block: BlockStyle,
}

/// The divider emitted for horizontal rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleStyle {
    pub width: Option<f32>,
    pub height: f32,
    pub color: Option<Color>,
}

impl Default for RuleStyle {
    fn default() -> Self {
        Self {
            width: None,
            height: 1.0,
            color: None,
        }
    }
}

impl RuleStyle {
    pub fn node(&self) -> LayoutNode {
        LayoutNode::Divider {
            width: self.width,
            height: Some(self.height),
            color: self.color,
        }
    }
}

/// Per-element styling used for one render.
///
/// Profiles are replaced wholesale, never merged at render time. Missing keys in a
/// profile file take the neutral defaults below, not the values of the compiled
/// default profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormattingProfile {
    /// Gap between list delimiters and item content, and between top-level blocks
    pub item_spacing: f32,
    pub h1: BlockFormat,
    pub h2: BlockFormat,
    pub h3: BlockFormat,
    pub h4: BlockFormat,
    pub h5: BlockFormat,
    pub h6: BlockFormat,
    pub paragraph: BlockFormat,
    pub bold: TextStyle,
    pub italic: TextStyle,
    pub hyperlink: TextStyle,
    pub strikethrough: TextStyle,
    pub code: TextStyle,
    pub code_block: BlockFormat,
    pub quote: BlockFormat,
    pub image: BlockStyle,
    pub list: BlockFormat,
    pub list_item: BlockFormat,
    pub rule: RuleStyle,
}

impl Default for FormattingProfile {
    fn default() -> Self {
        Self {
            item_spacing: 8.0,
            h1: BlockFormat::default(),
            h2: BlockFormat::default(),
            h3: BlockFormat::default(),
            h4: BlockFormat::default(),
            h5: BlockFormat::default(),
            h6: BlockFormat::default(),
            paragraph: BlockFormat::default(),
            bold: TextStyle::default(),
            italic: TextStyle::default(),
            hyperlink: TextStyle::default(),
            strikethrough: TextStyle::default(),
            code: TextStyle::default(),
            code_block: BlockFormat::default(),
            quote: BlockFormat::default(),
            image: BlockStyle::default(),
            list: BlockFormat::default(),
            list_item: BlockFormat::default(),
            rule: RuleStyle::default(),
        }
    }
}

impl FormattingProfile {
    /// The built-in profile from `default_profile.toml`.
    pub fn compiled_default() -> Self {
        toml::from_str(DEFAULT_PROFILE).unwrap_or_default()
    }

    /// Load a profile from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Formatting for a header level. Levels outside 1-6 use the level 1 format.
    pub fn header(&self, level: u8) -> &BlockFormat {
        match level {
            2 => &self.h2,
            3 => &self.h3,
            4 => &self.h4,
            5 => &self.h5,
            6 => &self.h6,
            _ => &self.h1,
        }
    }
}
