//! Plugin configuration.

use crate::error::SectionsError;
use serde::{Deserialize, Serialize};

/// Collapsible section settings.
///
/// Every field has a default, so a partial JSON object is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionsConfig {
    /// Width, in pixels, of the strip at the left edge of a title bar that toggles the section.
    pub toggle_gutter_px: f64,
    /// Paragraph contents that turn into a new section when typed. A single trailing space is
    /// also accepted.
    pub autoformat_triggers: Vec<String>,
    /// Placeholder shown in empty titles.
    pub title_placeholder: String,
}

impl Default for SectionsConfig {
    fn default() -> Self {
        Self {
            toggle_gutter_px: 24.0,
            autoformat_triggers: vec!["<details>".to_string(), "+++".to_string()],
            title_placeholder: "Collapsible Section Title".to_string(),
        }
    }
}

impl SectionsConfig {
    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self, SectionsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether `text` is an auto-format trigger.
    pub fn is_trigger(&self, text: &str) -> bool {
        let text = text.strip_suffix(' ').unwrap_or(text);
        self.autoformat_triggers
            .iter()
            .any(|trigger| !trigger.is_empty() && trigger == text)
    }

    /// Whether a click `offset_x` pixels from a title bar's left edge hits the toggle gutter.
    pub fn in_gutter(&self, offset_x: f64) -> bool {
        (0.0..=self.toggle_gutter_px).contains(&offset_x)
    }
}
