//! Shortcode settings as stored by the host application.
//!
//! The host persists these as JSON; this module only parses and sanitizes a
//! string it is handed. Field names match the stored keys.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::SettingsError;
use crate::transformer::RenderOptions;

pub const DEFAULT_MAX_DEPTH: usize = 32;
pub const DEFAULT_MAX_UNITS: u64 = 10_000;
pub const MAX_PATTERN_LEN: usize = 100;

/// Key that triggers expansion of the abbreviation before the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TriggerKey {
    #[default]
    Tab,
    Enter,
    Space,
}

impl FromStr for TriggerKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Tab" => Ok(TriggerKey::Tab),
            "Enter" => Ok(TriggerKey::Enter),
            "Space" => Ok(TriggerKey::Space),
            other => Err(format!("unknown trigger key {other:?}")),
        }
    }
}

impl fmt::Display for TriggerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TriggerKey::Tab => "Tab",
            TriggerKey::Enter => "Enter",
            TriggerKey::Space => "Space",
        };
        f.write_str(name)
    }
}

/// Unknown keys fall back to the default instead of rejecting the settings.
fn lenient_trigger_key<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TriggerKey, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(raw.parse().unwrap_or_else(|e| {
        log::warn!("{e}, falling back to {}", TriggerKey::default());
        TriggerKey::default()
    }))
}

/// Complexity limits for a single expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Limits {
    /// Deepest allowed nesting of groups and `>` chains
    pub max_depth: usize,
    /// Most units one expansion may render
    pub max_units: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_units: DEFAULT_MAX_UNITS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortcodeSettings {
    #[serde(rename = "shortcodeEnabled")]
    pub enabled: bool,
    #[serde(rename = "shortcodeTriggerKey", deserialize_with = "lenient_trigger_key")]
    pub trigger_key: TriggerKey,
    /// Abbreviation pattern mapped to the literal text it expands to
    #[serde(rename = "customShortcodes")]
    pub custom_shortcodes: BTreeMap<String, String>,
    pub limits: Limits,
    pub output: RenderOptions,
}

impl Default for ShortcodeSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            trigger_key: TriggerKey::default(),
            custom_shortcodes: BTreeMap::new(),
            limits: Limits::default(),
            output: RenderOptions::default(),
        }
    }
}

impl ShortcodeSettings {
    /// Parse settings JSON, then drop any custom shortcode that is not usable.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: ShortcodeSettings = serde_json::from_str(json)?;
        Ok(settings.sanitized())
    }

    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Remove custom shortcodes with an invalid pattern or a blank expansion.
    pub fn sanitized(mut self) -> Self {
        self.custom_shortcodes.retain(|pattern, expansion| {
            let keep = is_valid_pattern(pattern) && !expansion.trim().is_empty();
            if !keep {
                log::warn!("dropping custom shortcode {pattern:?}");
            }
            keep
        });
        self
    }
}

/// A custom shortcode pattern may only use name characters and operators,
/// and is at most [`MAX_PATTERN_LEN`] characters long.
pub fn is_valid_pattern(pattern: &str) -> bool {
    !pattern.is_empty()
        && pattern.chars().count() <= MAX_PATTERN_LEN
        && pattern
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-+>*{}[]()".contains(c))
}

/// Built-in example shortcodes shown in the help text, with descriptions.
pub fn builtin_shortcodes() -> &'static [(&'static str, &'static str)] {
    &[
        ("table3x4", "Creates a 3x4 table structure"),
        ("h2+ul>li*3", "Creates heading with 3-item list"),
        ("div>h3+ul>li*5", "Creates section with heading and 5 list items"),
        ("link[url]{text}", "Creates markdown link"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ShortcodeSettings::default();
        assert!(settings.enabled);
        assert_eq!(settings.trigger_key, TriggerKey::Tab);
        assert!(settings.custom_shortcodes.is_empty());
        assert_eq!(settings.limits.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_from_stored_json() {
        let settings = ShortcodeSettings::from_json(
            r#"{
                "shortcodeEnabled": false,
                "shortcodeTriggerKey": "Enter",
                "customShortcodes": {"sig": "Best regards", "bad key": "x", "empty": "  "},
                "limits": {"maxDepth": 4},
                "output": {"indent": "\t"}
            }"#,
        )
        .unwrap();

        assert!(!settings.enabled);
        assert_eq!(settings.trigger_key, TriggerKey::Enter);
        assert_eq!(settings.custom_shortcodes.len(), 1);
        assert_eq!(settings.custom_shortcodes["sig"], "Best regards");
        assert_eq!(settings.limits.max_depth, 4);
        assert_eq!(settings.limits.max_units, DEFAULT_MAX_UNITS);
        assert_eq!(settings.output.indent, "\t");
        assert_eq!(settings.output.separator, "\n");
    }

    #[test]
    fn test_unknown_trigger_key_falls_back() {
        let settings = ShortcodeSettings::from_json(r#"{"shortcodeTriggerKey": "F5"}"#).unwrap();
        assert_eq!(settings.trigger_key, TriggerKey::Tab);
    }

    #[test]
    fn test_other_settings_keys_are_ignored() {
        let settings =
            ShortcodeSettings::from_json(r#"{"baseFolder": "Link", "debugMode": true}"#).unwrap();
        assert_eq!(settings, ShortcodeSettings::default());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            ShortcodeSettings::from_json("{not json"),
            Err(SettingsError::Json(_))
        ));
    }

    #[test]
    fn test_json_round_trip_keeps_stored_keys() {
        let json = ShortcodeSettings::default().to_json().unwrap();
        assert!(json.contains("\"shortcodeTriggerKey\": \"Tab\""));
        assert_eq!(
            ShortcodeSettings::from_json(&json).unwrap(),
            ShortcodeSettings::default()
        );
    }

    #[test]
    fn test_pattern_validation() {
        assert!(is_valid_pattern("h2+ul>li*3"));
        assert!(is_valid_pattern("link[url]{text}"));
        assert!(!is_valid_pattern(""));
        assert!(!is_valid_pattern("a b"));
        assert!(!is_valid_pattern("a=b"));
        assert!(!is_valid_pattern(&"a".repeat(MAX_PATTERN_LEN + 1)));
        assert!(is_valid_pattern(&"a".repeat(MAX_PATTERN_LEN)));
    }
}
