use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::item_pool::JunkIceTraps;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct HintSettings {
    // Items that never make a location a goal candidate, typically because many copies exist.
    pub excluded_goal_items: Vec<String>,
    // Locations hinted unconditionally; their necessity records carry zero weight.
    pub always_hinted: Vec<String>,
    pub use_default_goals: bool,
    pub default_goal: DefaultGoalSettings,
    // A playthrough is being generated separately; skip the tracked item lookup.
    pub playthrough: bool,
    pub tracked_item: String,
    pub junk_ice_traps: JunkIceTraps,
}

impl Default for HintSettings {
    fn default() -> Self {
        HintSettings {
            excluded_goal_items: vec!["Triforce Piece".to_string()],
            always_hinted: vec![],
            use_default_goals: true,
            default_goal: DefaultGoalSettings::default(),
            playthrough: false,
            tracked_item: "Light Arrows".to_string(),
            junk_ice_traps: JunkIceTraps::default(),
        }
    }
}

// The goal synthesized when no configured category produced a required location.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DefaultGoalSettings {
    pub category: String,
    pub priority: i32,
    pub goal: String,
    pub hint_text: String,
    pub color: String,
    pub item: String,
}

impl Default for DefaultGoalSettings {
    fn default() -> Self {
        DefaultGoalSettings {
            category: "ganon".to_string(),
            priority: 30,
            goal: "the hero".to_string(),
            hint_text: "of the hero".to_string(),
            color: "White".to_string(),
            item: goalscan_game::DEFAULT_WIN_ITEM.to_string(),
        }
    }
}

impl HintSettings {
    pub fn is_excluded_goal_item(&self, item: &str) -> bool {
        self.excluded_goal_items.iter().any(|i| i == item)
    }

    pub fn is_always_hinted(&self, location: &str) -> bool {
        self.always_hinted.iter().any(|l| l == location)
    }
}

pub fn parse_hint_settings(settings_json: &str) -> Result<HintSettings> {
    let mut des = serde_json::Deserializer::from_str(settings_json);
    let settings = serde_path_to_error::deserialize(&mut des)?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let settings = parse_hint_settings(r#"{"always_hinted": ["Ocarina of Time"]}"#).unwrap();
        assert_eq!(settings.excluded_goal_items, vec!["Triforce Piece"]);
        assert!(settings.use_default_goals);
        assert_eq!(settings.default_goal.category, "ganon");
        assert_eq!(settings.default_goal.priority, 30);
        assert!(settings.is_always_hinted("Ocarina of Time"));
        assert!(!settings.is_always_hinted("Song from Impa"));
        assert_eq!(settings.junk_ice_traps, JunkIceTraps::Normal);
    }

    #[test]
    fn test_error_names_field_path() {
        let err = parse_hint_settings(r#"{"default_goal": {"priority": "high"}}"#).unwrap_err();
        assert!(err.to_string().contains("default_goal.priority"), "{err}");
    }
}
