//! Host-context value records pushed by either host.

use serde::{Deserialize, Serialize};

/// Color scheme reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light color scheme.
    Light,
    /// Dark color scheme.
    Dark,
}

/// Presentation surface granted to the widget by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Embedded inline in the conversation.
    Inline,
    /// Floating picture-in-picture surface.
    Pip,
    /// Fullscreen takeover.
    Fullscreen,
}

/// Safe-area insets in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SafeAreaInsets {
    /// Top inset.
    pub top: f64,
    /// Right inset.
    pub right: f64,
    /// Bottom inset.
    pub bottom: f64,
    /// Left inset.
    pub left: f64,
}

/// Full host-context record supplied by the active host.
///
/// Immutable from the adapter's point of view; the binding replaces the whole
/// record on first-host pushes and shallow-merges updates on the second host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostContext {
    /// Active color scheme.
    pub theme: Theme,
    /// Active presentation surface.
    pub display_mode: DisplayMode,
    /// BCP 47 locale tag.
    pub locale: String,
    /// Safe-area insets of the embedding surface.
    pub safe_area: SafeAreaInsets,
    /// Maximum width granted to the widget, if constrained.
    pub max_width: Option<f64>,
    /// Maximum height granted to the widget, if constrained.
    pub max_height: Option<f64>,
}

/// Partial host-context update pushed by the second host.
///
/// Only fields present in the update replace the previous record; absent
/// fields keep their prior values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostContextUpdate {
    /// New color scheme, if changed.
    pub theme: Option<Theme>,
    /// New presentation surface, if changed.
    pub display_mode: Option<DisplayMode>,
    /// New locale tag, if changed.
    pub locale: Option<String>,
    /// New safe-area insets, if changed.
    pub safe_area: Option<SafeAreaInsets>,
    /// New maximum width, if changed.
    pub max_width: Option<f64>,
    /// New maximum height, if changed.
    pub max_height: Option<f64>,
}

impl HostContext {
    /// Returns a copy of this record with the update's present fields merged
    /// over it.
    pub fn merged(&self, update: &HostContextUpdate) -> HostContext {
        HostContext {
            theme: update.theme.unwrap_or(self.theme),
            display_mode: update.display_mode.unwrap_or(self.display_mode),
            locale: update.locale.clone().unwrap_or_else(|| self.locale.clone()),
            safe_area: update.safe_area.unwrap_or(self.safe_area),
            max_width: update.max_width.or(self.max_width),
            max_height: update.max_height.or(self.max_height),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> HostContext {
        HostContext {
            theme: Theme::Light,
            display_mode: DisplayMode::Inline,
            locale: "en-US".to_string(),
            safe_area: SafeAreaInsets::default(),
            max_width: Some(480.0),
            max_height: None,
        }
    }

    #[test]
    fn merged_replaces_only_present_fields() {
        let update = HostContextUpdate {
            theme: Some(Theme::Dark),
            max_height: Some(320.0),
            ..HostContextUpdate::default()
        };

        let merged = base().merged(&update);
        assert_eq!(merged.theme, Theme::Dark);
        assert_eq!(merged.max_height, Some(320.0));
        assert_eq!(merged.display_mode, DisplayMode::Inline);
        assert_eq!(merged.locale, "en-US");
        assert_eq!(merged.max_width, Some(480.0));
    }

    #[test]
    fn empty_update_is_identity() {
        assert_eq!(base().merged(&HostContextUpdate::default()), base());
    }

    #[test]
    fn serde_uses_lowercase_tokens() {
        let value = serde_json::to_value(Theme::Dark).expect("serialize theme");
        assert_eq!(value, serde_json::json!("dark"));
        let value = serde_json::to_value(DisplayMode::Pip).expect("serialize mode");
        assert_eq!(value, serde_json::json!("pip"));
    }
}
