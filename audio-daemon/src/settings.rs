//! Daemon settings

use std::path::PathBuf;

use audio_link::LinkConfig;
use audio_sim::VirtualPeripheralConfig;
use serde::{Deserialize, Serialize};

/// Virtual peripheral the daemon talks to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeripheralSettings {
    /// Delay before the peripheral answers a request
    #[serde(default = "default_reply_delay")]
    pub reply_delay_ms: u64,
    /// Sends refused while the peripheral is still coming up
    #[serde(default)]
    pub boot_failures: u32,
    /// State the peripheral reports before anything is set
    #[serde(default)]
    pub initial: VirtualPeripheralConfig,
}

fn default_reply_delay() -> u64 {
    20
}

impl Default for PeripheralSettings {
    fn default() -> Self {
        Self {
            reply_delay_ms: default_reply_delay(),
            boot_failures: 2,
            initial: VirtualPeripheralConfig::default(),
        }
    }
}

/// Daemon settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Link configuration
    #[serde(default)]
    pub link: LinkConfig,
    /// Tracing filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub peripheral: PeripheralSettings,
}

fn default_log_filter() -> String {
    "audiolinkd=info,audio_link=info,audio_protocol=info,audio_sim=info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            link: LinkConfig::default(),
            log_filter: default_log_filter(),
            peripheral: PeripheralSettings::default(),
        }
    }
}

impl Settings {
    /// Get the XDG config directory for audiolink
    /// Uses $XDG_CONFIG_HOME/audiolink, falls back to ~/.config/audiolink
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("audiolink"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("audiolink"))
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::settings_path()
            .and_then(|path| std::fs::read_to_string(path).ok())
            .map(|s| Self::from_json(&s))
            .unwrap_or_default()
    }

    /// Parse settings, falling back to defaults if the text is malformed
    pub fn from_json(text: &str) -> Self {
        serde_json::from_str(text).unwrap_or_default()
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<(), String> {
        let path =
            Self::settings_path().ok_or_else(|| "Could not determine settings path".to_string())?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create settings directory: {}", e))?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        std::fs::write(&path, json).map_err(|e| format!("Failed to write settings: {}", e))?;

        Ok(())
    }
}
