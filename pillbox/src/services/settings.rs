//! Settings service
//!
//! Manages application settings persistence using JSON file storage.

use crate::config::SETTINGS_FILE_NAME;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// Text size preset for list and detail screens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSize {
    Normal,
    #[default]
    Large,
    ExtraLarge,
}

impl TextSize {
    /// Multiplier applied to the base font size
    pub fn scale(self) -> f32 {
        match self {
            TextSize::Normal => 1.0,
            TextSize::Large => 1.25,
            TextSize::ExtraLarge => 1.5,
        }
    }
}

/// Display configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplaySettings {
    #[serde(default)]
    pub text_size: TextSize,
}

/// Alarm notification settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmSettings {
    /// Default for new alarms, and a global mute when false
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    /// Default for new alarms, and a global switch when false
    #[serde(default = "default_true")]
    pub vibration_enabled: bool,
    /// Whether due alarms are delivered at all
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            vibration_enabled: true,
            notifications_enabled: true,
        }
    }
}

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub display: DisplaySettings,
    #[serde(default)]
    pub alarms: AlarmSettings,
}

/// Service for managing application settings
#[derive(Clone)]
pub struct SettingsService {
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            settings_path: data_dir.join(SETTINGS_FILE_NAME),
        }
    }

    /// Load settings from disk or create default if not exists
    pub async fn load(&self) -> Result<AppSettings> {
        if !self.settings_path.exists() {
            tracing::info!("Settings file not found, creating default settings");
            let default = AppSettings::default();
            self.save(&default).await?;
            return Ok(default);
        }

        let content = fs::read_to_string(&self.settings_path).await?;
        let settings: AppSettings = serde_json::from_str(&content)
            .map_err(|e| AppError::Generic(format!("Failed to parse settings: {}", e)))?;

        Ok(settings)
    }

    /// Save settings to disk
    pub async fn save(&self, settings: &AppSettings) -> Result<()> {
        let content = serde_json::to_string_pretty(settings)?;

        fs::write(&self.settings_path, content).await?;
        tracing::info!("Settings saved to {:?}", self.settings_path);

        Ok(())
    }

    pub async fn get_display(&self) -> Result<DisplaySettings> {
        let settings = self.load().await?;
        Ok(settings.display)
    }

    pub async fn update_display(&self, display: DisplaySettings) -> Result<()> {
        let mut settings = self.load().await?;
        settings.display = display;
        self.save(&settings).await
    }

    pub async fn get_alarms(&self) -> Result<AlarmSettings> {
        let settings = self.load().await?;
        Ok(settings.alarms)
    }

    pub async fn update_alarms(&self, alarms: AlarmSettings) -> Result<()> {
        let mut settings = self.load().await?;
        settings.alarms = alarms;
        self.save(&settings).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_service() -> (SettingsService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let service = SettingsService::new(temp_dir.path().to_path_buf());
        (service, temp_dir)
    }

    #[tokio::test]
    async fn test_default_settings_created_on_load() {
        let (service, temp) = create_test_service();

        let settings = service.load().await.unwrap();

        assert_eq!(settings.display.text_size, TextSize::Large);
        assert!(settings.alarms.sound_enabled);
        assert!(settings.alarms.vibration_enabled);
        assert!(settings.alarms.notifications_enabled);
        assert!(temp.path().join(SETTINGS_FILE_NAME).exists());
    }

    #[tokio::test]
    async fn test_alarm_settings_get_and_update() {
        let (service, _temp) = create_test_service();

        let updated = AlarmSettings {
            sound_enabled: false,
            vibration_enabled: true,
            notifications_enabled: false,
        };
        service.update_alarms(updated.clone()).await.unwrap();

        let loaded = service.get_alarms().await.unwrap();
        assert_eq!(loaded, updated);
    }

    #[tokio::test]
    async fn test_settings_persistence() {
        let temp_dir = TempDir::new().unwrap();
        let data_dir = temp_dir.path().to_path_buf();

        {
            let service = SettingsService::new(data_dir.clone());
            service
                .update_display(DisplaySettings {
                    text_size: TextSize::ExtraLarge,
                })
                .await
                .unwrap();
        }

        {
            let service = SettingsService::new(data_dir);
            let display = service.get_display().await.unwrap();
            assert_eq!(display.text_size, TextSize::ExtraLarge);
        }
    }

    #[tokio::test]
    async fn test_display_preserved_after_alarm_update() {
        let (service, _temp) = create_test_service();

        service
            .update_display(DisplaySettings {
                text_size: TextSize::Normal,
            })
            .await
            .unwrap();
        service
            .update_alarms(AlarmSettings {
                sound_enabled: false,
                ..AlarmSettings::default()
            })
            .await
            .unwrap();

        let settings = service.load().await.unwrap();
        assert_eq!(settings.display.text_size, TextSize::Normal);
        assert!(!settings.alarms.sound_enabled);
    }

    #[tokio::test]
    async fn test_missing_fields_use_defaults() {
        let (service, temp) = create_test_service();
        std::fs::write(
            temp.path().join(SETTINGS_FILE_NAME),
            r#"{"alarms":{"sound_enabled":false}}"#,
        )
        .unwrap();

        let settings = service.load().await.unwrap();
        assert!(!settings.alarms.sound_enabled);
        assert!(settings.alarms.vibration_enabled);
        assert_eq!(settings.display.text_size, TextSize::Large);
    }

    #[test]
    fn test_text_size_scale() {
        assert_eq!(TextSize::Normal.scale(), 1.0);
        assert!(TextSize::ExtraLarge.scale() > TextSize::Large.scale());
    }
}
