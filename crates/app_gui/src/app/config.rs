//! Persisted application settings.

use directories_next::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use wildlife_core::{ClassifierConfig, DEFAULT_TOP_K};

pub(crate) const MIN_TOP_K: usize = 1;
pub(crate) const MAX_TOP_K: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppSettings {
    pub top_k: usize,
    pub model_path: PathBuf,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            model_path: ClassifierConfig::default().model_path,
        }
    }
}

impl AppSettings {
    /// Read settings from the platform config dir, falling back to defaults
    /// when the file is missing or unreadable.
    pub fn load_or_default() -> Self {
        let Some(path) = settings_path() else {
            return Self::default();
        };
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str::<Self>(&raw) {
            Ok(settings) => settings.clamped(),
            Err(e) => {
                tracing::warn!("settings file {} is invalid: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self) {
        let Some(path) = settings_path() else {
            return;
        };
        if let Some(dir) = path.parent()
            && let Err(e) = fs::create_dir_all(dir)
        {
            tracing::warn!("cannot create settings dir {}: {}", dir.display(), e);
            return;
        }
        match serde_json::to_string_pretty(self) {
            Ok(raw) => {
                if let Err(e) = fs::write(&path, raw) {
                    tracing::warn!("cannot write settings {}: {}", path.display(), e);
                }
            }
            Err(e) => tracing::warn!("cannot serialize settings: {}", e),
        }
    }

    /// Classifier configuration derived from the current settings.
    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig {
            model_path: self.model_path.clone(),
            ..ClassifierConfig::default()
        }
    }

    fn clamped(mut self) -> Self {
        self.top_k = self.top_k.clamp(MIN_TOP_K, MAX_TOP_K);
        self
    }
}

fn settings_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "Wildlens").map(|dirs| dirs.config_dir().join("settings.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn defaults_follow_the_classifier_config() {
        let settings = AppSettings::default();
        assert_eq!(settings.top_k, DEFAULT_TOP_K);
        assert_eq!(settings.model_path, PathBuf::from("models/resnet18.onnx"));
    }

    #[test]
    fn settings_roundtrip_through_json() {
        let settings = AppSettings {
            top_k: 7,
            model_path: PathBuf::from("elsewhere/model.onnx"),
        };
        let raw = serde_json::to_string(&settings).unwrap();
        let back: AppSettings = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let back: AppSettings = serde_json::from_str("{\"top_k\": 3}").unwrap();
        assert_eq!(back.top_k, 3);
        assert_eq!(back.model_path, AppSettings::default().model_path);
    }

    #[rstest]
    #[case(0, MIN_TOP_K)]
    #[case(5, 5)]
    #[case(99, MAX_TOP_K)]
    fn top_k_is_clamped(#[case] raw: usize, #[case] expected: usize) {
        let settings = AppSettings {
            top_k: raw,
            ..AppSettings::default()
        };
        assert_eq!(settings.clamped().top_k, expected);
    }
}
