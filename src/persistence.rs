//! JSON-файлы, которые переживают перезапуск: привязки клавиш по классам
//! и пользовательские настройки.

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use tracing::{info, warn};

/// Привязки: класс -> способность -> клавиша
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keybinds {
    classes: HashMap<String, HashMap<String, String>>,
}

impl Keybinds {
    /// Загрузить привязки.
    ///
    /// Отсутствующий или пустой файл создаётся заново, повреждённый
    /// сбрасывается в `{}` с предупреждением. Прочие ошибки чтения
    /// возвращаются, файл при этом не трогается.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) if !content.trim().is_empty() => content,
            Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
            _ => {
                info!("📝 {} не найден, создаём новый", path.display());
                let keybinds = Self::default();
                keybinds.save(path)?;
                return Ok(keybinds);
            }
        };

        match serde_json::from_str(&content) {
            Ok(keybinds) => Ok(keybinds),
            Err(e) => {
                warn!("⚠️ {} повреждён ({}), сбрасываем", path.display(), e);
                let keybinds = Self::default();
                keybinds.save(path)?;
                Ok(keybinds)
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn for_class(&self, class: &str) -> HashMap<String, String> {
        self.classes.get(class).cloned().unwrap_or_default()
    }

    #[allow(dead_code)]
    pub fn bind(&mut self, class: &str, ability: &str, key: &str) {
        self.classes
            .entry(class.to_string())
            .or_default()
            .insert(ability.to_string(), key.to_string());
    }
}

/// Пользовательские настройки, перекрывающие конфигурацию.
///
/// Незнакомые поля сохраняются как есть.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlay_position: Option<[i32; 2]>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_unrecognized: Option<bool>,

    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl Settings {
    /// Прочитать настройки, не изменяя файл.
    ///
    /// Отсутствующий или пустой файл - настройки по умолчанию, ошибка
    /// разбора возвращается как есть: файл может быть на середине записи.
    pub fn read(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Загрузка при старте: повреждённый файл перезаписывается
    /// пустыми настройками.
    pub fn load(path: &Path) -> Result<Self> {
        match Self::read(path) {
            Ok(settings) => Ok(settings),
            Err(AppError::Json(e)) => {
                warn!("⚠️ {} повреждён ({}), сбрасываем", path.display(), e);
                let settings = Self::default();
                settings.save(path)?;
                Ok(settings)
            }
            Err(e) => Err(e),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_keybinds_file_is_created_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keybinds.json");

        let keybinds = Keybinds::load(&path).unwrap();

        assert_eq!(keybinds, Keybinds::default());
        assert_eq!(fs::read_to_string(&path).unwrap().trim(), "{}");
    }

    #[test]
    fn corrupt_keybinds_are_reset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keybinds.json");
        fs::write(&path, "{ not json").unwrap();

        let keybinds = Keybinds::load(&path).unwrap();

        assert!(keybinds.for_class("mage").is_empty());
        assert_eq!(fs::read_to_string(&path).unwrap().trim(), "{}");
    }

    #[test]
    fn keybinds_are_read_per_class() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keybinds.json");
        fs::write(&path, r#"{"mage": {"frostbolt": "2", "blink": "3"}, "rogue": {}}"#).unwrap();

        let keybinds = Keybinds::load(&path).unwrap();
        let mage = keybinds.for_class("mage");

        assert_eq!(mage.get("frostbolt").map(String::as_str), Some("2"));
        assert_eq!(mage.len(), 2);
        assert!(keybinds.for_class("warrior").is_empty());
    }

    #[test]
    fn bind_then_save_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keybinds.json");

        let mut keybinds = Keybinds::default();
        keybinds.bind("mage", "frostbolt", "2");
        keybinds.save(&path).unwrap();

        let loaded = Keybinds::load(&path).unwrap();
        assert_eq!(loaded.for_class("mage").get("frostbolt").map(String::as_str), Some("2"));
    }

    #[test]
    fn settings_read_known_fields_and_keep_the_rest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"overlay_position": [640, 480], "save_unrecognized": true, "theme": "dark"}"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.overlay_position, Some([640, 480]));
        assert_eq!(settings.save_unrecognized, Some(true));

        settings.save(&path).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"theme\""));
    }

    #[test]
    fn missing_settings_are_default() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings.overlay_position, None);
        assert_eq!(settings.save_unrecognized, None);
    }

    #[test]
    fn corrupt_settings_are_reset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "[1, 2").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn half_written_settings_survive_a_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let partial = r#"{"overlay_position": [640, 48"#;
        fs::write(&path, partial).unwrap();

        assert!(Settings::read(&path).is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), partial);

        fs::write(&path, r#"{"overlay_position": [640, 480]}"#).unwrap();
        assert_eq!(Settings::read(&path).unwrap().overlay_position, Some([640, 480]));
    }

    #[test]
    fn missing_settings_read_as_default_without_creating_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");

        assert_eq!(Settings::read(&path).unwrap(), Settings::default());
        assert!(!path.exists());
    }

    #[test]
    fn unreadable_keybinds_are_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keybinds.json");
        let bytes = [0xff, 0xfe, b'{'];
        fs::write(&path, bytes).unwrap();

        assert!(Keybinds::load(&path).is_err());
        assert_eq!(fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn keybinds_path_that_is_a_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keybinds.json");
        fs::create_dir(&path).unwrap();

        assert!(Keybinds::load(&path).is_err());
        assert!(path.is_dir());
    }
}
