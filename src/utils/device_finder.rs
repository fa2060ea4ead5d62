use crate::error::{AppError, Result};
use evdev::KeyCode as EvKey;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Поиск клавиатуры для чтения хоткея паузы
pub struct DeviceFinder;

impl DeviceFinder {
    /// `auto` - автопоиск, иначе путь к устройству, который обязан существовать
    pub fn find_keyboard_device(device_path: &str) -> Result<PathBuf> {
        if device_path != "auto" {
            let path = PathBuf::from(device_path);
            return if path.exists() {
                info!("Используется указанное устройство: {:?}", path);
                Ok(path)
            } else {
                AppError::device_not_found(format!("Указанное устройство не найдено: {:?}", path))
            };
        }

        info!("Автопоиск клавиатуры...");
        if let Some(device) = Self::find_by_id() {
            info!("Найдено устройство по ID: {:?}", device);
            return Ok(device);
        }
        if let Some(device) = Self::find_by_event_devices()? {
            info!("Найдено устройство среди event: {:?}", device);
            return Ok(device);
        }

        AppError::device_not_found(
            "Не удалось найти клавиатуру. Убедитесь, что пользователь в группе 'input'",
        )
    }

    fn find_by_id() -> Option<PathBuf> {
        let entries = fs::read_dir("/dev/input/by-id").ok()?;

        let mut candidates: Vec<(PathBuf, u8)> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?.to_string();
                Self::by_id_priority(&name).map(|priority| (path, priority))
            })
            .filter(|(path, _)| Self::is_keyboard_device(path))
            .collect();

        candidates.sort_by(|a, b| b.1.cmp(&a.1));
        candidates.into_iter().next().map(|(path, _)| path)
    }

    /// Приоритет имени из /dev/input/by-id, `None` - не клавиатура
    fn by_id_priority(name: &str) -> Option<u8> {
        let lower = name.to_lowercase();
        if !lower.contains("event") || lower.contains("mouse") {
            return None;
        }
        if lower.ends_with("event-kbd") {
            Some(100)
        } else if lower.contains("keyboard") || lower.contains("kbd") {
            Some(50)
        } else {
            None
        }
    }

    fn find_by_event_devices() -> Result<Option<PathBuf>> {
        let entries = fs::read_dir("/dev/input").map_err(|e| {
            AppError::Permission(format!("Нет доступа к /dev/input: {}", e))
        })?;

        let mut event_devices: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("event"))
            })
            .collect();
        event_devices.sort();

        Ok(event_devices.into_iter().find(|path| Self::is_keyboard_device(path)))
    }

    fn is_keyboard_device(device_path: &Path) -> bool {
        let device = match evdev::Device::open(device_path) {
            Ok(device) => device,
            Err(e) => {
                debug!("Не удалось открыть {:?}: {}", device_path, e);
                return false;
            }
        };

        let name = device.name().unwrap_or("Unknown").to_lowercase();
        if ["mouse", "touchpad", "trackpoint"].iter().any(|m| name.contains(m)) {
            debug!("{:?} ({}) - не клавиатура", device_path, name);
            return false;
        }

        // цифры нужны для политики клавиш, пробел - для паузы по умолчанию
        device.supported_keys().is_some_and(|keys| {
            keys.contains(EvKey::KEY_A) && keys.contains(EvKey::KEY_SPACE) && keys.contains(EvKey::KEY_1)
        })
    }
}
