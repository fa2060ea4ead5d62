use crate::app_error;
use crate::config::PauseConfig;
use crate::debug_if_enabled;
use crate::error::{AppError, Result};
use crate::events::{KeyCode, KeyEvent, KeyState};
use crate::services::keycode_map::KeycodeMap;
use crate::services::PauseController;
use crate::utils::DeviceFinder;
use evdev::{Device, EventType, InputEvent};
use std::sync::Arc;
use tracing::{error, info};

use super::r#trait::HotkeyListenerTrait;

/// Читает события физической клавиатуры и переключает паузу.
///
/// Устройство не захватывается: нажатия доходят до остальных приложений.
pub struct RealHotkeyListener {
    device: Device,
    device_name: String,
    toggle: KeyCode,
    pause: Arc<PauseController>,
}

impl RealHotkeyListener {
    pub fn new(config: &PauseConfig, pause: Arc<PauseController>) -> Result<Self> {
        info!("Инициализация RealHotkeyListener");

        let toggle = KeycodeMap::get_keycode(&config.toggle_key)
            .map(KeyCode::new)
            .map_err(|e| app_error!(invalid_key, "{}", e))?;

        let device_path = DeviceFinder::find_keyboard_device(&config.device_path)?;
        let device = Device::open(&device_path).map_err(|e| {
            AppError::DeviceNotFound(format!(
                "Не удалось открыть устройство {:?}: {}",
                device_path, e
            ))
        })?;
        let device_name = device.name().unwrap_or("Unknown").to_string();

        info!(
            "Пауза по клавише '{}' с устройства {} ({:?})",
            config.toggle_key, device_name, device_path
        );

        Ok(Self {
            device,
            device_name,
            toggle,
            pause,
        })
    }

    async fn run_impl(self) -> Result<()> {
        let Self {
            device,
            device_name,
            toggle,
            pause,
        } = self;

        let mut events = device.into_event_stream()?;
        info!(
            "RealHotkeyListener запущен, ждём '{}' ({})",
            KeycodeMap::get_key_name(toggle.value()).unwrap_or("?"),
            toggle
        );

        loop {
            let event = match events.next_event().await {
                Ok(event) => event,
                Err(e) => {
                    error!("Ошибка чтения событий клавиатуры: {}", e);
                    return Err(AppError::Io(e));
                }
            };

            let Some(key_event) = to_key_event(&event, &device_name) else {
                continue;
            };

            if key_event.is_press_of(toggle) {
                debug_if_enabled!("Хоткей паузы: {}", key_event);
                pause.toggle();
            }
        }
    }
}

/// Событие EV_KEY с известным состоянием, остальное отбрасывается
fn to_key_event(event: &InputEvent, device_name: &str) -> Option<KeyEvent> {
    if event.event_type() != EventType::KEY {
        return None;
    }
    let state = KeyState::from_event_value(event.value())?;
    Some(KeyEvent::new(KeyCode::new(event.code()), state, device_name.to_string()))
}

#[async_trait::async_trait]
impl HotkeyListenerTrait for RealHotkeyListener {
    async fn run(self: Box<Self>) -> Result<()> {
        (*self).run_impl().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_events_are_converted() {
        let raw = InputEvent::new(EventType::KEY.0, 57, 1);
        let event = to_key_event(&raw, "kbd").unwrap();

        assert_eq!(event.key_code, KeyCode::new(57));
        assert_eq!(event.state, KeyState::Pressed);
        assert!(event.is_press_of(KeyCode::new(57)));
    }

    #[test]
    fn repeats_are_not_toggle_presses() {
        let raw = InputEvent::new(EventType::KEY.0, 57, 2);
        let event = to_key_event(&raw, "kbd").unwrap();
        assert!(!event.is_press_of(KeyCode::new(57)));
    }

    #[test]
    fn non_key_events_are_dropped() {
        let sync = InputEvent::new(EventType::SYNCHRONIZATION.0, 0, 0);
        assert!(to_key_event(&sync, "kbd").is_none());

        let odd_value = InputEvent::new(EventType::KEY.0, 57, 9);
        assert!(to_key_event(&odd_value, "kbd").is_none());
    }
}
