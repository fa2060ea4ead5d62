use crate::app_error;
use crate::debug_if_enabled;
use crate::error::Result;
use crate::events::{KeyCode, Modifiers, VirtualKeyEvent};
use crate::services::keycode_map::KeycodeMap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

const EV_SYN: i32 = 0;
const EV_KEY: i32 = 1;
const SYN_REPORT: i32 = 0;

/// Примитив нажатия: нажать и отпустить одну клавишу.
///
/// `modifiers` принимаются ради совместимости сигнатуры и игнорируются.
pub trait KeyPresser: Send + Sync {
    fn press_key(&self, key: &str, modifiers: Modifiers) -> Result<()>;
}

/// Виртуальная клавиатура uinput, создаётся один раз на сессию
pub struct VirtualDevice {
    device: Option<Mutex<uinput::Device>>,
    device_name: String,
    dry_run: bool,
}

impl VirtualDevice {
    pub fn new(device_name: &str, dry_run: bool) -> Result<Self> {
        info!("Инициализация VirtualDevice '{}' (dry_run: {})", device_name, dry_run);

        let device = if dry_run {
            None
        } else {
            Some(Mutex::new(Self::create_virtual_device(device_name)?))
        };

        Ok(Self {
            device,
            device_name: device_name.to_string(),
            dry_run,
        })
    }

    fn create_virtual_device(device_name: &str) -> Result<uinput::Device> {
        info!("Создание виртуального устройства uinput '{}'", device_name);

        let device = uinput::default()?
            .name(device_name)?
            .event(uinput::event::Keyboard::All)?
            .create()
            .map_err(|e| app_error!(dispatch, "не удалось создать устройство '{}': {}", device_name, e))?;

        info!("Виртуальное устройство '{}' создано", device_name);
        Ok(device)
    }

    pub fn send_event(&self, event: VirtualKeyEvent) -> Result<()> {
        if self.dry_run {
            info!("[DRY RUN] {} {:?}", event.key_code, event.state);
            return Ok(());
        }

        let Some(device) = &self.device else {
            return Err(app_error!(dispatch, "виртуальное устройство недоступно"));
        };

        let keycode = event.key_code.value() as i32;
        let mut device = device.lock();
        device
            .write(EV_KEY, keycode, event.state.event_value())
            .map_err(|e| app_error!(dispatch, "событие клавиши {}: {}", keycode, e))?;
        device
            .write(EV_SYN, SYN_REPORT, 0)
            .map_err(|e| app_error!(dispatch, "синхронизация событий: {}", e))?;

        debug_if_enabled!("Виртуальное событие {} {:?} отправлено", event.key_code, event.state);
        Ok(())
    }
}

impl KeyPresser for VirtualDevice {
    fn press_key(&self, key: &str, modifiers: Modifiers) -> Result<()> {
        let code = KeycodeMap::get_keycode(key).map_err(|e| app_error!(invalid_key, "{}", e))?;
        if !modifiers.is_empty() {
            debug!("Модификаторы {} не поддерживаются и игнорируются", modifiers);
        }

        press_and_release(KeyCode::new(code), |event| self.send_event(event))?;

        if self.dry_run {
            info!("[DRY RUN] Нажата клавиша '{}'", key);
        }
        Ok(())
    }
}

/// Отпускание отправляется даже после неудачного нажатия, чтобы клавиша
/// не осталась зажатой. Возвращается первая ошибка.
fn press_and_release(
    key_code: KeyCode,
    mut send: impl FnMut(VirtualKeyEvent) -> Result<()>,
) -> Result<()> {
    let pressed = send(VirtualKeyEvent::press(key_code));
    if let Err(e) = &pressed {
        warn!("Нажатие {} не отправлено ({}), отпускаем клавишу", key_code, e);
    }
    let released = send(VirtualKeyEvent::release(key_code));
    pressed.and(released)
}

impl Drop for VirtualDevice {
    fn drop(&mut self) {
        if !self.dry_run {
            info!("Закрытие виртуального устройства '{}'", self.device_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::events::KeyState;

    #[test]
    fn dry_run_device_presses_known_keys() {
        let device = VirtualDevice::new("test keyboard", true).unwrap();
        assert!(device.press_key("3", Modifiers::none()).is_ok());
        assert!(device.press_key("space", Modifiers::none().with_ctrl(true)).is_ok());
    }

    #[test]
    fn unknown_key_is_invalid() {
        let device = VirtualDevice::new("test keyboard", true).unwrap();
        let err = device.press_key("hyper", Modifiers::none()).unwrap_err();
        assert!(matches!(err, AppError::InvalidKey(_)));
    }

    #[test]
    fn dry_run_event_does_not_need_device() {
        let device = VirtualDevice::new("test keyboard", true).unwrap();
        let event = VirtualKeyEvent::new(KeyCode::new(4), KeyState::Pressed);
        assert!(device.send_event(event).is_ok());
    }

    #[test]
    fn release_is_sent_after_failed_press() {
        let mut sent = Vec::new();
        let result = press_and_release(KeyCode::new(4), |event| {
            sent.push(event.state);
            match event.state {
                KeyState::Pressed => Err(app_error!(dispatch, "синхронизация событий: EIO")),
                _ => Ok(()),
            }
        });

        assert_eq!(sent, vec![KeyState::Pressed, KeyState::Released]);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("синхронизация"));
    }

    #[test]
    fn successful_press_sends_both_events() {
        let mut sent = Vec::new();
        press_and_release(KeyCode::new(4), |event| {
            sent.push(event.state);
            Ok(())
        })
        .unwrap();
        assert_eq!(sent, vec![KeyState::Pressed, KeyState::Released]);
    }
}
