use std::fmt;
use std::time::Instant;

/// Состояние клавиши
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyState {
    Pressed,
    Released,
    Repeat,
}

impl KeyState {
    /// Значение поля `value` в событии EV_KEY
    pub fn from_event_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(KeyState::Released),
            1 => Some(KeyState::Pressed),
            2 => Some(KeyState::Repeat),
            _ => None,
        }
    }

    pub fn event_value(&self) -> i32 {
        match self {
            KeyState::Released => 0,
            KeyState::Pressed => 1,
            KeyState::Repeat => 2,
        }
    }
}

/// Код клавиши (evdev коды)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyCode(pub u16);

impl KeyCode {
    pub fn new(code: u16) -> Self {
        Self(code)
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KEY_{}", self.0)
    }
}

/// Модификаторы клавиш.
///
/// Примитив нажатия принимает их ради совместимости сигнатуры,
/// но текущий контракт нажимает только одиночную клавишу.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub super_key: bool,
}

impl Modifiers {
    pub fn none() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub fn with_ctrl(mut self, ctrl: bool) -> Self {
        self.ctrl = ctrl;
        self
    }

    #[allow(dead_code)]
    pub fn with_shift(mut self, shift: bool) -> Self {
        self.shift = shift;
        self
    }

    pub fn is_empty(&self) -> bool {
        !self.ctrl && !self.alt && !self.shift && !self.super_key
    }

    pub fn to_vec(&self) -> Vec<&'static str> {
        let mut result = Vec::new();
        if self.ctrl { result.push("ctrl"); }
        if self.alt { result.push("alt"); }
        if self.shift { result.push("shift"); }
        if self.super_key { result.push("super"); }
        result
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let modifiers = self.to_vec();
        if modifiers.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", modifiers.join("+"))
        }
    }
}

/// Событие физической клавиатуры, прочитанное слушателем хоткея
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key_code: KeyCode,
    pub state: KeyState,
    pub timestamp: Instant,
    pub device_name: String,
}

impl KeyEvent {
    pub fn new(key_code: KeyCode, state: KeyState, device_name: String) -> Self {
        Self {
            key_code,
            state,
            timestamp: Instant::now(),
            device_name,
        }
    }

    /// Первичное нажатие именно этой клавиши (автоповтор не считается)
    pub fn is_press_of(&self, key_code: KeyCode) -> bool {
        self.key_code == key_code && self.state == KeyState::Pressed
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] {:?} ({})",
            self.key_code,
            self.device_name,
            self.state,
            self.timestamp.elapsed().as_millis()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifiers_creation() {
        let modifiers = Modifiers::none().with_ctrl(true).with_shift(true);

        assert!(modifiers.ctrl);
        assert!(modifiers.shift);
        assert!(!modifiers.alt);
        assert!(!modifiers.is_empty());
        assert_eq!(modifiers.to_string(), "ctrl+shift");
        assert_eq!(Modifiers::none().to_string(), "none");
    }

    #[test]
    fn test_key_state_roundtrip_with_event_values() {
        for value in 0..3 {
            let state = KeyState::from_event_value(value).unwrap();
            assert_eq!(state.event_value(), value);
        }
        assert_eq!(KeyState::from_event_value(7), None);
    }

    #[test]
    fn test_is_press_of_ignores_repeat_and_release() {
        let space = KeyCode::new(57);
        let press = KeyEvent::new(space, KeyState::Pressed, "kbd".to_string());
        let repeat = KeyEvent::new(space, KeyState::Repeat, "kbd".to_string());
        let release = KeyEvent::new(space, KeyState::Released, "kbd".to_string());
        let other = KeyEvent::new(KeyCode::new(2), KeyState::Pressed, "kbd".to_string());

        assert!(press.is_press_of(space));
        assert!(!repeat.is_press_of(space));
        assert!(!release.is_press_of(space));
        assert!(!other.is_press_of(space));
    }
}
