use std::collections::HashMap;
use once_cell::sync::Lazy;

/// Маппинг между именами клавиш и кодами evdev
pub struct KeycodeMap;

static KEY_NAME_TO_CODE: Lazy<HashMap<&'static str, u16>> = Lazy::new(|| {
    let mut map = HashMap::new();

    // Цифровые клавиши (верхний ряд) - основной случай для биндов способностей
    map.insert("1", 2);   // KEY_1
    map.insert("2", 3);   // KEY_2
    map.insert("3", 4);   // KEY_3
    map.insert("4", 5);   // KEY_4
    map.insert("5", 6);   // KEY_5
    map.insert("6", 7);   // KEY_6
    map.insert("7", 8);   // KEY_7
    map.insert("8", 9);   // KEY_8
    map.insert("9", 10);  // KEY_9
    map.insert("0", 11);  // KEY_0
    map.insert("-", 12);  // KEY_MINUS
    map.insert("=", 13);  // KEY_EQUAL

    // Буквенные клавиши
    map.insert("q", 16);
    map.insert("w", 17);
    map.insert("e", 18);
    map.insert("r", 19);
    map.insert("t", 20);
    map.insert("y", 21);
    map.insert("u", 22);
    map.insert("i", 23);
    map.insert("o", 24);
    map.insert("p", 25);
    map.insert("a", 30);
    map.insert("s", 31);
    map.insert("d", 32);
    map.insert("f", 33);
    map.insert("g", 34);
    map.insert("h", 35);
    map.insert("j", 36);
    map.insert("k", 37);
    map.insert("l", 38);
    map.insert("z", 44);
    map.insert("x", 45);
    map.insert("c", 46);
    map.insert("v", 47);
    map.insert("b", 48);
    map.insert("n", 49);
    map.insert("m", 50);

    // Специальные клавиши
    map.insert("space", 57);      // KEY_SPACE
    map.insert("enter", 28);      // KEY_ENTER
    map.insert("escape", 1);      // KEY_ESC
    map.insert("backspace", 14);  // KEY_BACKSPACE
    map.insert("tab", 15);        // KEY_TAB
    map.insert("pause", 119);     // KEY_PAUSE
    map.insert("f12", 88);        // KEY_F12

    // Модификаторы
    map.insert("ctrl", 29);       // KEY_LEFTCTRL
    map.insert("alt", 56);        // KEY_LEFTALT
    map.insert("shift", 42);      // KEY_LEFTSHIFT
    map.insert("super", 125);     // KEY_LEFTMETA

    // Стрелки
    map.insert("up", 103);
    map.insert("down", 108);
    map.insert("left", 105);
    map.insert("right", 106);

    map
});

static CODE_TO_KEY_NAME: Lazy<HashMap<u16, &'static str>> = Lazy::new(|| {
    KEY_NAME_TO_CODE.iter().map(|(&name, &code)| (code, name)).collect()
});

impl KeycodeMap {
    /// Получить код клавиши по её имени
    pub fn get_keycode(key_name: &str) -> Result<u16, String> {
        let normalized = key_name.trim().to_lowercase();
        KEY_NAME_TO_CODE.get(normalized.as_str())
            .copied()
            .ok_or_else(|| format!("Unknown key: {}", key_name))
    }

    /// Получить имя клавиши по её коду
    pub fn get_key_name(keycode: u16) -> Option<&'static str> {
        CODE_TO_KEY_NAME.get(&keycode).copied()
    }

    /// Одна клавиша верхнего цифрового ряда
    pub fn is_digit_key(key_name: &str) -> bool {
        key_name.len() == 1 && key_name.chars().all(|c| c.is_ascii_digit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_mapping() {
        assert_eq!(KeycodeMap::get_keycode("1").unwrap(), 2);
        assert_eq!(KeycodeMap::get_keycode("9").unwrap(), 10);
        assert_eq!(KeycodeMap::get_keycode("0").unwrap(), 11);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(KeycodeMap::get_keycode("SPACE").unwrap(), 57);
        assert_eq!(KeycodeMap::get_keycode(" q ").unwrap(), 16);
    }

    #[test]
    fn test_reverse_mapping() {
        assert_eq!(KeycodeMap::get_key_name(4), Some("3"));
        assert_eq!(KeycodeMap::get_key_name(57), Some("space"));
        assert_eq!(KeycodeMap::get_key_name(9999), None);
    }

    #[test]
    fn test_invalid_key() {
        assert!(KeycodeMap::get_keycode("invalid_key").is_err());
        assert!(KeycodeMap::get_keycode("10").is_err());
    }

    #[test]
    fn test_digit_detection() {
        assert!(KeycodeMap::is_digit_key("3"));
        assert!(KeycodeMap::is_digit_key("0"));
        assert!(!KeycodeMap::is_digit_key("10"));
        assert!(!KeycodeMap::is_digit_key(""));
        assert!(!KeycodeMap::is_digit_key("q"));
        assert!(!KeycodeMap::is_digit_key("1a"));
    }
}
