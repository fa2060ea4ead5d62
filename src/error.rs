use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Ошибка конфигурации: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Ошибка ввода-вывода: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ошибка uinput: {0}")]
    Uinput(#[from] uinput::Error),

    #[error("Ошибка изображения: {0}")]
    Image(#[from] image::ImageError),

    #[error("Ошибка JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Не удалось загрузить шаблон {path:?}: {reason}")]
    TemplateLoad { path: PathBuf, reason: String },

    #[error("Ошибка захвата экрана: {0}")]
    Capture(String),

    #[error("Ошибка сопоставления шаблона '{template}': {reason}")]
    Match { template: String, reason: String },

    #[error("Не удалось нажать клавишу: {0}")]
    Dispatch(String),

    #[error("Недопустимая клавиша: {0}")]
    InvalidKey(String),

    #[error("Устройство не найдено: {0}")]
    DeviceNotFound(String),

    #[error("Недостаточно прав доступа: {0}")]
    Permission(String),

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),
}

impl AppError {
    pub fn device_not_found<T>(msg: impl Into<String>) -> Result<T> {
        Err(AppError::DeviceNotFound(msg.into()))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

// Удобные макросы для создания ошибок
#[macro_export]
macro_rules! app_error {
    (capture, $($arg:tt)*) => {
        $crate::error::AppError::Capture(format!($($arg)*))
    };
    (dispatch, $($arg:tt)*) => {
        $crate::error::AppError::Dispatch(format!($($arg)*))
    };
    (invalid_key, $($arg:tt)*) => {
        $crate::error::AppError::InvalidKey(format!($($arg)*))
    };
    (device_not_found, $($arg:tt)*) => {
        $crate::error::AppError::DeviceNotFound(format!($($arg)*))
    };
    (permission, $($arg:tt)*) => {
        $crate::error::AppError::Permission(format!($($arg)*))
    };
    (internal, $($arg:tt)*) => {
        $crate::error::AppError::Internal(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = app_error!(invalid_key, "'{}' не цифра", "q");
        assert_eq!(err.to_string(), "Недопустимая клавиша: 'q' не цифра");

        let err = AppError::Match {
            template: "fireball".to_string(),
            reason: "пустое изображение".to_string(),
        };
        assert!(err.to_string().contains("fireball"));
    }

    #[test]
    fn test_device_not_found_helper() {
        let result: Result<()> = AppError::device_not_found("нет клавиатуры");
        assert!(matches!(result, Err(AppError::DeviceNotFound(_))));
    }
}
