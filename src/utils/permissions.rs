use crate::error::{AppError, Result};
use std::fs::{self, OpenOptions};
use std::path::Path;
use tracing::{info, warn};

const INPUT_DIR: &str = "/dev/input";
const UINPUT_DEVICE: &str = "/dev/uinput";

/// Проверить доступ к устройствам ввода.
///
/// `/dev/uinput` нужен всегда. Без доступа к `/dev/input` работает всё,
/// кроме хоткея паузы, поэтому это только предупреждение.
/// Возвращает, доступен ли `/dev/input` для хоткея.
pub fn check_permissions(need_input: bool) -> Result<bool> {
    check_permissions_at(Path::new(INPUT_DIR), Path::new(UINPUT_DEVICE), need_input)
}

fn check_permissions_at(input_dir: &Path, uinput: &Path, need_input: bool) -> Result<bool> {
    info!("Проверка прав доступа...");

    check_uinput_access(uinput)?;

    let input_ok = if need_input {
        match check_input_devices_access(input_dir) {
            Ok(()) => true,
            Err(e) => {
                warn!("⚠️ {}. Хоткей паузы будет отключён", e);
                false
            }
        }
    } else {
        false
    };
    check_not_root();

    info!("Проверка прав доступа завершена");
    Ok(input_ok)
}

fn check_input_devices_access(input_dir: &Path) -> Result<()> {
    if !input_dir.exists() {
        return Err(AppError::Permission(format!(
            "Директория {} не существует",
            input_dir.display()
        )));
    }

    fs::read_dir(input_dir).map_err(|e| {
        AppError::Permission(format!(
            "Нет доступа к {}: {}. Добавьте пользователя в группу 'input'",
            input_dir.display(),
            e
        ))
    })?;

    info!("Доступ к {} подтвержден", input_dir.display());
    Ok(())
}

fn check_uinput_access(uinput: &Path) -> Result<()> {
    if !uinput.exists() {
        return Err(AppError::Permission(format!(
            "{} не существует, загрузите модуль: sudo modprobe uinput",
            uinput.display()
        )));
    }

    OpenOptions::new().write(true).open(uinput).map_err(|e| {
        AppError::Permission(format!(
            "Нет прав на запись в {}: {}. Добавьте пользователя в группу 'uinput' или 'input'",
            uinput.display(),
            e
        ))
    })?;

    info!("Доступ к {} подтвержден", uinput.display());
    Ok(())
}

fn check_not_root() {
    match std::env::var("USER") {
        Ok(user) if user == "root" => {
            warn!("⚠️  Приложение запущено от имени root!");
            warn!("   Лучше добавить пользователя в группы 'input' и 'uinput':");
            warn!("   sudo usermod -a -G input,uinput $USER");
        }
        Ok(user) => info!("Приложение запущено от имени пользователя: {}", user),
        Err(_) => warn!("Не удалось определить пользователя"),
    }
}
