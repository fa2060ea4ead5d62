use crate::error::Result;
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use super::capture::Frame;

/// Получатель кадров, в которых не нашлось ни одного шаблона.
///
/// Ошибки сохранения не выходят наружу: цикл детекции продолжает работу.
pub trait UnrecognizedFrameSink {
    fn submit(&self, frame: &Frame);
}

/// Сохраняет кадры в `<pending_dir>/<class>/unrecognized_<время>.png`.
///
/// Время с точностью до секунды, поэтому кадры одной секунды
/// перезаписывают друг друга.
pub struct PendingDirSink {
    dir: PathBuf,
    enabled: bool,
}

impl PendingDirSink {
    pub fn new(pending_dir: &Path, class: &str, enabled: bool) -> Self {
        Self {
            dir: pending_dir.join(class),
            enabled,
        }
    }

    #[allow(dead_code)]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn save(&self, frame: &Frame) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = self.dir.join(format!("unrecognized_{}.png", timestamp));
        frame.save(&path)?;
        Ok(path)
    }

    /// Очистить каталог несохранённых кадров целиком
    pub fn clean(pending_dir: &Path) -> Result<()> {
        if pending_dir.exists() {
            fs::remove_dir_all(pending_dir)?;
        }
        fs::create_dir_all(pending_dir)?;
        info!("🗑️ Каталог {} очищен", pending_dir.display());
        Ok(())
    }
}

impl UnrecognizedFrameSink for PendingDirSink {
    fn submit(&self, frame: &Frame) {
        if !self.enabled {
            return;
        }
        if let Err(e) = self.save(frame) {
            error!("❌ Не удалось сохранить нераспознанный кадр: {}", e);
        }
    }
}
