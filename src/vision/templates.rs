use crate::error::{AppError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

use super::matcher::TemplateEntry;

/// Загрузка шаблонов способностей из каталога `<spells_dir>/<class>/`
pub struct TemplateLoader;

impl TemplateLoader {
    /// Классы - подкаталоги `spells_dir`, в алфавитном порядке
    pub fn list_classes(spells_dir: &Path) -> Result<Vec<String>> {
        let mut classes = Vec::new();
        for entry in fs::read_dir(spells_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    classes.push(name.to_string());
                }
            }
        }
        classes.sort();
        Ok(classes)
    }

    /// Загрузить шаблоны класса в порядке имён файлов.
    ///
    /// Имя способности - имя файла без расширения. Файлы без привязанной
    /// клавиши пропускаются, как и файлы, которые не удалось декодировать.
    pub fn load_class(
        spells_dir: &Path,
        class: &str,
        binds: &HashMap<String, String>,
    ) -> Result<Vec<TemplateEntry>> {
        let class_dir = spells_dir.join(class);
        let files = Self::spell_files(&class_dir)?;

        if files.is_empty() {
            warn!("⚠️ Нет изображений способностей для {}", class);
            return Ok(Vec::new());
        }

        info!("🔄 Подготовка {} шаблонов...", files.len());
        let started = Instant::now();
        let mut templates = Vec::with_capacity(files.len());
        let mut unbound = Vec::new();

        for path in files {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };

            let Some(key) = binds.get(&name) else {
                unbound.push(name);
                continue;
            };

            match Self::load_entry(&path, &name, key) {
                Ok(entry) => {
                    info!("🖼️ Загружен {} -> {}", name, key);
                    templates.push(entry);
                }
                Err(e) => warn!("⚠️ {}", e),
            }
        }

        if !unbound.is_empty() {
            warn!("Без привязки клавиш ({}): {}", unbound.len(), unbound.join(", "));
        }

        info!("✅ Загружено {} шаблонов для {}", templates.len(), class);
        info!("⚡ Шаблоны подготовлены за {:.3}с", started.elapsed().as_secs_f64());
        Ok(templates)
    }

    fn spell_files(class_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(class_dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn load_entry(path: &Path, name: &str, key: &str) -> Result<TemplateEntry> {
        let image = image::open(path).map_err(|e| AppError::TemplateLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        TemplateEntry::new(name, key, image.to_luma8())
    }
}
