use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::services::keycode_map::KeycodeMap;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub capture: CaptureConfig,
    pub matching: MatchingConfig,
    pub detection: DetectionConfig,
    pub dispatch: DispatchConfig,
    pub pause: PauseConfig,
    pub templates: TemplatesConfig,
    pub unrecognized: UnrecognizedConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

/// Область захвата и темп опроса экрана
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    /// Минимальный интервал между захватами в активном режиме
    pub interval_ms: u64,
    /// Период ожидания на паузе (грубее, чем `interval_ms`)
    pub paused_idle_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub threshold: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Минимальный интервал повторного нажатия той же клавиши
    pub min_key_interval_ms: u64,
    /// Период строки статистики в логе
    pub stats_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub tick_ms: u64,
    /// "digits" (только цифры) или "any" (любая клавиша из таблицы кодов)
    pub key_policy: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PauseConfig {
    pub hotkey_enabled: bool,
    pub toggle_key: String,
    pub debounce_ms: u64,
    pub device_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TemplatesConfig {
    pub spells_dir: PathBuf,
    pub class: Option<String>,
    pub keybinds_path: PathBuf,
    pub settings_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UnrecognizedConfig {
    pub save: bool,
    pub pending_dir: PathBuf,
    pub clean_on_start: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            x: 100,
            y: 100,
            width: 32,
            height: 32,
            interval_ms: 100,
            paused_idle_ms: 100,
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self { threshold: 0.75 }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_key_interval_ms: 500,
            stats_interval_secs: 5,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            tick_ms: 10,
            key_policy: "digits".to_string(),
        }
    }
}

impl Default for PauseConfig {
    fn default() -> Self {
        Self {
            hotkey_enabled: true,
            toggle_key: "space".to_string(),
            debounce_ms: 500,
            device_path: "auto".to_string(),
        }
    }
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            spells_dir: PathBuf::from("spells"),
            class: None,
            keybinds_path: PathBuf::from("keybinds.json"),
            settings_path: PathBuf::from("settings.json"),
        }
    }
}

impl Default for UnrecognizedConfig {
    fn default() -> Self {
        Self {
            save: false,
            pending_dir: PathBuf::from("pending"),
            clean_on_start: true,
        }
    }
}

impl Config {
    /// Значения по умолчанию ← TOML-файл (если есть) ← переменные `ICON_*`
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("ICON_").split("__"));

        let config: Config = figment
            .extract()
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))?;

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "compact" | "full" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        if self.capture.width == 0 || self.capture.height == 0 {
            anyhow::bail!(
                "Размер области захвата должен быть больше 0: {}x{}",
                self.capture.width,
                self.capture.height
            );
        }

        if !(1..=100).contains(&self.capture.interval_ms) {
            anyhow::bail!("capture.interval_ms должно быть в диапазоне 1..=100");
        }

        if self.capture.paused_idle_ms == 0 {
            anyhow::bail!("capture.paused_idle_ms должно быть больше 0");
        }

        if self.capture.paused_idle_ms < self.capture.interval_ms {
            anyhow::bail!(
                "capture.paused_idle_ms ({}) не может быть меньше capture.interval_ms ({})",
                self.capture.paused_idle_ms,
                self.capture.interval_ms
            );
        }

        if !(self.matching.threshold > 0.0 && self.matching.threshold < 1.0) {
            anyhow::bail!(
                "matching.threshold должен быть в интервале (0, 1): {}",
                self.matching.threshold
            );
        }

        if self.detection.min_key_interval_ms == 0 {
            anyhow::bail!("detection.min_key_interval_ms должно быть больше 0");
        }

        if self.detection.stats_interval_secs == 0 {
            anyhow::bail!("detection.stats_interval_secs должно быть больше 0");
        }

        if !(1..=100).contains(&self.dispatch.tick_ms) {
            anyhow::bail!("dispatch.tick_ms должно быть в диапазоне 1..=100");
        }

        match self.dispatch.key_policy.as_str() {
            "digits" | "any" => {}
            _ => anyhow::bail!("Неизвестная политика клавиш: {}", self.dispatch.key_policy),
        }

        if KeycodeMap::get_keycode(&self.pause.toggle_key).is_err() {
            anyhow::bail!("Неизвестная клавиша паузы: {}", self.pause.toggle_key);
        }

        Ok(())
    }

    pub fn capture_interval(&self) -> Duration {
        Duration::from_millis(self.capture.interval_ms)
    }

    pub fn paused_idle(&self) -> Duration {
        Duration::from_millis(self.capture.paused_idle_ms)
    }

    pub fn min_key_interval(&self) -> Duration {
        Duration::from_millis(self.detection.min_key_interval_ms)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.detection.stats_interval_secs)
    }

    pub fn dispatch_tick(&self) -> Duration {
        Duration::from_millis(self.dispatch.tick_ms)
    }

    pub fn pause_debounce(&self) -> Duration {
        Duration::from_millis(self.pause.debounce_ms)
    }
}
