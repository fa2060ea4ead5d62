use crate::config::PauseConfig;
use crate::error::Result;
use crate::services::PauseController;
use std::sync::Arc;

/// Слушатель горячей клавиши паузы
#[async_trait::async_trait]
pub trait HotkeyListenerTrait {
    async fn run(self: Box<Self>) -> Result<()>;
}

/// В dry-run режиме клавиатура не открывается, слушатель только эмулируется
pub fn create_hotkey_listener(
    config: &PauseConfig,
    pause: Arc<PauseController>,
    dry_run: bool,
) -> Result<Box<dyn HotkeyListenerTrait + Send>> {
    if dry_run {
        Ok(Box::new(super::dry_hotkey_listener::DryRunHotkeyListener::new(
            config, pause,
        )))
    } else {
        Ok(Box::new(super::hotkey_listener::RealHotkeyListener::new(
            config, pause,
        )?))
    }
}
