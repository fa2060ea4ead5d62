use crate::config::PauseConfig;
use crate::error::Result;
use crate::services::PauseController;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

use super::r#trait::HotkeyListenerTrait;

pub struct DryRunHotkeyListener {
    toggle_key: String,
    pause: Arc<PauseController>,
}

impl DryRunHotkeyListener {
    pub fn new(config: &PauseConfig, pause: Arc<PauseController>) -> Self {
        info!("Инициализация DryRunHotkeyListener");
        Self {
            toggle_key: config.toggle_key.clone(),
            pause,
        }
    }

    async fn run_impl(self) -> Result<()> {
        info!(
            "Dry-run режим - клавиатура не читается, '{}' не переключает паузу",
            self.toggle_key
        );

        loop {
            sleep(Duration::from_secs(5)).await;
            debug!("HotkeyListener (dry-run): пауза = {}", self.pause.is_paused());
        }
    }
}

#[async_trait::async_trait]
impl HotkeyListenerTrait for DryRunHotkeyListener {
    async fn run(self: Box<Self>) -> Result<()> {
        (*self).run_impl().await
    }
}
