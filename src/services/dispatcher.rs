use crate::debug_if_enabled;
use crate::error::Result;
use crate::events::Modifiers;
use crate::services::keycode_map::KeycodeMap;
use crate::services::{ActionQueue, KeyPresser, SessionContext};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

/// Какие клавиши диспетчер согласен нажимать
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPolicy {
    /// Только цифры
    Digits,
    /// Любая клавиша из таблицы кодов
    Any,
}

impl KeyPolicy {
    pub fn from_config(value: &str) -> Result<Self> {
        match value {
            "digits" => Ok(KeyPolicy::Digits),
            "any" => Ok(KeyPolicy::Any),
            other => Err(crate::app_error!(internal, "неизвестная политика клавиш: {}", other)),
        }
    }

    pub fn accepts(&self, key: &str) -> bool {
        match self {
            KeyPolicy::Digits => KeycodeMap::is_digit_key(key),
            KeyPolicy::Any => KeycodeMap::get_keycode(key).is_ok(),
        }
    }
}

/// Итог одного тика диспетчера
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub pressed: usize,
    pub discarded: usize,
    pub rejected: usize,
    pub failed: usize,
}

impl DispatchReport {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Потребитель очереди действий.
///
/// На каждом тике забирает всё накопленное и нажимает клавиши по порядку.
/// На паузе действия выбрасываются, ошибка одного нажатия не прерывает
/// обработку остальных.
pub struct ActionDispatcher {
    ctx: Arc<SessionContext>,
    queue: Arc<ActionQueue>,
    presser: Arc<dyn KeyPresser>,
    policy: KeyPolicy,
}

impl ActionDispatcher {
    pub fn new(
        ctx: Arc<SessionContext>,
        queue: Arc<ActionQueue>,
        presser: Arc<dyn KeyPresser>,
        policy: KeyPolicy,
    ) -> Self {
        Self {
            ctx,
            queue,
            presser,
            policy,
        }
    }

    pub fn tick(&self) -> DispatchReport {
        let mut report = DispatchReport::default();

        for action in self.queue.drain_all() {
            // флаг читается на каждое действие: пауза посреди пачки сбрасывает остаток
            if self.ctx.is_paused() {
                report.discarded += 1;
                continue;
            }

            if !self.policy.accepts(action.key()) {
                warn!("🚫 Клавиша '{}' отклонена политикой {:?}", action.key(), self.policy);
                report.rejected += 1;
                continue;
            }

            match self.presser.press_key(action.key(), Modifiers::none()) {
                Ok(()) => {
                    debug_if_enabled!("⌨️ {}", action);
                    report.pressed += 1;
                }
                Err(e) => {
                    error!("❌ Не удалось нажать '{}': {}", action.key(), e);
                    report.failed += 1;
                }
            }
        }

        if report.discarded > 0 {
            debug_if_enabled!("⏸️ Пауза: выброшено {} действий", report.discarded);
        }
        report
    }

    /// Тикать с периодом `period`, пока сессия запущена
    pub async fn run(self, period: Duration) {
        info!("🎯 Диспетчер запущен, тик {}мс", period.as_millis());

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut total = DispatchReport::default();
        loop {
            ticker.tick().await;
            if !self.ctx.is_running() {
                break;
            }

            let report = self.tick();
            total.pressed += report.pressed;
            total.discarded += report.discarded;
            total.rejected += report.rejected;
            total.failed += report.failed;
        }

        info!(
            "🛑 Диспетчер остановлен: нажато {}, выброшено {}, отклонено {}, ошибок {}",
            total.pressed, total.discarded, total.rejected, total.failed
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_error;
    use crate::events::Action;
    use crate::services::PauseController;
    use crate::vision::CaptureRegion;
    use parking_lot::Mutex;

    /// Запоминает нажатия, может падать на заданной клавише
    #[derive(Default)]
    struct RecordingPresser {
        pressed: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl KeyPresser for RecordingPresser {
        fn press_key(&self, key: &str, _modifiers: Modifiers) -> Result<()> {
            if self.fail_on == Some(key) {
                return Err(app_error!(dispatch, "устройство занято"));
            }
            self.pressed.lock().push(key.to_string());
            Ok(())
        }
    }

    fn setup(presser: Arc<RecordingPresser>, policy: KeyPolicy) -> (Arc<SessionContext>, Arc<ActionQueue>, ActionDispatcher) {
        let ctx = Arc::new(SessionContext::new(CaptureRegion::new(0, 0, 32, 32)));
        ctx.activate();
        let queue = Arc::new(ActionQueue::new());
        let dispatcher = ActionDispatcher::new(ctx.clone(), queue.clone(), presser, policy);
        (ctx, queue, dispatcher)
    }

    #[test]
    fn enqueued_digit_is_pressed_exactly_once() {
        let presser = Arc::new(RecordingPresser::default());
        let (_, queue, dispatcher) = setup(presser.clone(), KeyPolicy::Digits);

        queue.enqueue(Action::press("3"));
        let report = dispatcher.tick();

        assert_eq!(report.pressed, 1);
        assert_eq!(*presser.pressed.lock(), vec!["3"]);
        assert!(queue.is_empty());

        assert!(dispatcher.tick().is_empty());
        assert_eq!(presser.pressed.lock().len(), 1);
    }

    /// Ставит паузу сразу после первого нажатия
    struct PausingPresser {
        pause: PauseController,
        pressed: Mutex<Vec<String>>,
    }

    impl KeyPresser for PausingPresser {
        fn press_key(&self, key: &str, _modifiers: Modifiers) -> Result<()> {
            let mut pressed = self.pressed.lock();
            pressed.push(key.to_string());
            if pressed.len() == 1 {
                self.pause.toggle();
            }
            Ok(())
        }
    }

    #[test]
    fn pause_mid_drain_discards_rest_of_batch() {
        let ctx = Arc::new(SessionContext::new(CaptureRegion::new(0, 0, 32, 32)));
        ctx.activate();
        let queue = Arc::new(ActionQueue::new());
        let presser = Arc::new(PausingPresser {
            pause: PauseController::new(ctx.clone(), Duration::from_millis(500)),
            pressed: Mutex::new(Vec::new()),
        });
        let dispatcher = ActionDispatcher::new(ctx.clone(), queue.clone(), presser.clone(), KeyPolicy::Digits);

        for key in ["1", "2", "3"] {
            queue.enqueue(Action::press(key));
        }
        let report = dispatcher.tick();

        assert!(ctx.is_paused());
        assert_eq!(report.pressed, 1);
        assert_eq!(report.discarded, 2);
        assert_eq!(*presser.pressed.lock(), vec!["1"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn paused_dispatcher_discards_without_pressing() {
        let presser = Arc::new(RecordingPresser::default());
        let (ctx, queue, dispatcher) = setup(presser.clone(), KeyPolicy::Digits);
        PauseController::new(ctx, Duration::from_millis(500)).toggle();

        queue.enqueue(Action::press("1"));
        queue.enqueue(Action::press("2"));
        let report = dispatcher.tick();

        assert_eq!(report.discarded, 2);
        assert!(presser.pressed.lock().is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn non_digit_is_rejected_under_digit_policy() {
        let presser = Arc::new(RecordingPresser::default());
        let (_, queue, dispatcher) = setup(presser.clone(), KeyPolicy::Digits);

        queue.enqueue(Action::press("q"));
        queue.enqueue(Action::press("12"));
        queue.enqueue(Action::press("5"));
        let report = dispatcher.tick();

        assert_eq!(report.rejected, 2);
        assert_eq!(*presser.pressed.lock(), vec!["5"]);
    }

    #[test]
    fn any_policy_accepts_known_names_only() {
        assert!(KeyPolicy::Any.accepts("q"));
        assert!(KeyPolicy::Any.accepts("7"));
        assert!(!KeyPolicy::Any.accepts("hyper"));
        assert!(KeyPolicy::from_config("bogus").is_err());
    }

    #[test]
    fn failed_press_does_not_abort_drain() {
        let presser = Arc::new(RecordingPresser {
            fail_on: Some("2"),
            ..Default::default()
        });
        let (_, queue, dispatcher) = setup(presser.clone(), KeyPolicy::Digits);

        for key in ["1", "2", "3"] {
            queue.enqueue(Action::press(key));
        }
        let report = dispatcher.tick();

        assert_eq!(report.failed, 1);
        assert_eq!(*presser.pressed.lock(), vec!["1", "3"]);
    }

    #[tokio::test]
    async fn run_presses_queued_keys_and_stops_with_session() {
        let presser = Arc::new(RecordingPresser::default());
        let (ctx, queue, dispatcher) = setup(presser.clone(), KeyPolicy::Digits);
        queue.enqueue(Action::press("4"));

        let handle = tokio::spawn(dispatcher.run(Duration::from_millis(2)));
        tokio::time::sleep(Duration::from_millis(30)).await;
        ctx.stop();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("диспетчер не остановился")
            .unwrap();
        assert_eq!(*presser.pressed.lock(), vec!["4"]);
    }
}
