use crate::services::SessionContext;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Единственный владелец флага паузы.
///
/// Переключение в пределах `debounce` от предыдущего успешного
/// переключения отклоняется: одно физическое нажатие не должно
/// порождать несколько логических.
pub struct PauseController {
    ctx: Arc<SessionContext>,
    debounce: Duration,
    last_toggle: Mutex<Option<Instant>>,
}

impl PauseController {
    pub fn new(ctx: Arc<SessionContext>, debounce: Duration) -> Self {
        Self {
            ctx,
            debounce,
            last_toggle: Mutex::new(None),
        }
    }

    /// Переключить паузу. Возвращает true, если переключение применено.
    pub fn toggle(&self) -> bool {
        self.toggle_at(Instant::now())
    }

    pub fn toggle_at(&self, now: Instant) -> bool {
        let mut last_toggle = self.last_toggle.lock();

        if let Some(previous) = *last_toggle {
            if now.saturating_duration_since(previous) <= self.debounce {
                debug!(
                    "Переключение паузы отклонено: прошло {}мс из {}мс",
                    now.saturating_duration_since(previous).as_millis(),
                    self.debounce.as_millis()
                );
                return false;
            }
        }

        let paused = !self.ctx.is_paused();
        self.ctx.set_paused(paused);
        *last_toggle = Some(now);

        info!("⏯️ {}", if paused { "Пауза" } else { "Работаем" });
        true
    }

    pub fn is_paused(&self) -> bool {
        self.ctx.is_paused()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::CaptureRegion;

    fn controller() -> (Arc<SessionContext>, PauseController) {
        let ctx = Arc::new(SessionContext::new(CaptureRegion::new(0, 0, 32, 32)));
        ctx.activate();
        let controller = PauseController::new(ctx.clone(), Duration::from_millis(500));
        (ctx, controller)
    }

    #[test]
    fn first_toggle_applies() {
        let (ctx, controller) = controller();
        assert!(controller.toggle_at(Instant::now()));
        assert!(ctx.is_paused());
        assert!(controller.is_paused());
    }

    #[test]
    fn toggles_inside_debounce_window_leave_flag_unchanged() {
        let (ctx, controller) = controller();
        let t0 = Instant::now();
        assert!(controller.toggle_at(t0));
        let before = ctx.is_paused();

        assert!(!controller.toggle_at(t0 + Duration::from_millis(100)));
        assert!(!controller.toggle_at(t0 + Duration::from_millis(300)));
        assert_eq!(ctx.is_paused(), before);
    }

    #[test]
    fn rejected_toggle_does_not_extend_window() {
        let (ctx, controller) = controller();
        let t0 = Instant::now();
        assert!(controller.toggle_at(t0));
        assert!(!controller.toggle_at(t0 + Duration::from_millis(400)));

        // окно отсчитывается от последнего успешного переключения
        assert!(controller.toggle_at(t0 + Duration::from_millis(600)));
        assert!(!ctx.is_paused());
    }

    #[test]
    fn toggle_exactly_at_window_edge_is_rejected() {
        let (_, controller) = controller();
        let t0 = Instant::now();
        assert!(controller.toggle_at(t0));
        assert!(!controller.toggle_at(t0 + Duration::from_millis(500)));
        assert!(controller.toggle_at(t0 + Duration::from_millis(501)));
    }
}
