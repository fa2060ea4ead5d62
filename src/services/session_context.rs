use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, Ordering};

use crate::vision::CaptureRegion;

/// Состояние сессии: `Init → Active ⇄ Paused → Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Active,
    Paused,
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Init => "init",
            SessionState::Active => "active",
            SessionState::Paused => "paused",
            SessionState::Stopped => "stopped",
        };
        write!(f, "{}", name)
    }
}

const PHASE_INIT: u8 = 0;
const PHASE_RUNNING: u8 = 1;
const PHASE_STOPPED: u8 = 2;

/// SessionContext holds the state shared by the detection loop, the dispatcher
/// and the pause controller.
///
/// Responsibilities (strict):
/// - Own the pause flag and the running flag as plain atomics.
/// - Hold the top-left corner of the watched region so the positioning side can
///   move it between ticks.
/// - Do NOT make any decisions about matching, debouncing or dispatch.
///
/// Readers may observe a flag one tick late. That only delays a pause or a stop
/// by one tick interval and never produces a wrong key press.
pub struct SessionContext {
    phase: AtomicU8,
    paused: AtomicBool,
    origin_x: AtomicI32,
    origin_y: AtomicI32,
    width: u32,
    height: u32,
}

impl SessionContext {
    pub fn new(initial_region: CaptureRegion) -> Self {
        Self {
            phase: AtomicU8::new(PHASE_INIT),
            paused: AtomicBool::new(false),
            origin_x: AtomicI32::new(initial_region.x),
            origin_y: AtomicI32::new(initial_region.y),
            width: initial_region.width,
            height: initial_region.height,
        }
    }

    /// Init → Active. Возвращает false, если сессия уже запущена или остановлена.
    pub fn activate(&self) -> bool {
        self.phase
            .compare_exchange(PHASE_INIT, PHASE_RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Переход в терминальное состояние Stopped
    pub fn stop(&self) {
        self.phase.store(PHASE_STOPPED, Ordering::Release);
    }

    /// Единственный писатель флага паузы - PauseController
    pub(crate) fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    /// Сдвинуть наблюдаемую область (размер фиксирован)
    pub fn move_region(&self, x: i32, y: i32) {
        self.origin_x.store(x, Ordering::Relaxed);
        self.origin_y.store(y, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.phase.load(Ordering::Acquire) == PHASE_RUNNING
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn state(&self) -> SessionState {
        match self.phase.load(Ordering::Acquire) {
            PHASE_INIT => SessionState::Init,
            PHASE_RUNNING if self.is_paused() => SessionState::Paused,
            PHASE_RUNNING => SessionState::Active,
            _ => SessionState::Stopped,
        }
    }

    // x и y читаются раздельно: захват по позиции, устаревшей на один тик, допустим
    pub fn region(&self) -> CaptureRegion {
        CaptureRegion::new(
            self.origin_x.load(Ordering::Relaxed),
            self.origin_y.load(Ordering::Relaxed),
            self.width,
            self.height,
        )
    }
}
