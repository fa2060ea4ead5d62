use crate::config::Config;
use crate::debug_if_enabled;
use crate::events::Action;
use crate::services::{ActionQueue, SessionContext};
use crate::vision::{FrameSource, TemplateEntry, TemplateMatcher, UnrecognizedFrameSink};
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Подавление повторных нажатий одной и той же клавиши.
///
/// Действие выпускается, если клавиша отличается от последней выпущенной
/// или с последнего выпуска прошло не меньше `min_interval`. Состояние
/// меняется только при выпуске.
#[derive(Debug)]
pub struct Debouncer {
    min_interval: Duration,
    last_key: Option<String>,
    last_emit: Option<Instant>,
}

impl Debouncer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_key: None,
            last_emit: None,
        }
    }

    pub fn should_emit(&mut self, key: &str, now: Instant) -> bool {
        let key_changed = self.last_key.as_deref() != Some(key);
        let interval_passed = match self.last_emit {
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
            None => true,
        };

        if key_changed || interval_passed {
            self.last_key = Some(key.to_string());
            self.last_emit = Some(now);
            true
        } else {
            false
        }
    }
}

/// Интервалы цикла детекции
#[derive(Debug, Clone, Copy)]
pub struct LoopTiming {
    pub capture_interval: Duration,
    pub min_key_interval: Duration,
    pub paused_idle: Duration,
    pub stats_interval: Duration,
}

impl LoopTiming {
    pub fn from_config(config: &Config) -> Self {
        Self {
            capture_interval: config.capture_interval(),
            min_key_interval: config.min_key_interval(),
            paused_idle: config.paused_idle(),
            stats_interval: config.stats_interval(),
        }
    }
}

/// Итог одного тика
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Stopped,
    Paused,
    Throttled,
    NoFrame,
    Emitted(String),
    Suppressed(String),
    Unrecognized,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DetectionStats {
    pub frames: u64,
    pub matches: u64,
    pub emitted: u64,
    pub suppressed: u64,
    pub unrecognized: u64,
    pub capture_errors: u64,
}

impl fmt::Display for DetectionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "кадров: {}, совпадений: {}, нажатий: {}, подавлено: {}, нераспознано: {}, ошибок захвата: {}",
            self.frames, self.matches, self.emitted, self.suppressed, self.unrecognized, self.capture_errors
        )
    }
}

/// Производитель: снимает кадры, ищет шаблоны и ставит действия в очередь.
///
/// Работает в выделенном потоке до тех пор, пока сессия запущена.
/// Ошибка одного тика не останавливает цикл.
pub struct DetectionLoop {
    ctx: Arc<SessionContext>,
    queue: Arc<ActionQueue>,
    source: Box<dyn FrameSource>,
    sink: Box<dyn UnrecognizedFrameSink>,
    matcher: TemplateMatcher,
    templates: Vec<TemplateEntry>,
    debouncer: Debouncer,
    timing: LoopTiming,
    last_capture: Option<Instant>,
    capture_failing: bool,
    stats: DetectionStats,
}

impl DetectionLoop {
    pub fn new(
        ctx: Arc<SessionContext>,
        queue: Arc<ActionQueue>,
        source: Box<dyn FrameSource>,
        sink: Box<dyn UnrecognizedFrameSink>,
        matcher: TemplateMatcher,
        templates: Vec<TemplateEntry>,
        timing: LoopTiming,
    ) -> Self {
        Self {
            ctx,
            queue,
            source,
            sink,
            matcher,
            templates,
            debouncer: Debouncer::new(timing.min_key_interval),
            timing,
            last_capture: None,
            capture_failing: false,
            stats: DetectionStats::default(),
        }
    }

    #[allow(dead_code)]
    pub fn stats(&self) -> DetectionStats {
        self.stats
    }

    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if !self.ctx.is_running() {
            return TickOutcome::Stopped;
        }
        if self.ctx.is_paused() {
            return TickOutcome::Paused;
        }
        if let Some(last) = self.last_capture {
            if now.saturating_duration_since(last) < self.timing.capture_interval {
                return TickOutcome::Throttled;
            }
        }

        // засчитываем и неудачные попытки, чтобы не долбить захват
        self.last_capture = Some(now);

        let region = self.ctx.region();
        let frame = match self.source.capture(region) {
            Ok(frame) => {
                if self.capture_failing {
                    info!("Захват области {} восстановлен", region);
                    self.capture_failing = false;
                }
                frame
            }
            Err(e) => {
                self.stats.capture_errors += 1;
                if !self.capture_failing {
                    warn!("⚠️ {}", e);
                    self.capture_failing = true;
                } else {
                    debug_if_enabled!("Захват всё ещё не работает: {}", e);
                }
                return TickOutcome::NoFrame;
            }
        };
        self.stats.frames += 1;

        let result = self.matcher.match_frame(&frame, &self.templates);
        let Some(key) = result.bound_key() else {
            self.stats.unrecognized += 1;
            self.sink.submit(&frame);
            return TickOutcome::Unrecognized;
        };
        self.stats.matches += 1;

        if self.debouncer.should_emit(key, now) {
            self.queue.enqueue(Action::press_at(key, now));
            self.stats.emitted += 1;
            debug_if_enabled!("➕ В очередь: {} ({:.3})", key, result.score);
            TickOutcome::Emitted(key.to_string())
        } else {
            self.stats.suppressed += 1;
            TickOutcome::Suppressed(key.to_string())
        }
    }

    /// Крутить тики до остановки сессии
    pub fn run(mut self) -> DetectionStats {
        info!(
            "🚀 Цикл детекции запущен: {} шаблонов, порог {:.2}, захват раз в {}мс, повтор клавиши не чаще {}мс",
            self.templates.len(),
            self.matcher.threshold(),
            self.timing.capture_interval.as_millis(),
            self.timing.min_key_interval.as_millis()
        );

        let mut last_report = Instant::now();
        loop {
            let now = Instant::now();
            match self.tick(now) {
                TickOutcome::Stopped => break,
                TickOutcome::Paused => thread::sleep(self.timing.paused_idle),
                TickOutcome::Throttled => thread::yield_now(),
                _ => {}
            }

            if now.saturating_duration_since(last_report) >= self.timing.stats_interval {
                info!("📊 {}", self.stats);
                last_report = now;
            }
        }

        info!("🛑 Цикл детекции остановлен. {}", self.stats);
        self.stats
    }
}
