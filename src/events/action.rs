use std::fmt;
use std::time::Instant;

/// Команда нажать и отпустить одну клавишу.
///
/// Создаётся циклом детекции и живёт только внутри очереди до того,
/// как её заберёт диспетчер.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    key: String,
    enqueued_at: Instant,
}

impl Action {
    pub fn press(key: impl Into<String>) -> Self {
        Self::press_at(key, Instant::now())
    }

    pub fn press_at(key: impl Into<String>, enqueued_at: Instant) -> Self {
        Self {
            key: key.into(),
            enqueued_at,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    #[allow(dead_code)]
    pub fn enqueued_at(&self) -> Instant {
        self.enqueued_at
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "press '{}' ({}ms в очереди)",
            self.key,
            self.enqueued_at.elapsed().as_millis()
        )
    }
}
