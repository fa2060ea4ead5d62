use crate::events::Action;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Неограниченная потокобезопасная FIFO-очередь действий.
///
/// `enqueue` не блокируется дольше короткой критической секции,
/// `drain_all` забирает всё содержимое за один захват блокировки.
#[derive(Debug, Default)]
pub struct ActionQueue {
    inner: Mutex<VecDeque<Action>>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, action: Action) {
        self.inner.lock().push_back(action);
    }

    /// Атомарно извлечь все накопленные действия в порядке поступления
    pub fn drain_all(&self) -> Vec<Action> {
        let drained = std::mem::take(&mut *self.inner.lock());
        drained.into()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn drain_returns_fifo_order_and_empties_queue() {
        let queue = ActionQueue::new();
        queue.enqueue(Action::press("1"));
        queue.enqueue(Action::press("2"));
        queue.enqueue(Action::press("3"));

        let keys: Vec<String> = queue.drain_all().iter().map(|a| a.key().to_string()).collect();
        assert_eq!(keys, vec!["1", "2", "3"]);
        assert!(queue.is_empty());
        assert!(queue.drain_all().is_empty());
    }

    #[test]
    fn concurrent_producers_lose_nothing() {
        let queue = Arc::new(ActionQueue::new());
        let producers: Vec<_> = (0..4)
            .map(|p| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for i in 0..250 {
                        queue.enqueue(Action::press(format!("{}", (p + i) % 10)));
                    }
                })
            })
            .collect();

        let mut collected = Vec::new();
        for producer in producers {
            producer.join().unwrap();
        }
        collected.extend(queue.drain_all());

        assert_eq!(collected.len(), 1000);
        assert!(queue.is_empty());
    }

    #[test]
    fn per_producer_order_is_preserved() {
        let queue = Arc::new(ActionQueue::new());
        let producer = {
            let queue = queue.clone();
            thread::spawn(move || {
                for i in 0..100 {
                    queue.enqueue(Action::press(i.to_string()));
                }
            })
        };

        let mut seen = Vec::new();
        while seen.len() < 100 {
            seen.extend(queue.drain_all().into_iter().map(|a| a.key().parse::<u32>().unwrap()));
        }
        producer.join().unwrap();

        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }
}
