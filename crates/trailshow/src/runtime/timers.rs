use std::collections::BTreeMap;
use std::time::Duration;

use super::Binding;

/// Shortest period an interval may have; a zero period would fire forever.
const MIN_PERIOD: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone)]
struct Timer {
    due: Duration,
    period: Option<Duration>,
    binding: Binding,
}

/// One-shot and repeating timers on a virtual clock.
///
/// The clock only moves when the host calls [`TimerQueue::pop_due`] /
/// [`TimerQueue::settle`], which keeps firing order deterministic: earliest
/// due time first, ties broken by creation order.
#[derive(Debug, Clone, Default)]
pub struct TimerQueue {
    now: Duration,
    next_id: u64,
    timers: BTreeMap<TimerHandle, Timer>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn set_interval(&mut self, period: Duration, binding: Binding) -> TimerHandle {
        let period = period.max(MIN_PERIOD);
        self.insert(Timer {
            due: self.now + period,
            period: Some(period),
            binding,
        })
    }

    pub fn set_timeout(&mut self, delay: Duration, binding: Binding) -> TimerHandle {
        self.insert(Timer {
            due: self.now + delay,
            period: None,
            binding,
        })
    }

    fn insert(&mut self, timer: Timer) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.timers.insert(handle, timer);
        handle
    }

    /// Cancel a timer. Returns false if it already fired (one-shot) or was
    /// cleared before.
    pub fn clear(&mut self, handle: TimerHandle) -> bool {
        self.timers.remove(&handle).is_some()
    }

    #[cfg(test)]
    pub fn is_active(&self, handle: TimerHandle) -> bool {
        self.timers.contains_key(&handle)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    #[cfg(test)]
    pub fn count_where(&self, mut pred: impl FnMut(&Binding) -> bool) -> usize {
        self.timers.values().filter(|t| pred(&t.binding)).count()
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.timers.values().map(|t| t.due).min()
    }

    /// Take the earliest timer due at or before `until`, moving the clock to
    /// its due time. Intervals are rescheduled before their binding is handed
    /// out, so a handler that clears its own interval really stops it.
    pub fn pop_due(&mut self, until: Duration) -> Option<(TimerHandle, Binding)> {
        let (&handle, timer) = self
            .timers
            .iter()
            .filter(|(_, t)| t.due <= until)
            .min_by_key(|(h, t)| (t.due, **h))?;
        let binding = timer.binding;
        let due = timer.due;
        let period = timer.period;

        self.now = self.now.max(due);
        match period {
            Some(period) => {
                if let Some(t) = self.timers.get_mut(&handle) {
                    t.due = due + period;
                }
            }
            None => {
                self.timers.remove(&handle);
            }
        }
        Some((handle, binding))
    }

    /// Move the clock forward to `until` once nothing more is due.
    pub fn settle(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }
}
