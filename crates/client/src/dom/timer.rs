//! Virtual timer queue.
//!
//! Time only moves when [`Document::advance`](super::Document::advance) is
//! called, which makes hover delays and blur timeouts deterministic.

use super::Document;

pub type TimerCallback = Box<dyn FnOnce(&Document)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

struct PendingTimer {
    id: TimerId,
    due: u64,
    callback: TimerCallback,
}

#[derive(Default)]
pub(super) struct TimerQueue {
    now: u64,
    next_id: u64,
    pending: Vec<PendingTimer>,
}

impl TimerQueue {
    pub(super) const fn now(&self) -> u64 {
        self.now
    }

    pub(super) fn len(&self) -> usize {
        self.pending.len()
    }

    pub(super) fn schedule(&mut self, delay_ms: u64, callback: TimerCallback) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.pending.push(PendingTimer {
            id,
            due: self.now.saturating_add(delay_ms),
            callback,
        });
        id
    }

    pub(super) fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|timer| timer.id != id);
        self.pending.len() != before
    }

    /// Remove the earliest timer due at or before `deadline` and move the
    /// clock to its due time.
    pub(super) fn pop_due(&mut self, deadline: u64) -> Option<TimerCallback> {
        let index = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, timer)| timer.due <= deadline)
            .min_by_key(|(_, timer)| (timer.due, timer.id))
            .map(|(index, _)| index)?;
        let timer = self.pending.swap_remove(index);
        self.now = self.now.max(timer.due);
        Some(timer.callback)
    }

    pub(super) fn set_now(&mut self, now: u64) {
        self.now = self.now.max(now);
    }
}
