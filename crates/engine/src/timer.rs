use tracing::debug;

/// Deferred actions ordered by wall-clock due time. Every entry carries the
/// generation it was scheduled under; entries from a superseded generation
/// are discarded at fire time, never executed.
#[derive(Debug)]
pub(crate) struct TimerQueue<A> {
    entries: Vec<Entry<A>>,
    seq: u64,
}

#[derive(Debug)]
struct Entry<A> {
    due_ms: u64,
    seq: u64,
    generation: u64,
    action: A,
}

impl<A> Default for TimerQueue<A> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            seq: 0,
        }
    }
}

impl<A> TimerQueue<A> {
    pub fn schedule(&mut self, due_ms: u64, generation: u64, action: A) {
        self.seq += 1;
        self.entries.push(Entry {
            due_ms,
            seq: self.seq,
            generation,
            action,
        });
    }

    /// Remove and return every action due at `now_ms`, in (due, issue)
    /// order. Stale-generation entries are dropped silently.
    pub fn drain_due(&mut self, now_ms: u64, current_generation: u64) -> Vec<A> {
        let mut due: Vec<Entry<A>> = Vec::new();
        let mut rest: Vec<Entry<A>> = Vec::new();
        for entry in self.entries.drain(..) {
            if entry.due_ms <= now_ms {
                due.push(entry);
            } else {
                rest.push(entry);
            }
        }
        self.entries = rest;
        due.sort_by_key(|entry| (entry.due_ms, entry.seq));
        due.into_iter()
            .filter(|entry| {
                if entry.generation == current_generation {
                    true
                } else {
                    debug!(
                        entry_generation = entry.generation,
                        current_generation, "discarding stale timer"
                    );
                    false
                }
            })
            .map(|entry| entry.action)
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn next_due(&self) -> Option<u64> {
        self.entries.iter().map(|entry| entry.due_ms).min()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
