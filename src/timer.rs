use std::time::Instant;

/// What a pending timer does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Present the next stimulus pair, or end the session once the sequence is exhausted
    Tick,
    /// Close whatever input windows of `tick` are still open
    AutoFill { tick: usize },
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    due: Instant,
    seq: u64,
    kind: TimerKind,
}

/// Deadline queue for one session. Timers fire in due order, ties in scheduling order.
#[derive(Debug, Default)]
pub struct Timers {
    pending: Vec<Pending>,
    next_seq: u64,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: Instant, kind: TimerKind) {
        self.pending.push(Pending {
            due,
            seq: self.next_seq,
            kind,
        });
        self.next_seq += 1;
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.pending.iter().map(|p| p.due).min()
    }

    /// Removes and returns the earliest timer due at or before `now`
    pub fn pop_due(&mut self, now: Instant) -> Option<(Instant, TimerKind)> {
        let (idx, _) = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due <= now)
            .min_by_key(|(_, p)| (p.due, p.seq))?;
        let fired = self.pending.swap_remove(idx);
        Some((fired.due, fired.kind))
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
