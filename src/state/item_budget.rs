//! Item cap owned by the listing walker

/// Remaining number of items the walker may launch
///
/// Only the walker loop touches the budget, so it needs no synchronization.
/// A cap of zero means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemBudget {
    cap: u64,
    remaining: u64,
    launched: u64,
}

impl ItemBudget {
    pub fn new(cap: u64) -> Self {
        Self {
            cap,
            remaining: cap,
            launched: 0,
        }
    }

    /// Returns true if the cap is disabled
    pub fn is_unlimited(&self) -> bool {
        self.cap == 0
    }

    /// Returns true if at least one more item may be launched
    pub fn has_room(&self) -> bool {
        self.is_unlimited() || self.remaining > 0
    }

    /// Claims one item; returns false when the budget is spent
    pub fn take(&mut self) -> bool {
        if !self.has_room() {
            return false;
        }
        if !self.is_unlimited() {
            self.remaining -= 1;
        }
        self.launched += 1;
        true
    }

    /// Number of items claimed so far
    pub fn launched(&self) -> u64 {
        self.launched
    }
}
