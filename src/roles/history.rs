use super::Role;
use std::collections::HashMap;
use std::collections::VecDeque;

/// Default rolling-window capacity for past role assignments.
pub const DEFAULT_CAPACITY: usize = 100;

/// Bounded ring buffer of past role assignments for ONE session.
///
/// The rebalancing rule in the decision engine reads the distribution of this
/// buffer. It must never be shared across sessions: mixing users' histories
/// would leak one user's rebalancing signal into another's decisions.
#[derive(Debug, Clone)]
pub struct RoleHistory {
    entries: VecDeque<Role>,
    capacity: usize,
}

impl Default for RoleHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RoleHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    /// Append a role, dropping the oldest entry once at capacity.
    pub fn push(&mut self, role: Role) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(role);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fraction of history entries assigned to `role`. Zero when empty.
    pub fn share(&self, role: Role) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        let count = self.entries.iter().filter(|r| **r == role).count();
        count as f64 / self.entries.len() as f64
    }

    /// Share per role; an empty history reads as a uniform 0.25 split so the
    /// rebalancing rule stays inert until real data exists.
    pub fn distribution(&self) -> HashMap<Role, f64> {
        if self.entries.is_empty() {
            return Role::ALL.iter().map(|r| (*r, 0.25)).collect();
        }
        Role::ALL.iter().map(|r| (*r, self.share(*r))).collect()
    }

    /// The role with the smallest share, ties resolved in priority order.
    pub fn least_represented(&self) -> (Role, f64) {
        let mut best = (Role::Producer, f64::MAX);
        for role in Role::ALL {
            let share = self.share(role);
            if share < best.1 {
                best = (role, share);
            }
        }
        best
    }
}
