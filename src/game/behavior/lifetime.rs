use tracing::trace;

use crate::game::entity::EntityId;
use crate::game::store::EntityStore;

/// Countdown in steps; the owner is condemned when it reaches zero
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expiry {
    pub remaining: u32,
}

impl Expiry {
    pub fn new(steps: u32) -> Self {
        Self { remaining: steps }
    }

    pub(super) fn tick(&mut self, owner: EntityId, store: &mut EntityStore) {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 && store.mark_for_removal(owner) {
            trace!("Entity {} expired", owner);
        }
    }
}
