use crate::domain::Timestamp;

/// Burn-in gate for the replay loop.
///
/// Before the burn-in instant an event neither triggers a rebalance nor
/// records equity. Without a burn-in every event is eligible.
#[derive(Debug, Clone, Default)]
pub struct BurnInFilter {
    burn_in: Option<Timestamp>,
    events_skipped: usize,
}

impl BurnInFilter {
    pub fn new(burn_in: Option<Timestamp>) -> Self {
        Self {
            burn_in,
            events_skipped: 0,
        }
    }

    pub fn burn_in(&self) -> Option<Timestamp> {
        self.burn_in
    }

    pub fn is_eligible(&self, ts: Timestamp) -> bool {
        self.burn_in.map_or(true, |b| ts >= b)
    }

    /// [`BurnInFilter::is_eligible`], counting the events held back.
    pub fn admit(&mut self, ts: Timestamp) -> bool {
        let eligible = self.is_eligible(ts);
        if !eligible {
            self.events_skipped += 1;
        }
        eligible
    }

    pub fn events_skipped(&self) -> usize {
        self.events_skipped
    }
}
