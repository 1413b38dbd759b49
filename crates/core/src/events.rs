//! Strategy event journal.

use alloy::primitives::{Address, U256};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StrategyEvent {
    TokenSupportUpdated { token: Address, supported: bool },
    MarketUpdated { token: Address, market: Option<Address> },
    Deposited { token: Address, amount: U256 },
    Withdrawn { token: Address, requested: U256, received: U256 },
    EmergencyWithdrawn { token: Address, amount: U256, recipient: Address },
    Halted { by: Address },
    Resumed { by: Address },
    CoordinatorUpdated { previous: Address, current: Address },
    TimelockUpdated { previous: Option<Address>, current: Option<Address> },
}

/// Append-only list of emitted events.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<StrategyEvent>,
}

impl EventLog {
    pub fn emit(&mut self, event: StrategyEvent) {
        tracing::debug!(event = ?event, "Strategy event");
        self.events.push(event);
    }

    pub fn all(&self) -> &[StrategyEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn last(&self) -> Option<&StrategyEvent> {
        self.events.last()
    }
}
