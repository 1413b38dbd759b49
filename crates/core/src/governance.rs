//! Access control and the Active/Halted run state.
//!
//! Three identities gate a strategy:
//! - **owner**: halts/resumes and performs emergency withdrawals
//! - **coordinator**: the only caller allowed to deposit and withdraw
//! - **timelock** (optional): once set, governance writes (token support,
//!   market handles, coordinator changes) must come through it, so they
//!   take effect only after the timelock delay

use crate::error::{Error, Result};
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

/// Strategy run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunState {
    #[default]
    Active,
    Halted,
}

#[derive(Debug, Clone)]
pub struct AccessControl {
    owner: Address,
    coordinator: Address,
    timelock: Option<Address>,
    state: RunState,
}

impl AccessControl {
    pub fn new(owner: Address, coordinator: Address) -> Result<Self> {
        if owner.is_zero() || coordinator.is_zero() {
            return Err(Error::InvalidAddress);
        }
        Ok(Self {
            owner,
            coordinator,
            timelock: None,
            state: RunState::Active,
        })
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn coordinator(&self) -> Address {
        self.coordinator
    }

    pub fn timelock(&self) -> Option<Address> {
        self.timelock
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_halted(&self) -> bool {
        self.state == RunState::Halted
    }

    pub fn only_owner(&self, caller: Address) -> Result<()> {
        if caller != self.owner {
            return Err(Error::UnauthorizedAccess { caller });
        }
        Ok(())
    }

    /// Timelock when configured, owner otherwise.
    pub fn only_governance(&self, caller: Address) -> Result<()> {
        let expected = self.timelock.unwrap_or(self.owner);
        if caller != expected {
            return Err(Error::UnauthorizedAccess { caller });
        }
        Ok(())
    }

    pub fn only_coordinator(&self, caller: Address) -> Result<()> {
        if caller != self.coordinator {
            return Err(Error::OnlyCoordinator { caller });
        }
        Ok(())
    }

    pub fn require_active(&self) -> Result<()> {
        match self.state {
            RunState::Active => Ok(()),
            RunState::Halted => Err(Error::Halted),
        }
    }

    pub fn require_halted(&self) -> Result<()> {
        match self.state {
            RunState::Halted => Ok(()),
            RunState::Active => Err(Error::NotHalted),
        }
    }

    pub fn halt(&mut self, caller: Address) -> Result<()> {
        self.only_owner(caller)?;
        self.require_active()?;
        self.state = RunState::Halted;
        Ok(())
    }

    pub fn resume(&mut self, caller: Address) -> Result<()> {
        self.only_owner(caller)?;
        self.require_halted()?;
        self.state = RunState::Active;
        Ok(())
    }

    /// Returns the previous coordinator.
    pub fn set_coordinator(&mut self, caller: Address, coordinator: Address) -> Result<Address> {
        self.only_governance(caller)?;
        if coordinator.is_zero() {
            return Err(Error::InvalidAddress);
        }
        if coordinator == self.coordinator {
            return Err(Error::SameCoordinator(coordinator));
        }
        Ok(std::mem::replace(&mut self.coordinator, coordinator))
    }

    /// The owner installs the first timelock; after that only the timelock
    /// can hand over to another one.
    pub fn set_timelock(&mut self, caller: Address, timelock: Address) -> Result<Option<Address>> {
        self.only_governance(caller)?;
        if timelock.is_zero() {
            return Err(Error::InvalidAddress);
        }
        if self.timelock == Some(timelock) {
            return Err(Error::SameTimelock(timelock));
        }
        Ok(self.timelock.replace(timelock))
    }

    /// Hand governance back to the owner. Only the timelock itself may do this.
    pub fn renounce_timelock(&mut self, caller: Address) -> Result<Address> {
        match self.timelock {
            Some(timelock) if timelock == caller => {
                self.timelock = None;
                Ok(timelock)
            }
            _ => Err(Error::UnauthorizedAccess { caller }),
        }
    }
}
