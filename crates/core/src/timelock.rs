//! Delay queue for governance writes.
//!
//! A governance call is scheduled with an ETA of `now + min_delay` and can be
//! taken out of the queue only once that time has passed. The released call
//! is then applied to the strategy with the timelock's address as caller.

use crate::error::{Error, Result};
use alloy::primitives::{keccak256, Address, B256};
use std::collections::HashMap;
use tracing::info;

/// Governance writes that go through the timelock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GovernanceCall {
    AddSupportedToken { token: Address },
    RemoveSupportedToken { token: Address },
    SetMarket { token: Address, market: Option<Address> },
    SetCoordinator { coordinator: Address },
    SetTimelock { timelock: Address },
    RenounceTimelock,
}

impl GovernanceCall {
    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Self::AddSupportedToken { token } => {
                out.push(0);
                out.extend_from_slice(token.as_slice());
            }
            Self::RemoveSupportedToken { token } => {
                out.push(1);
                out.extend_from_slice(token.as_slice());
            }
            Self::SetMarket { token, market } => {
                out.push(2);
                out.extend_from_slice(token.as_slice());
                out.extend_from_slice(market.unwrap_or(Address::ZERO).as_slice());
            }
            Self::SetCoordinator { coordinator } => {
                out.push(3);
                out.extend_from_slice(coordinator.as_slice());
            }
            Self::SetTimelock { timelock } => {
                out.push(4);
                out.extend_from_slice(timelock.as_slice());
            }
            Self::RenounceTimelock => out.push(5),
        }
    }
}

/// Operation id: keccak256(target ‖ call ‖ salt).
pub fn operation_id(target: Address, call: &GovernanceCall, salt: B256) -> B256 {
    let mut buf = Vec::with_capacity(20 + 41 + 32);
    buf.extend_from_slice(target.as_slice());
    call.encode(&mut buf);
    buf.extend_from_slice(salt.as_slice());
    keccak256(buf)
}

#[derive(Debug, Clone)]
struct Scheduled {
    target: Address,
    call: GovernanceCall,
    eta: u64,
}

#[derive(Debug)]
pub struct Timelock {
    address: Address,
    min_delay: u64,
    queue: HashMap<B256, Scheduled>,
}

impl Timelock {
    pub fn new(address: Address, min_delay: u64) -> Result<Self> {
        if address.is_zero() {
            return Err(Error::InvalidAddress);
        }
        Ok(Self {
            address,
            min_delay,
            queue: HashMap::new(),
        })
    }

    /// The identity the strategy sees as caller.
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn min_delay(&self) -> u64 {
        self.min_delay
    }

    pub fn schedule(
        &mut self,
        target: Address,
        call: GovernanceCall,
        salt: B256,
        now: u64,
    ) -> Result<B256> {
        let id = operation_id(target, &call, salt);
        if self.queue.contains_key(&id) {
            return Err(Error::TimelockOperationExists(id));
        }
        let eta = now.saturating_add(self.min_delay);
        info!(id = %id, target = %target, call = ?call, eta, "Governance call scheduled");
        self.queue.insert(id, Scheduled { target, call, eta });
        Ok(id)
    }

    pub fn eta(&self, id: &B256) -> Option<u64> {
        self.queue.get(id).map(|s| s.eta)
    }

    pub fn is_ready(&self, id: &B256, now: u64) -> bool {
        self.eta(id).is_some_and(|eta| now >= eta)
    }

    pub fn cancel(&mut self, id: B256) -> Result<()> {
        self.queue
            .remove(&id)
            .map(|_| info!(id = %id, "Governance call cancelled"))
            .ok_or(Error::TimelockOperationUnknown(id))
    }

    /// Release a matured call for execution against its target.
    pub fn execute(&mut self, id: B256, now: u64) -> Result<(Address, GovernanceCall)> {
        let scheduled = self.queue.get(&id).ok_or(Error::TimelockOperationUnknown(id))?;
        if now < scheduled.eta {
            return Err(Error::TimelockNotReady { id, eta: scheduled.eta });
        }
        let scheduled = self.queue.remove(&id).ok_or(Error::TimelockOperationUnknown(id))?;
        info!(id = %id, target = %scheduled.target, "Governance call released");
        Ok((scheduled.target, scheduled.call))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: u64 = 2 * 24 * 3600;

    fn timelock() -> Timelock {
        Timelock::new(Address::repeat_byte(0x7a), DELAY).unwrap()
    }

    #[test]
    fn test_execute_waits_for_delay() {
        let mut tl = timelock();
        let target = Address::repeat_byte(0x11);
        let call = GovernanceCall::SetCoordinator {
            coordinator: Address::repeat_byte(0x22),
        };

        let id = tl.schedule(target, call.clone(), B256::ZERO, 1_000).unwrap();
        assert_eq!(tl.eta(&id), Some(1_000 + DELAY));
        assert!(!tl.is_ready(&id, 1_000 + DELAY - 1));

        let err = tl.execute(id, 1_000 + DELAY - 1).unwrap_err();
        assert!(matches!(err, Error::TimelockNotReady { eta, .. } if eta == 1_000 + DELAY));

        let (released_target, released) = tl.execute(id, 1_000 + DELAY).unwrap();
        assert_eq!(released_target, target);
        assert_eq!(released, call);

        // Consumed
        assert!(matches!(
            tl.execute(id, 1_000 + DELAY),
            Err(Error::TimelockOperationUnknown(_))
        ));
    }

    #[test]
    fn test_duplicate_and_cancel() {
        let mut tl = timelock();
        let target = Address::repeat_byte(0x11);
        let call = GovernanceCall::RenounceTimelock;

        let id = tl.schedule(target, call.clone(), B256::ZERO, 0).unwrap();
        assert!(matches!(
            tl.schedule(target, call.clone(), B256::ZERO, 5),
            Err(Error::TimelockOperationExists(_))
        ));

        // Different salt is a different operation
        let other = tl.schedule(target, call, B256::repeat_byte(1), 0).unwrap();
        assert_ne!(id, other);

        tl.cancel(id).unwrap();
        assert!(tl.cancel(id).is_err());
    }
}
