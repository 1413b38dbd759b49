//! Error taxonomy shared by the oracle and strategy layers.
//!
//! Every failure is a distinct variant so callers can match on the exact
//! condition. Collaborator failures (RPC errors, reverted market calls) are
//! carried through [`Error::External`] without interpretation.

use alloy::primitives::{Address, B256, U256};

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------
    #[error("invalid address")]
    InvalidAddress,

    #[error("invalid token address")]
    InvalidTokenAddress,

    #[error("invalid amount")]
    InvalidAmount,

    #[error("invalid price id")]
    InvalidPriceId,

    // ------------------------------------------------------------------
    // Authorization
    // ------------------------------------------------------------------
    #[error("unauthorized access by {caller}")]
    UnauthorizedAccess { caller: Address },

    #[error("only the coordinator may call this (caller {caller})")]
    OnlyCoordinator { caller: Address },

    // ------------------------------------------------------------------
    // Unsupported entities
    // ------------------------------------------------------------------
    #[error("token {0} is not supported")]
    UnsupportedToken(Address),

    #[error("token {0} is not supported by the lending market")]
    UnsupportedTokenForPool(Address),

    #[error("no pool for token {0}")]
    NoPoolForToken(Address),

    #[error("no market configured for token {0}")]
    NoMarketConfigured(Address),

    // ------------------------------------------------------------------
    // Oracle
    // ------------------------------------------------------------------
    #[error("no price feed configured for {0}")]
    PriceFeedNotFound(Address),

    #[error("invalid price for {0}")]
    InvalidPrice(Address),

    #[error("stale price for {token}: age {age_secs}s exceeds {max_age_secs}s")]
    StalePrice {
        token: Address,
        age_secs: u64,
        max_age_secs: u64,
    },

    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    // ------------------------------------------------------------------
    // External protocol
    // ------------------------------------------------------------------
    #[error("insufficient withdrawal: requested {requested}, received {received}")]
    InsufficientWithdrawal {
        requested: U256,
        received: U256,
    },

    #[error(transparent)]
    External(#[from] anyhow::Error),

    // ------------------------------------------------------------------
    // Idempotency guards
    // ------------------------------------------------------------------
    #[error("token support unchanged for {0}")]
    TokenSupportUnchanged(Address),

    #[error("pool support unchanged for {0}")]
    PoolSupportUnchanged(Address),

    #[error("coordinator is already {0}")]
    SameCoordinator(Address),

    #[error("timelock is already {0}")]
    SameTimelock(Address),

    // ------------------------------------------------------------------
    // State machine and guards
    // ------------------------------------------------------------------
    #[error("strategy is halted")]
    Halted,

    #[error("strategy is not halted")]
    NotHalted,

    #[error("reentrant call")]
    ReentrantCall,

    #[error("recorded withdrawals exceed deposits for {0}")]
    AccountingUnderflow(Address),

    // ------------------------------------------------------------------
    // Timelock
    // ------------------------------------------------------------------
    #[error("timelock operation {0} already scheduled")]
    TimelockOperationExists(B256),

    #[error("timelock operation {0} is unknown")]
    TimelockOperationUnknown(B256),

    #[error("timelock operation {id} not ready until {eta}")]
    TimelockNotReady { id: B256, eta: u64 },
}

impl Error {
    /// True for the three oracle conditions that drive primary → secondary fallback.
    pub fn is_oracle_error(&self) -> bool {
        matches!(
            self,
            Self::PriceFeedNotFound(_) | Self::InvalidPrice(_) | Self::StalePrice { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_are_named() {
        let token = Address::repeat_byte(7);
        let err = Error::StalePrice {
            token,
            age_secs: 3700,
            max_age_secs: 3600,
        };
        assert!(err.to_string().contains("3700s exceeds 3600s"));
        assert!(err.is_oracle_error());
        assert!(!Error::InvalidAmount.is_oracle_error());
    }

    #[test]
    fn test_external_wraps_anyhow() {
        let err: Error = anyhow::anyhow!("execution reverted").into();
        assert!(matches!(err, Error::External(_)));
        assert_eq!(err.to_string(), "execution reverted");
    }
}
