//! Yield vault core logic.
//!
//! This crate provides the protocol-independent pieces of the strategy layer:
//! - Error taxonomy shared by oracle and strategy code
//! - U256 fixed-point math (price normalization, USD conversion, rate units)
//! - Strategy bookkeeping (supported tokens, deposits, withdrawals, yield)
//! - Access control, Active/Halted state and re-entrancy guard
//! - Governance timelock queue
//! - Deployment configuration
//!
//! Nothing here performs I/O; lending markets and oracles live in
//! `yieldvault-chain`.

mod accounting;
mod clock;
pub mod config;
mod error;
mod events;
mod governance;
mod guard;
mod timelock;
pub mod u256_math;

pub use accounting::{AccrualAccount, StrategyAnalytics, StrategyBook, SupportedToken};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DeploymentConfig, OracleSettings, PriceFeedConfig};
pub use error::{Error, Result};
pub use events::{EventLog, StrategyEvent};
pub use governance::{AccessControl, RunState};
pub use guard::{GuardToken, ReentrancyGuard};
pub use timelock::{operation_id, GovernanceCall, Timelock};
