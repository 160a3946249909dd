//! # furrow-engine
//! Reward accrual engine for Furrow.
//!
//! Participants stake assets into weighted pools and earn a reward asset in
//! proportion to stake share and elapsed blocks. [`Farm`] is the entry
//! point; the remaining modules are its building blocks.
//!
//! ## Modules
//!
//! - [`accrual`]: per-pool accumulator settlement
//! - [`emission`]: emission schedules and budget control
//! - [`registry`]: pool list and total weight
//! - [`positions`]: per-participant stake and reward debt
//! - [`referral`]: referrer bindings and bonuses
//! - [`fees`]: deposit fee split and fee address
//! - [`farm`]: entry points, payouts, rollback
//! - [`config`]: file/env configuration
//! - [`persist`]: bincode state snapshots

pub mod accrual;
pub mod config;
pub mod emission;
pub mod farm;
pub mod fees;
pub mod persist;
pub mod positions;
pub mod referral;
pub mod registry;

pub use config::{ConfigError, FarmConfig};
pub use emission::{ClaimPolicy, EmissionController, EmissionSchedule, RewardSource};
pub use farm::{Farm, FarmParams, FarmState, FarmStats};
