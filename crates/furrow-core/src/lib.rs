//! # furrow-core
//! Foundation types and traits for the Furrow reward-accrual engine.

pub mod constants;
pub mod error;
pub mod ledger;
pub mod traits;
pub mod types;

pub use error::{FarmError, TokenError};
pub use ledger::MemoryTokenLedger;
pub use traits::TokenService;
pub use types::{AccountId, Amount, AssetId, BlockHeight, PoolId, Pool, Position};
