//! Cross-crate test suite for Furrow.
//!
//! Scenario tests replay fixed reward histories and check exact payouts.
//! Property tests drive random operation sequences through a [`Farm`] and
//! check conservation, fairness and rollback invariants.
//!
//! [`Farm`]: furrow_engine::Farm

pub mod helpers;
