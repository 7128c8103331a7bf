//! Quorum Testing Infrastructure
//!
//! Shared fixtures for the integration tests of every Quorum crate: named
//! accounts, a deployed [`Framework`] with sample plugins published, sample
//! plugin setups, proptest strategies and assertion macros.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! quorum-testkit = { path = "../quorum-testkit" }
//! ```
//!
//! ```rust,no_run
//! use quorum_testkit::*;
//!
//! #[test]
//! fn my_test() {
//!     init_test_tracing();
//!     let mut env = TestFramework::new();
//!     let dao = env.create_dao_with_admin(accounts::alice());
//!     assert_eq!(env.framework.dao_factory().events().len(), 1);
//! }
//! ```

pub mod assertions;
pub mod executor;
pub mod fixtures;
pub mod setups;
pub mod strategies;
pub mod tracing_init;

pub use executor::RecordingExecutor;
pub use fixtures::{accounts, PublishedPlugin, TestFramework};
pub use setups::{AdminSetup, CounterSetup, TreasurySetup};
pub use tracing_init::init_test_tracing;

pub use quorum_plugins::Framework;
