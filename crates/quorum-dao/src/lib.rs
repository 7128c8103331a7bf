//! Quorum DAO - the permission-gated DAO contract
//!
//! A [`Dao`] hosts its own permission manager and gates execution,
//! administrative settings and callback registration behind it. Performing
//! actions is delegated to an [`ActionExecutor`] supplied by the caller.

#![forbid(unsafe_code)]

pub mod action;
pub mod callbacks;
pub mod dao;

pub use action::{Action, ActionExecutor, ExecutionOutcome};
pub use callbacks::StandardCallbacks;
pub use dao::{execute_call_data, execute_selector, Dao, DaoSettings};
