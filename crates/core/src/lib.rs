//! Core domain services for plaza: feed materialization, re-rank
//! triggering, moderation decisions, and the trust state machine.

pub mod services;

pub use services::*;
