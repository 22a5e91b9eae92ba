//! Service plumbing shared by Coin Keeper services.
//!
//! Environment config loading, tracing setup, health handlers and the
//! request-id layer. Nothing in here knows about users or tokens.

pub mod config;
pub mod health;
pub mod middleware;
pub mod tracing;
