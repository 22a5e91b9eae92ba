//! Coin Keeper authentication service: registration with email one-time
//! codes, password login, RS256 access tokens and rotating refresh tokens.

pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod infra;
pub mod router;
pub mod state;
pub mod usecase;
