//! Wire types and configuration for the coffee-shop client.
//!
//! Everything in here is plain data: serde models for the backend's JSON
//! envelopes and entities, plus the TOML configuration loader. Behaviour
//! (sessions, requests, undo) lives in the `cafe-client` crate.

pub mod config;
pub mod types;
