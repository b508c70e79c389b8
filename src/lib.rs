//! seqlink - a sequence-backed URL shortener core
//!
//! Long URLs are mapped to short tokens by encoding ids from a durable
//! counter in base62. Every token decodes back to the id it came from.
//!
//! # Features
//! - **cli**: Command-line interface (default)
//! - **redis-guard**: Redis-backed persistent existence guard (default)
//! - **full**: All features enabled
//!
//! # Architecture
//! - `codec`: base62 encode / decode with a configurable alphabet
//! - `blacklist`: tokens that are never handed out
//! - `sequence`: unique id allocation on top of a durable counter
//! - `dedup`: content fingerprints, one token per long URL
//! - `cache`: existence guard (bloom / redis / null) and resolved-mapping cache
//! - `singleflight`: per-key coalescing of concurrent lookups
//! - `services`: conversion and resolution orchestrators
//! - `storage`: SeaORM mapping and counter store
//! - `config`: static configuration (TOML + env)
//! - `runtime`: component wiring and teardown
//! - `system`: logging

pub mod blacklist;
pub mod cache;
#[cfg(feature = "cli")]
pub mod cli;
pub mod codec;
pub mod config;
pub mod dedup;
pub mod errors;
pub mod interfaces;
pub mod runtime;
pub mod sequence;
pub mod services;
pub mod singleflight;
pub mod storage;
pub mod system;
pub mod utils;
