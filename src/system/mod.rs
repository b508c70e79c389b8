//! System-level modules
//!
//! Process-wide setup that sits outside the conversion/resolution core:
//! - Logging initialization

pub mod logging;
