//! Service layer
//!
//! The two orchestrators shared by every caller (CLI, HTTP handlers, tests).

mod convert_service;
mod resolve_service;

pub use convert_service::*;
pub use resolve_service::*;
