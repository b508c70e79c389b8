//! Application lifecycle
//!
//! Wires storage, guard, cache and the two orchestrators together from the
//! static configuration, and tears them down again.

pub mod lifetime;

pub use lifetime::shutdown::shutdown;
pub use lifetime::startup::{StartupContext, prepare_startup, warm_guard};
