mod bloom;
mod null;
#[cfg(feature = "redis-guard")]
mod redis;

pub use bloom::{BloomExistenceFilterPlugin, calculate_capacity};
pub use null::NullExistenceFilterPlugin;
#[cfg(feature = "redis-guard")]
pub use redis::RedisExistenceFilterPlugin;
