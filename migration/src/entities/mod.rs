pub mod sequence_counter;
pub mod short_url_map;

pub use sequence_counter::Entity as SequenceCounterEntity;
pub use short_url_map::Entity as ShortUrlMapEntity;
