//! CLI command implementations

mod codec;
mod config_gen;
mod convert;
mod resolve;

pub use codec::{decode_token, encode_id, generate_alphabet};
pub use config_gen::generate_config;
pub use convert::convert_url;
pub use resolve::resolve_token;
