//! Offline codec commands

use colored::Colorize;

use crate::codec::Codec;
use crate::config::StaticConfig;
use crate::interfaces::cli::CliError;

fn codec_from(config: &StaticConfig) -> Result<Codec, CliError> {
    Ok(Codec::from_alphabet_str(&config.codec.alphabet)?)
}

pub fn encode_id(config: &StaticConfig, id: u64) -> Result<(), CliError> {
    let codec = codec_from(config)?;
    println!("{} -> {}", id.to_string().yellow(), codec.encode(id).cyan());
    Ok(())
}

pub fn decode_token(config: &StaticConfig, token: &str) -> Result<(), CliError> {
    let codec = codec_from(config)?;
    let id = codec.decode(token)?;
    println!("{} -> {}", token.cyan(), id.to_string().yellow());
    Ok(())
}

pub fn generate_alphabet() {
    let alphabet = crate::utils::generate_alphabet();
    println!("{}", "Shuffled alphabet (paste into [codec] alphabet):".yellow());
    println!("{}", alphabet);
}
