//! Generate config command

use colored::Colorize;

use crate::config::StaticConfig;
use crate::interfaces::cli::CliError;

/// Generate example configuration file
pub fn generate_config(output_path: Option<String>) -> Result<(), CliError> {
    let path = output_path.unwrap_or_else(|| "config.example.toml".to_string());

    println!(
        "{} {}",
        "Generating configuration file...".yellow(),
        path.blue()
    );

    StaticConfig::default().save_to_file(&path)?;

    println!(
        "  {} {}",
        "Configuration file generated successfully".green(),
        path.blue()
    );
    println!(
        "  {}",
        "Copy it to config.toml or override values with SEQLINK__* environment variables".white()
    );
    Ok(())
}
