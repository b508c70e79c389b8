//! Convert command

use colored::Colorize;

use crate::errors::SeqlinkError;
use crate::interfaces::cli::CliError;
use crate::runtime::StartupContext;

pub async fn convert_url(ctx: &StartupContext, long_url: &str, json: bool) -> Result<(), CliError> {
    match ctx.conversion.convert(long_url).await {
        Ok(result) => {
            if json {
                let out = serde_json::to_string_pretty(&result)
                    .map_err(|e| CliError::CommandError(e.to_string()))?;
                println!("{}", out);
            } else {
                println!(
                    "{} Converted: {} -> {} (id {})",
                    "✓".bold().green(),
                    long_url.blue().underline(),
                    result.token.cyan(),
                    result.id
                );
                if let Some(short_url) = result.short_url {
                    println!("  {}", short_url.magenta());
                }
            }
            Ok(())
        }
        Err(SeqlinkError::AlreadyConverted(token)) => {
            // 已存在的 token 仍然打印出来，便于脚本使用
            println!(
                "{} Already converted: {} -> {}",
                "ℹ".bold().blue(),
                long_url.blue().underline(),
                token.cyan()
            );
            Err(CliError::Service(SeqlinkError::AlreadyConverted(token)))
        }
        Err(e) => Err(e.into()),
    }
}
