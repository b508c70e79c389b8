//! Resolve command

use colored::Colorize;

use crate::interfaces::cli::CliError;
use crate::runtime::StartupContext;

pub async fn resolve_token(ctx: &StartupContext, token: &str) -> Result<(), CliError> {
    match ctx.resolution.resolve(token).await? {
        Some(long_url) => {
            println!(
                "{} {} -> {}",
                "✓".bold().green(),
                token.cyan(),
                long_url.blue().underline()
            );
            Ok(())
        }
        None => Err(CliError::CommandError(format!(
            "token '{}' was never issued",
            token
        ))),
    }
}
