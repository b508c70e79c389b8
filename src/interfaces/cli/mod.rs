//! CLI interface module
//!
//! Runs one parsed command against the configured components and prints
//! the outcome.

pub mod commands;

use std::fmt;

use crate::cli::Commands;
use crate::config::StaticConfig;
use crate::errors::SeqlinkError;
use crate::runtime::{self, StartupContext};
use commands::{convert_url, decode_token, encode_id, generate_alphabet, generate_config, resolve_token};

#[derive(Debug)]
pub enum CliError {
    /// 转换或解析本身失败（带错误码）
    Service(SeqlinkError),
    StartupError(String),
    CommandError(String),
}

impl CliError {
    /// Format as simple output
    pub fn format_simple(&self) -> String {
        match self {
            CliError::Service(err) => format!("[{}] {}", err.code(), err.format_simple()),
            CliError::StartupError(msg) => format!("Startup error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
        }
    }

    /// Format as colored output
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        match self {
            CliError::Service(err) => err.format_colored(),
            CliError::StartupError(msg) => {
                format!("{} {}", "Startup error:".red().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
            }
        }
    }

    /// 进程退出码：客户端错误 2，其余 1
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Service(err) if err.is_client_error() => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<SeqlinkError> for CliError {
    fn from(err: SeqlinkError) -> Self {
        CliError::Service(err)
    }
}

/// Run a CLI command from clap-parsed input
pub async fn run_cli_command(cmd: Commands, config: &StaticConfig) -> Result<(), CliError> {
    // 不需要存储的命令直接执行
    match &cmd {
        Commands::Encode { id } => return encode_id(config, *id),
        Commands::Decode { token } => return decode_token(config, token),
        Commands::GenerateConfig { output_path } => {
            return generate_config(output_path.clone());
        }
        Commands::GenerateAlphabet => {
            generate_alphabet();
            return Ok(());
        }
        Commands::Convert { .. } | Commands::Resolve { .. } => {}
    }

    let ctx = runtime::prepare_startup(config)
        .await
        .map_err(|e| CliError::StartupError(format!("{:#}", e)))?;

    let result = run_with_context(&ctx, cmd).await;
    runtime::shutdown(ctx).await;
    result
}

async fn run_with_context(ctx: &StartupContext, cmd: Commands) -> Result<(), CliError> {
    match cmd {
        Commands::Convert { long_url, json } => convert_url(ctx, &long_url, json).await,
        Commands::Resolve { token } => resolve_token(ctx, &token).await,
        _ => Err(CliError::CommandError(
            "command does not use storage".to_string(),
        )),
    }
}
