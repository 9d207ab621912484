mod atomic;
mod cli;
mod config;
mod date_range;
mod download;
mod error;
mod flux;
mod parquet;
mod raster;
mod report;
mod source;

use std::process::ExitCode;

use chrono::Utc;
use clap::Parser;

use cli::{command, Cli};
use config::Config;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match Config::from_cli(&cli, Utc::now().date_naive()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match command::run(&config).await {
        Ok(summary) => {
            println!(
                "Files saved to `{}` ({} written)",
                config.output_dir.display(),
                summary.files.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
