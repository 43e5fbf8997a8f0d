// src/main.rs

use clap::{CommandFactory, FromArgMatches};
use colored::*;
use std::{env, sync::Arc};
use tg_leech::{cli::Cli, logging, run_from_cli, symbols};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    // ANSI colours for the Windows console
    #[cfg(windows)]
    {
        colored::control::set_virtual_terminal(true).ok();
    }

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                println!("\n{} Interrupted, stopping the task...", *symbols::WARN);
                shutdown.cancel();
            }
        });
    }

    let bin_name = env::var("CARGO_BIN_NAME").unwrap_or_else(|_| clap::crate_name!().to_string());
    let after_help = format!(
        "Examples:\n  # Leech a file\n  {bin} -s \"https://example.com/file.mkv\"\n\n  # Zip two sources with a password, custom name\n  {bin} -t zip -s \"https://a/1.bin\" -s \"https://a/2.bin\" -s \"[Backup]\" -s \"{{secret}}\"\n\n  # Extract a local archive and upload the content\n  {bin} -m dir-leech -t unzip -s ./archive.7z\n\n  # List the tracks of a media URL, then fetch one\n  {bin} --analyse \"https://example.com/movie.mp4\" --pick audio:1",
        bin = bin_name
    );

    let cmd = Cli::command().after_help(after_help);
    let args = match Cli::from_arg_matches(&cmd.get_matches()) {
        Ok(args) => Arc::new(args),
        Err(e) => e.exit(),
    };
    logging::init_logging(args.log_level, clap::crate_name!());

    if let Err(e) = run_from_cli(args, shutdown).await {
        eprintln!("\n{} {}", *symbols::ERROR, format!("Error: {}", e).red());
        std::process::exit(1);
    }
}
