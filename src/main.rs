use anyhow::{Context, Result};
use clap::Parser;
use simplelog::{ConfigBuilder, WriteLogger};
use std::fs::File;

mod cli;
mod connection;
mod console;
mod dispatch;
mod error;
mod line;
mod port;
mod proto;
mod queue;
mod reader;
mod send;
mod sink;
#[cfg(test)]
mod testutil;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    init_logging(&args.log)?;
    log::info!("hearse-console starting: {:?}", args.cmd);

    match args.cmd {
        cli::Cmd::Ports => port::run_list(&port::SystemSerial),
        cli::Cmd::Console(opts) => console::run(opts),
        cli::Cmd::Send(opts) => send::run(opts),
    }
}

/// Diagnostics go to a file so they never interleave with the transcript.
fn init_logging(opts: &cli::LogOpts) -> Result<()> {
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    let log_file = File::create(&opts.log_file)
        .with_context(|| format!("creating log file {}", opts.log_file.display()))?;
    WriteLogger::init(opts.log_level, log_config, log_file).context("installing logger")?;
    Ok(())
}
