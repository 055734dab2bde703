use clap::{Args, Parser, Subcommand};
use simplelog::LevelFilter;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "hearse-console",
    about = "Serial console for the Haunted Hearse prop controller"
)]
pub struct Cli {
    #[command(flatten)]
    pub log: LogOpts,
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Cmd {
    /// List candidate serial ports
    Ports,
    /// Interactive console: type commands, watch controller output
    Console(ConsoleOpts),
    /// Send commands, print replies for a while, disconnect
    Send(SendOpts),
}

#[derive(Args, Debug, Clone)]
pub struct LogOpts {
    /// Diagnostic log file (the transcript itself goes to stdout)
    #[arg(long, global = true, default_value = "hearse-console.log")]
    pub log_file: PathBuf,
    /// Diagnostic log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: LevelFilter,
}

#[derive(Args, Debug, Clone)]
pub struct ConsoleOpts {
    /// Serial device to connect to at startup
    #[arg(long)]
    pub dev: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SendOpts {
    /// Serial device path
    #[arg(long)]
    pub dev: String,
    /// How long to keep printing replies after the last command (ms)
    #[arg(long, default_value_t = 1000)]
    pub linger_ms: u64,
    /// Send arguments verbatim instead of parsing them as commands
    #[arg(long, default_value_t = false)]
    pub raw: bool,
    /// Commands, one per argument (e.g. "BRIGHT 7" "SCENE INTRO")
    #[arg(required = true)]
    pub commands: Vec<String>,
}
