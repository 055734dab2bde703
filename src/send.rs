use std::io;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::cli::SendOpts;
use crate::connection::Connection;
use crate::dispatch::Dispatcher;
use crate::port::SystemSerial;
use crate::proto::command::Command;
use crate::proto::parser::parse_command;
use crate::queue::event_queue;
use crate::sink::ConsoleSink;

pub fn run(opts: SendOpts) -> Result<()> {
    let cmds = build_commands(&opts.commands, opts.raw)?;

    let (tx, rx) = event_queue();
    let mut sink = ConsoleSink::new(rx, io::stdout());
    let mut conn = Connection::new(Box::new(SystemSerial), tx);

    conn.connect(&opts.dev, &mut sink)
        .with_context(|| format!("connecting to {}", opts.dev))?;
    Dispatcher::new(&mut conn, &mut sink).send_all(&cmds);

    sink.pump_for(Duration::from_millis(opts.linger_ms));
    conn.disconnect();
    sink.tick();
    exit_status(sink.errors())
}

/// Non-zero exit when anything went wrong on the link, so scripts notice.
fn exit_status(errors: usize) -> Result<()> {
    if errors > 0 {
        bail!("{errors} error(s) reported on the link");
    }
    Ok(())
}

/// Parse everything up front so a typo sends nothing.
fn build_commands(args: &[String], raw: bool) -> Result<Vec<Command>> {
    args.iter()
        .map(|arg| {
            if raw {
                Ok(Command::Raw(arg.clone()))
            } else {
                parse_command(arg).with_context(|| format!("bad command {arg:?}"))
            }
        })
        .collect()
}
