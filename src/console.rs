//! Interactive front end.
//!
//! The event loop is the only consumer: it ticks the sink at a fixed
//! cadence and handles typed input between ticks. Stdin is read on its own
//! thread and forwarded over a channel so the loop never blocks on it.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result};
use log::{error, info, warn};

use crate::cli::ConsoleOpts;
use crate::connection::Connection;
use crate::dispatch::Dispatcher;
use crate::line::Line;
use crate::port::{PortEnumerator, PortOpener, SystemSerial};
use crate::proto::command::{Action, Command, Param, Scene};
use crate::proto::parser::parse_command;
use crate::queue::event_queue;
use crate::reader::ReaderRunState;
use crate::sink::{ConsoleSink, TICK, Transcript};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub fn run(opts: ConsoleOpts) -> Result<()> {
    let input = spawn_stdin_reader().context("starting stdin reader")?;
    let mut session = Session::new(
        Box::new(SystemSerial),
        Box::new(SystemSerial),
        io::stdout(),
    );

    session.notice("Haunted Hearse console. /help for commands.");
    if let Some(dev) = opts.dev.as_deref() {
        session.connect(dev);
    }
    session.run(input);
    Ok(())
}

fn spawn_stdin_reader() -> io::Result<Receiver<String>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new().name("stdin".into()).spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!("stdin: {e}");
                    break;
                }
            }
        }
    })?;
    Ok(rx)
}

/// Connection, port list and transcript for one interactive run.
pub struct Session<W: Write> {
    conn: Connection,
    ports: Box<dyn PortEnumerator>,
    sink: ConsoleSink<W>,
}

impl<W: Write> Session<W> {
    pub fn new(opener: Box<dyn PortOpener>, ports: Box<dyn PortEnumerator>, out: W) -> Self {
        let (tx, rx) = event_queue();
        Self {
            conn: Connection::new(opener, tx),
            ports,
            sink: ConsoleSink::new(rx, out),
        }
    }

    /// Tick the sink every [`TICK`] and handle input as it arrives, until
    /// `/quit` or end of input.
    pub fn run(&mut self, input: Receiver<String>) {
        let mut next_tick = Instant::now();
        loop {
            if Instant::now() >= next_tick {
                self.sink.tick();
                next_tick = Instant::now() + TICK;
            }
            match input.recv_timeout(next_tick.saturating_duration_since(Instant::now())) {
                Ok(text) => {
                    if self.handle_input(&text) == Flow::Quit {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    info!("end of input");
                    break;
                }
            }
        }
        self.conn.disconnect();
        self.sink.tick();
    }

    /// One line of user input: a `/` meta command or a controller command.
    pub fn handle_input(&mut self, input: &str) -> Flow {
        let input = input.trim();
        if input.is_empty() {
            return Flow::Continue;
        }
        let Some(meta) = input.strip_prefix('/') else {
            match parse_command(input) {
                Ok(cmd) => self.send(&cmd),
                Err(e) => self.sink.append(&Line::error(e)),
            }
            return Flow::Continue;
        };

        let (name, rest) = meta.split_once(' ').unwrap_or((meta, ""));
        let rest = rest.trim();
        match name.to_ascii_lowercase().as_str() {
            "quit" | "exit" => return Flow::Quit,
            "help" | "?" => self.help(),
            "ports" => self.list_ports(),
            "connect" if rest.is_empty() => {
                self.sink.append(&Line::error("usage: /connect <port>"));
            }
            "connect" => self.connect(rest),
            "disconnect" => self.disconnect(),
            "status" => self.status(),
            "clear" => self.sink.clear(),
            // Verbatim, including inner spacing
            "raw" => {
                let text = meta.split_once(' ').map_or("", |(_, text)| text);
                self.send(&Command::Raw(text.to_string()));
            }
            other => self
                .sink
                .append(&Line::error(format_args!("unknown console command: /{other}"))),
        }
        Flow::Continue
    }

    pub fn connect(&mut self, port: &str) {
        if let Err(e) = self.conn.connect(port, &mut self.sink) {
            error!("connect {port}: {e}");
            self.sink.append(&Line::error(format_args!("Failed to connect: {e}")));
        }
    }

    fn disconnect(&mut self) {
        if !self.conn.is_connected() {
            self.notice("not connected");
            return;
        }
        let port = self.conn.port_name().unwrap_or_default().to_string();
        self.conn.disconnect();
        self.notice(&format!("[OK] Disconnected {port}"));
    }

    fn status(&mut self) {
        if !self.conn.is_connected() {
            self.notice("not connected");
            return;
        }
        let text = format!(
            "connected to {} @ {} (reader {:?})",
            self.conn.port_name().unwrap_or_default(),
            self.conn.baud(),
            self.conn.reader_state().unwrap_or(ReaderRunState::Stopped),
        );
        self.notice(&text);
    }

    fn send(&mut self, cmd: &Command) {
        Dispatcher::new(&mut self.conn, &mut self.sink).send(cmd);
    }

    fn list_ports(&mut self) {
        match self.ports.ports() {
            Ok(ports) if ports.is_empty() => self.notice("no serial ports found"),
            Ok(ports) => {
                for port in ports {
                    self.notice(&format!("  {port}"));
                }
            }
            Err(e) => self.sink.append(&Line::error(format_args!("listing ports: {e}"))),
        }
    }

    fn notice(&mut self, text: &str) {
        self.sink.append(&Line::local(text));
    }

    fn help(&mut self) {
        let params: Vec<String> = Param::ALL
            .iter()
            .map(|p| {
                let range = p.range();
                format!("{} <{}..{}>", p.name(), range.start(), range.end())
            })
            .collect();
        let actions: Vec<&str> = Action::ALL.iter().map(|a| a.name()).collect();
        let scenes: Vec<&str> = Scene::ALL.iter().map(|s| s.name()).collect();

        self.notice("Controller commands (case-insensitive):");
        self.notice(&format!("  {}", params.join(", ")));
        self.notice(&format!("  {}", actions.join(", ")));
        self.notice(&format!("  SCENE <{}>", scenes.join("|")));
        self.notice("Console commands:");
        self.notice("  /ports              list serial ports");
        self.notice("  /connect <port>     open port at 115200 8N1");
        self.notice("  /disconnect         close the port");
        self.notice("  /status             show connection state");
        self.notice("  /raw <text>         send text verbatim");
        self.notice("  /clear              print a separator");
        self.notice("  /quit               disconnect and exit");
    }
}
