use std::io::Write;
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

use crate::line::{Line, LineKind};
use crate::queue::LineReceiver;

/// How often the console loop drains the event queue.
pub const TICK: Duration = Duration::from_millis(30);

/// Anything that can show lines to the user, in order.
pub trait Transcript {
    fn append(&mut self, line: &Line);
}

impl Transcript for Vec<Line> {
    fn append(&mut self, line: &Line) {
        self.push(line.clone());
    }
}

/// Single-threaded consumer of the event queue.
///
/// Device lines arrive through [`tick`](Self::tick); local notices go
/// straight to [`Transcript::append`]. Both land in the same output.
pub struct ConsoleSink<W: Write> {
    events: LineReceiver,
    out: W,
    errors: usize,
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(events: LineReceiver, out: W) -> Self {
        Self {
            events,
            out,
            errors: 0,
        }
    }

    /// Error lines shown so far, from the reader or from local failures.
    pub fn errors(&self) -> usize {
        self.errors
    }

    /// Show every line queued since the last tick. Never blocks; returns
    /// how many lines were shown.
    pub fn tick(&mut self) -> usize {
        let lines = self.events.drain();
        for line in &lines {
            self.write(line);
        }
        if !lines.is_empty() {
            self.flush();
        }
        lines.len()
    }

    /// Keep ticking at [`TICK`] cadence for `window`.
    pub fn pump_for(&mut self, window: Duration) {
        let deadline = Instant::now() + window;
        loop {
            self.tick();
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(TICK.min(deadline - now));
        }
    }

    pub fn clear(&mut self) {
        self.append(&Line::local("-".repeat(40)));
    }

    #[cfg(test)]
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    fn write(&mut self, line: &Line) {
        if line.kind == LineKind::Error {
            self.errors += 1;
        }
        // A closed stdout is not worth tearing the session down for
        if let Err(e) = writeln!(self.out, "{line}") {
            debug!("transcript write: {e}");
        }
    }

    fn flush(&mut self) {
        if let Err(e) = self.out.flush() {
            debug!("transcript flush: {e}");
        }
    }
}

impl<W: Write> Transcript for ConsoleSink<W> {
    fn append(&mut self, line: &Line) {
        self.write(line);
        self.flush();
    }
}
