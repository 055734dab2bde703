//! Ordered, unbounded hand-off of decoded lines from the reader thread to
//! the console loop.

use std::sync::mpsc::{self, Receiver, Sender};

use crate::line::Line;

pub fn event_queue() -> (LineSender, LineReceiver) {
    let (tx, rx) = mpsc::channel();
    (LineSender(tx), LineReceiver(rx))
}

/// Producer half. Cloned once per reader session; only one reader is live
/// at a time.
#[derive(Debug, Clone)]
pub struct LineSender(Sender<Line>);

impl LineSender {
    /// Hands the line back when the consumer is gone.
    pub fn send(&self, line: Line) -> Result<(), Line> {
        self.0.send(line).map_err(|mpsc::SendError(line)| line)
    }
}

#[derive(Debug)]
pub struct LineReceiver(Receiver<Line>);

impl LineReceiver {
    /// Everything queued right now, oldest first. Never blocks.
    pub fn drain(&self) -> Vec<Line> {
        self.0.try_iter().collect()
    }
}
