//! Background line reader.
//!
//! One thread per open link. It polls the read half for available bytes,
//! reassembles newline-delimited lines and pushes them into the event queue.
//! Read errors become `[ERROR]` lines and the loop keeps going; only the
//! stop flag (or a vanished consumer) ends it.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};

use crate::error::LinkError;
use crate::line::{Line, LineBuffer};
use crate::port::ByteSource;
use crate::queue::LineSender;

/// Sleep when nothing is waiting on the port.
pub const IDLE_POLL: Duration = Duration::from_millis(20);
/// Sleep after a failed read before trying again.
pub const ERROR_BACKOFF: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderRunState {
    Idle,
    Reading,
    Stopped,
}

impl ReaderRunState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Idle,
            1 => Self::Reading,
            _ => Self::Stopped,
        }
    }
}

#[derive(Debug)]
struct RunState(AtomicU8);

impl RunState {
    fn set(&self, state: ReaderRunState) {
        self.0.store(state as u8, Ordering::Release);
    }

    fn get(&self) -> ReaderRunState {
        ReaderRunState::from_u8(self.0.load(Ordering::Acquire))
    }
}

/// Handle to a running reader thread.
///
/// Dropping it raises the stop flag without waiting.
#[derive(Debug)]
pub struct LineReader {
    stop: Arc<AtomicBool>,
    state: Arc<RunState>,
    // Disconnects when the thread function returns
    exited: mpsc::Receiver<()>,
    thread: Option<JoinHandle<()>>,
}

impl LineReader {
    pub fn spawn(source: Box<dyn ByteSource>, events: LineSender) -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let state = Arc::new(RunState(AtomicU8::new(ReaderRunState::Idle as u8)));
        let (exit_tx, exited) = mpsc::channel::<()>();

        let thread = thread::Builder::new().name("line-reader".into()).spawn({
            let stop = Arc::clone(&stop);
            let state = Arc::clone(&state);
            move || {
                read_loop(source, &events, &stop, &state);
                drop(exit_tx);
            }
        })?;

        Ok(Self {
            stop,
            state,
            exited,
            thread: Some(thread),
        })
    }

    pub fn state(&self) -> ReaderRunState {
        self.state.get()
    }

    /// Signal the thread and wait at most `wait` for it to exit.
    ///
    /// Cleanup is eventual, not synchronous: on `ShutdownTimeout` the thread
    /// is detached and finishes on its own after its current iteration.
    pub fn stop(mut self, wait: Duration) -> Result<(), LinkError> {
        self.stop.store(true, Ordering::Release);
        match self.exited.recv_timeout(wait) {
            Err(RecvTimeoutError::Disconnected) | Ok(()) => {
                if let Some(thread) = self.thread.take()
                    && thread.join().is_err()
                {
                    warn!("reader thread panicked");
                }
                Ok(())
            }
            Err(RecvTimeoutError::Timeout) => {
                self.thread.take();
                Err(LinkError::ShutdownTimeout(wait))
            }
        }
    }
}

impl Drop for LineReader {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}

fn read_loop(
    mut source: Box<dyn ByteSource>,
    events: &LineSender,
    stop: &AtomicBool,
    state: &RunState,
) {
    let mut buffer = LineBuffer::new();
    let mut chunk = Vec::new();

    'run: while !stop.load(Ordering::Acquire) {
        match read_available(&mut *source, &mut chunk) {
            Ok(0) => {
                state.set(ReaderRunState::Idle);
                thread::sleep(IDLE_POLL);
            }
            Ok(_) => {
                state.set(ReaderRunState::Reading);
                for line in buffer.push(&chunk) {
                    if events.send(line).is_err() {
                        debug!("event queue closed, reader exiting");
                        break 'run;
                    }
                }
            }
            Err(e) => {
                warn!("serial read: {e}");
                if events.send(Line::error(&e)).is_err() {
                    break 'run;
                }
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }

    if !buffer.pending().is_empty() {
        debug!("reader stopped with {} unterminated bytes", buffer.pending().len());
    }
    state.set(ReaderRunState::Stopped);
}

/// Read everything currently buffered by the driver into `chunk`.
fn read_available(source: &mut dyn ByteSource, chunk: &mut Vec<u8>) -> io::Result<usize> {
    let n = source.bytes_available()?;
    chunk.clear();
    if n == 0 {
        return Ok(0);
    }
    chunk.resize(n, 0);
    match source.read(chunk) {
        Ok(got) => {
            chunk.truncate(got);
            Ok(got)
        }
        Err(e) if e.kind() == io::ErrorKind::TimedOut => {
            chunk.clear();
            Ok(0)
        }
        Err(e) => Err(e),
    }
}
