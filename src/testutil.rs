//! In-memory serial link for tests.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::LinkError;
use crate::line::Line;
use crate::port::{ByteSource, OpenedPort, PortEntry, PortEnumerator, PortOpener};
use crate::queue::LineReceiver;

type Script = VecDeque<Result<Vec<u8>, io::ErrorKind>>;

/// Shared state behind every handle opened from this link. Clones observe
/// the same device.
#[derive(Clone, Default)]
pub struct FakeLink {
    script: Arc<Mutex<Script>>,
    written: Arc<Mutex<Vec<u8>>>,
    live_readers: Arc<AtomicUsize>,
    opens: Arc<AtomicUsize>,
    fail_open: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    read_stall_ms: Arc<AtomicU64>,
}

impl FakeLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one chunk; the reader sees it as a single available batch.
    pub fn feed(&self, bytes: &[u8]) {
        self.script.lock().unwrap().push_back(Ok(bytes.to_vec()));
    }

    pub fn feed_error(&self, kind: io::ErrorKind) {
        self.script.lock().unwrap().push_back(Err(kind));
    }

    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }

    pub fn written_len(&self) -> usize {
        self.written.lock().unwrap().len()
    }

    pub fn live_readers(&self) -> usize {
        self.live_readers.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    /// Make every read hang for `stall` after taking its chunk, like a
    /// driver stuck inside a blocking read.
    pub fn set_read_stall(&self, stall: Duration) {
        self.read_stall_ms
            .store(stall.as_millis() as u64, Ordering::SeqCst);
    }

    /// Chunks and errors not yet taken by a reader.
    pub fn queued(&self) -> usize {
        self.script.lock().unwrap().len()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn source(&self) -> Box<dyn ByteSource> {
        self.live_readers.fetch_add(1, Ordering::SeqCst);
        Box::new(FakeSource {
            script: Arc::clone(&self.script),
            live: Arc::clone(&self.live_readers),
            stall_ms: Arc::clone(&self.read_stall_ms),
        })
    }

    fn writer(&self) -> Box<dyn Write + Send> {
        Box::new(FakeWriter {
            written: Arc::clone(&self.written),
            fail: Arc::clone(&self.fail_writes),
        })
    }
}

impl PortOpener for FakeLink {
    fn open(&self, dev: &str, _baud: u32) -> Result<OpenedPort, LinkError> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(LinkError::PortUnavailable {
                port: dev.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such device"),
            });
        }
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(OpenedPort {
            reader: self.source(),
            writer: self.writer(),
        })
    }
}

impl PortEnumerator for FakeLink {
    fn ports(&self) -> io::Result<Vec<PortEntry>> {
        Ok(vec![PortEntry {
            name: "fake0".into(),
            detail: Some("test controller".into()),
        }])
    }
}

struct FakeSource {
    script: Arc<Mutex<Script>>,
    live: Arc<AtomicUsize>,
    stall_ms: Arc<AtomicU64>,
}

impl ByteSource for FakeSource {
    fn bytes_available(&mut self) -> io::Result<usize> {
        let mut script = self.script.lock().unwrap();
        let front = script
            .front()
            .map(|entry| entry.as_ref().map(Vec::len).map_err(|kind| *kind));
        match front {
            None => Ok(0),
            Some(Ok(len)) => Ok(len),
            Some(Err(kind)) => {
                script.pop_front();
                Err(io::Error::new(kind, "fake read failure"))
            }
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(Ok(mut chunk)) = self.script.lock().unwrap().pop_front() else {
            return Ok(0);
        };
        let stall = self.stall_ms.load(Ordering::SeqCst);
        if stall > 0 {
            thread::sleep(Duration::from_millis(stall));
        }
        let n = buf.len().min(chunk.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            self.script
                .lock()
                .unwrap()
                .push_front(Ok(chunk.split_off(n)));
        }
        Ok(n)
    }
}

impl Drop for FakeSource {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

struct FakeWriter {
    written: Arc<Mutex<Vec<u8>>>,
    fail: Arc<AtomicBool>,
}

impl Write for FakeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"));
        }
        self.written.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

/// Drain until `want` lines arrived or `timeout` passed.
pub fn collect_lines(rx: &LineReceiver, want: usize, timeout: Duration) -> Vec<Line> {
    let mut lines = Vec::new();
    wait_until(timeout, || {
        lines.extend(rx.drain());
        lines.len() >= want
    });
    lines
}
