use std::io::Write;
use std::time::Duration;

use log::{debug, info, warn};

use crate::dispatch::Dispatcher;
use crate::error::LinkError;
use crate::line::Line;
use crate::port::{BAUD, OpenedPort, PortOpener};
use crate::proto::command::Command;
use crate::queue::LineSender;
use crate::reader::{LineReader, ReaderRunState};
use crate::sink::Transcript;

/// Upper bound on how long `disconnect` waits for the reader thread.
pub const SHUTDOWN_WAIT: Duration = Duration::from_millis(300);

/// An open link: the write half plus the reader bound to the read half.
struct Session {
    port: String,
    writer: Box<dyn Write + Send>,
    reader: LineReader,
}

/// Owns the serial handle and the lifetime of its single reader.
///
/// No session ⇔ closed. Every `connect` tears the previous session down
/// first, so at most one reader belongs to a connection at any time.
pub struct Connection {
    opener: Box<dyn PortOpener>,
    events: LineSender,
    baud: u32,
    session: Option<Session>,
}

impl Connection {
    pub fn new(opener: Box<dyn PortOpener>, events: LineSender) -> Self {
        Self {
            opener,
            events,
            baud: BAUD,
            session: None,
        }
    }

    pub fn baud(&self) -> u32 {
        self.baud
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn port_name(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.port.as_str())
    }

    pub fn reader_state(&self) -> Option<ReaderRunState> {
        self.session.as_ref().map(|s| s.reader.state())
    }

    /// Tear down any current session, open `port`, start its reader and ask
    /// the controller for its configuration.
    ///
    /// On error nothing is started and the previous session stays closed.
    pub fn connect(
        &mut self,
        port: &str,
        transcript: &mut dyn Transcript,
    ) -> Result<(), LinkError> {
        self.disconnect();

        let OpenedPort { reader, writer } = self.opener.open(port, self.baud)?;
        let reader = LineReader::spawn(reader, self.events.clone())?;
        self.session = Some(Session {
            port: port.to_string(),
            writer,
            reader,
        });
        info!("connected to {} @ {}", port, self.baud);

        transcript.append(&Line::local(format!("[OK] Connected {} @ {}", port, self.baud)));
        Dispatcher::new(self, transcript).send(&Command::STATUS_QUERY);
        Ok(())
    }

    /// Stop the reader and close the handle. No-op when already closed.
    ///
    /// The wait for the reader is bounded by [`SHUTDOWN_WAIT`]; when it
    /// expires the handle is closed anyway and the reader exits on its own
    /// shortly after. Do not assume the thread is gone when this returns.
    pub fn disconnect(&mut self) {
        let Some(Session {
            port,
            mut writer,
            reader,
        }) = self.session.take()
        else {
            return;
        };

        if let Err(e) = reader.stop(SHUTDOWN_WAIT) {
            warn!("{port}: {e}; closing anyway");
        }
        if let Err(e) = writer.flush() {
            debug!("{port}: flush on close: {e}");
        }
        drop(writer);
        info!("disconnected from {port}");
    }

    /// Write bytes as-is on the open handle.
    pub fn transmit(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        let session = self.session.as_mut().ok_or(LinkError::NotConnected)?;
        session.writer.write_all(bytes)?;
        session.writer.flush()?;
        Ok(())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.disconnect();
    }
}
