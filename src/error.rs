use std::io;
use std::time::Duration;

use thiserror::Error;

/// Failures of the serial link as seen by the connection owner.
///
/// Read-side problems never show up here: the reader turns them into
/// in-band error lines instead.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("open {port}: {source}")]
    PortUnavailable {
        port: String,
        #[source]
        source: io::Error,
    },
    #[error("not connected")]
    NotConnected,
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("reader did not stop within {0:?}")]
    ShutdownTimeout(Duration),
}
