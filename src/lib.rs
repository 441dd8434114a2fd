//! rssi-probe measures radio link quality on a sensor network testbed.
//!
//! A probe run sends a fixed number of command packets to a mote through a gateway link and
//! records the measurement carried by each reply. The gateway link is one of
//!
//! * a serial port the base station mote is plugged into (`serial@/dev/ttyUSB0:115200`),
//! * the same framed byte stream carried over TCP (`network@host:port`),
//! * a serial forwarder, which usually fronts a simulated network (`sf@host:port`).
//!
//! The pieces compose like this:
//!
//! ```no_run
//! use std::sync::Arc;
//! use rssi_probe::{Handshake, MoteIf, PacketSender, ReplyRecorder, Source};
//!
//! let source: Source = "serial@/dev/ttyUSB0:telosb".parse()?;
//! let mote = Arc::new(MoteIf::new(rssi_probe::transport::open(&source)?, 0)?);
//! let handshake = Arc::new(Handshake::new(0));
//!
//! mote.register_listener(10, ReplyRecorder::new("/tmp/rssi", Arc::clone(&handshake)));
//! PacketSender::new(mote, handshake, 0, 10).send_packets(2, 20)?;
//! # Ok::<(), rssi_probe::Error>(())
//! ```
#![deny(missing_docs, missing_debug_implementations)]
// Document feature-gated elements on docs.rs. See
// https://doc.rust-lang.org/rustdoc/unstable-features.html?highlight=doc(cfg#doccfg-recording-what-platforms-or-features-are-required-for-code-to-be-documented
// and
// https://doc.rust-lang.org/rustdoc/unstable-features.html#doc_auto_cfg-automatically-generate-doccfg
// for details.
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

use std::error::Error as StdError;
use std::fmt;
use std::io;

pub mod config;
pub mod framing;
mod handshake;
pub mod message;
mod mote_if;
mod recorder;
mod sender;
pub mod source;
pub mod transport;

pub use crate::config::{Config, Settings};
pub use crate::handshake::Handshake;
pub use crate::message::{AmHeader, Measurement, Message, RssiMsg, SerialPacket};
pub use crate::mote_if::{MessageListener, MoteIf};
pub use crate::recorder::ReplyRecorder;
pub use crate::sender::PacketSender;
pub use crate::source::Source;
pub use crate::transport::Connection;

/// A type for results generated by interacting with the gateway link
///
/// The `Err` type is hard-wired to [`rssi_probe::Error`](struct.Error.html).
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of errors that can occur when talking to a mote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The device is not available.
    ///
    /// This could indicate that the device is in use by another process or was
    /// disconnected while performing I/O.
    NoDevice,

    /// A parameter was incorrect.
    InvalidInput,

    /// The peer sent bytes that do not form a valid frame, packet or message.
    Protocol,

    /// The peer closed the connection.
    Disconnected,

    /// An I/O error occurred.
    ///
    /// The type of I/O error is determined by the inner `io::ErrorKind`.
    Io(io::ErrorKind),
}

/// An error type for the gateway link and the probe built on top of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    /// The kind of error this is
    pub kind: ErrorKind,
    /// A description of the error suitable for end-users
    pub description: String,
}

impl Error {
    /// Instantiates a new error
    pub fn new<T: Into<String>>(kind: ErrorKind, description: T) -> Self {
        Error {
            kind,
            description: description.into(),
        }
    }

    /// Returns the corresponding `ErrorKind` for this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> std::result::Result<(), fmt::Error> {
        fmt.write_str(&self.description)
    }
}

impl StdError for Error {}

impl From<io::Error> for Error {
    fn from(io_error: io::Error) -> Error {
        let kind = match io_error.kind() {
            io::ErrorKind::UnexpectedEof => ErrorKind::Disconnected,
            other => ErrorKind::Io(other),
        };
        Error::new(kind, format!("{}", io_error))
    }
}

impl From<Error> for io::Error {
    fn from(error: Error) -> io::Error {
        let kind = match error.kind {
            ErrorKind::NoDevice => io::ErrorKind::NotFound,
            ErrorKind::InvalidInput => io::ErrorKind::InvalidInput,
            ErrorKind::Protocol => io::ErrorKind::InvalidData,
            ErrorKind::Disconnected => io::ErrorKind::UnexpectedEof,
            ErrorKind::Io(kind) => kind,
        };
        io::Error::new(kind, error.description)
    }
}

impl From<serialport::Error> for Error {
    fn from(error: serialport::Error) -> Error {
        let kind = match error.kind() {
            serialport::ErrorKind::NoDevice => ErrorKind::NoDevice,
            serialport::ErrorKind::InvalidInput => ErrorKind::InvalidInput,
            serialport::ErrorKind::Io(kind) => ErrorKind::Io(kind),
            serialport::ErrorKind::Unknown => ErrorKind::Io(io::ErrorKind::Other),
        };
        Error::new(kind, error.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_eof_maps_to_disconnected() {
        let error = Error::from(io::Error::new(io::ErrorKind::UnexpectedEof, "gone"));
        assert_eq!(error.kind(), ErrorKind::Disconnected);
        assert_eq!(error.to_string(), "gone");
    }

    #[test]
    fn protocol_error_converts_to_invalid_data() {
        let error: io::Error = Error::new(ErrorKind::Protocol, "bad crc").into();
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
    }
}
