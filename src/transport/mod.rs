//! Packet transports behind a [`Source`].
//!
//! A transport moves whole packets (dispatch byte, header and payload). Serial ports and
//! `network@` sources carry them inside frames, serial forwarders with a length prefix. Every
//! transport is split into a [`PacketReader`] for the dispatch thread and a [`PacketWriter`]
//! for the sender.

use std::fmt;
use std::net::TcpStream;

use log::info;

use crate::source::Source;
use crate::Result;

mod framed;
mod serial;
mod sf;

pub use self::framed::{FramedReader, FramedWriter};
pub use self::sf::{SfReader, SfWriter};

/// Blocking source of packets.
pub trait PacketReader: Send {
    /// Waits for the next packet.
    ///
    /// An error ends the connection; callers do not retry.
    fn read_packet(&mut self) -> Result<Vec<u8>>;
}

/// Sink for packets.
pub trait PacketWriter: Send {
    /// Sends one packet.
    fn write_packet(&mut self, packet: &[u8]) -> Result<()>;
}

/// An open link to a base station mote.
pub struct Connection {
    pub(crate) name: String,
    pub(crate) reader: Box<dyn PacketReader>,
    pub(crate) writer: Box<dyn PacketWriter>,
}

impl Connection {
    /// Assembles a connection from its two halves.
    pub fn from_parts<R, W>(name: impl Into<String>, reader: R, writer: W) -> Self
    where
        R: PacketReader + 'static,
        W: PacketWriter + 'static,
    {
        Connection {
            name: name.into(),
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }

    /// Returns a human readable name of the link.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Opens the link named by `source`.
pub fn open(source: &Source) -> Result<Connection> {
    let connection = match source {
        Source::Serial { port, baud_rate } => serial::open(port, *baud_rate)?,
        Source::Network { host, port } => {
            let stream = TcpStream::connect((host.as_str(), *port))?;
            stream.set_nodelay(true)?;
            let reader = FramedReader::new(stream.try_clone()?, Some(stream.try_clone()?));
            Connection::from_parts(source.to_string(), reader, FramedWriter::new(stream))
        }
        Source::SerialForwarder { host, port } => {
            let mut stream = TcpStream::connect((host.as_str(), *port))?;
            stream.set_nodelay(true)?;
            sf::handshake(&mut stream)?;
            let reader = SfReader::new(stream.try_clone()?);
            Connection::from_parts(source.to_string(), reader, SfWriter::new(stream))
        }
    };
    info!("connected to {}", connection.name());
    Ok(connection)
}
