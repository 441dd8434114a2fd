//! Serial forwarder protocol.
//!
//! After connecting, both ends send [`VERSION`] and check that the peer's first byte is `U`.
//! Packets then travel unframed, each preceded by its length as a single byte.

use std::io::{Read, Write};

use log::debug;

use super::{PacketReader, PacketWriter};
use crate::{Error, ErrorKind, Result};

/// Version announcement exchanged on connect.
pub const VERSION: [u8; 2] = *b"U ";

/// Exchanges the version announcement with the forwarder.
pub(crate) fn handshake<S: Read + Write>(stream: &mut S) -> Result<()> {
    stream.write_all(&VERSION)?;
    stream.flush()?;

    let mut peer = [0u8; 2];
    stream.read_exact(&mut peer)?;
    if peer[0] != VERSION[0] {
        return Err(Error::new(
            ErrorKind::Protocol,
            format!(
                "peer is not a serial forwarder (version bytes {:02x} {:02x})",
                peer[0], peer[1]
            ),
        ));
    }
    debug!("serial forwarder speaks version '{}'", char::from(peer[1]));
    Ok(())
}

/// Reads length-prefixed packets from a serial forwarder.
#[derive(Debug)]
pub struct SfReader<S> {
    inner: S,
}

impl<S: Read> SfReader<S> {
    /// Wraps a stream that already completed the [`VERSION`] exchange.
    pub fn new(inner: S) -> Self {
        SfReader { inner }
    }
}

impl<S: Read + Send> PacketReader for SfReader<S> {
    fn read_packet(&mut self) -> Result<Vec<u8>> {
        loop {
            let mut len = [0u8; 1];
            self.inner.read_exact(&mut len)?;
            if len[0] == 0 {
                continue;
            }
            let mut packet = vec![0u8; usize::from(len[0])];
            self.inner.read_exact(&mut packet)?;
            return Ok(packet);
        }
    }
}

/// Writes length-prefixed packets to a serial forwarder.
#[derive(Debug)]
pub struct SfWriter<S> {
    inner: S,
}

impl<S: Write> SfWriter<S> {
    /// Wraps a stream that already completed the [`VERSION`] exchange.
    pub fn new(inner: S) -> Self {
        SfWriter { inner }
    }
}

impl<S: Write + Send> PacketWriter for SfWriter<S> {
    fn write_packet(&mut self, packet: &[u8]) -> Result<()> {
        let len = u8::try_from(packet.len()).map_err(|_| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("packet of {} bytes is too long for a serial forwarder", packet.len()),
            )
        })?;
        self.inner.write_all(&[len])?;
        self.inner.write_all(packet)?;
        self.inner.flush()?;
        Ok(())
    }
}
