use std::collections::VecDeque;
use std::io::{self, Read, Write};

use log::{debug, warn};

use super::{PacketReader, PacketWriter};
use crate::framing::{Deframer, Frame};
use crate::{Error, ErrorKind, Result};

/// Reads framed packets from a byte stream.
///
/// Packets that ask for an acknowledgement are acknowledged through `acker`, a second handle on
/// the same stream. Without one they are delivered unacknowledged.
#[derive(Debug)]
pub struct FramedReader<R, A> {
    inner: R,
    acker: Option<A>,
    deframer: Deframer,
    pending: VecDeque<Frame>,
    buf: [u8; 256],
}

impl<R: Read, A: Write> FramedReader<R, A> {
    /// Wraps `inner`, sending acknowledgements through `acker`.
    pub fn new(inner: R, acker: Option<A>) -> Self {
        FramedReader {
            inner,
            acker,
            deframer: Deframer::new(),
            pending: VecDeque::new(),
            buf: [0; 256],
        }
    }

    fn next_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(frame);
            }

            let n = match self.inner.read(&mut self.buf) {
                Ok(0) => return Err(Error::new(ErrorKind::Disconnected, "link closed by peer")),
                Ok(n) => n,
                // serial ports report idle lines as timeouts
                Err(ref e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                    ) =>
                {
                    continue
                }
                Err(e) => return Err(e.into()),
            };
            let frames = self.deframer.extend(&self.buf[..n]);
            self.pending.extend(frames);
        }
    }

    fn acknowledge(&mut self, seq: u8) -> Result<()> {
        match self.acker.as_mut() {
            Some(acker) => {
                acker.write_all(&Frame::Ack { seq }.encode())?;
                acker.flush()?;
                debug!("acknowledged packet {}", seq);
            }
            None => warn!("cannot acknowledge packet {}: link is read-only", seq),
        }
        Ok(())
    }
}

impl<R, A> PacketReader for FramedReader<R, A>
where
    R: Read + Send,
    A: Write + Send,
{
    fn read_packet(&mut self) -> Result<Vec<u8>> {
        loop {
            match self.next_frame()? {
                Frame::Packet { seq, packet } => {
                    // A failed ack must not drop a packet that arrived intact.
                    if let Some(seq) = seq {
                        if let Err(e) = self.acknowledge(seq) {
                            warn!("could not acknowledge packet {}: {}", seq, e);
                        }
                    }
                    return Ok(packet);
                }
                Frame::Ack { seq } => debug!("ignoring ack for packet {}", seq),
                Frame::Unknown { protocol, body } => {
                    debug!(
                        "ignoring frame with protocol 0x{:02x} ({} bytes)",
                        protocol,
                        body.len()
                    );
                }
            }
        }
    }
}

/// Writes packets as unacknowledged frames.
#[derive(Debug)]
pub struct FramedWriter<W> {
    inner: W,
}

impl<W: Write> FramedWriter<W> {
    /// Wraps `inner`.
    pub fn new(inner: W) -> Self {
        FramedWriter { inner }
    }
}

impl<W: Write + Send> PacketWriter for FramedWriter<W> {
    fn write_packet(&mut self, packet: &[u8]) -> Result<()> {
        let frame = Frame::Packet {
            seq: None,
            packet: packet.to_vec(),
        };
        self.inner.write_all(&frame.encode())?;
        self.inner.flush()?;
        Ok(())
    }
}
