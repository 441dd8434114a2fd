//! HDLC-style framing used on the mote serial link.
//!
//! Every frame sits between two [`SYNC_BYTE`]s. Inside a frame, the sync and escape bytes are
//! replaced by [`ESCAPE_BYTE`] followed by the original byte XOR `0x20`. The unescaped frame is
//!
//! ```text
//! protocol:u8 [seq:u8] body... crc:u16le
//! ```
//!
//! where the CRC-16/CCITT covers everything before it and `seq` is only present for
//! [`P_ACK`] and [`P_PACKET_ACK`] frames.

use crc::{Crc, CRC_16_XMODEM};
use log::{debug, warn};

/// Delimits frames.
pub const SYNC_BYTE: u8 = 0x7e;
/// Introduces an escaped byte.
pub const ESCAPE_BYTE: u8 = 0x7d;
/// Largest unescaped frame accepted, protocol byte and CRC included.
pub const MTU: usize = 256;

/// Acknowledges a [`P_PACKET_ACK`] frame with the same sequence number.
pub const P_ACK: u8 = 0x43;
/// A packet the receiver has to acknowledge.
pub const P_PACKET_ACK: u8 = 0x44;
/// A packet that is not acknowledged.
pub const P_PACKET_NO_ACK: u8 = 0x45;
/// Sent by a mote in reply to a protocol byte it does not understand.
pub const P_UNKNOWN: u8 = 0xff;

// CRC-16/CCITT with polynomial 0x1021 and initial value 0.
const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Computes the CRC-16/CCITT (polynomial `0x1021`, initial value `0`) of `data`.
pub fn crc16(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Acknowledgement for the packet sent with `seq`.
    Ack {
        /// Sequence number being acknowledged.
        seq: u8,
    },
    /// A packet, with the sequence number to acknowledge if the sender asked for one.
    Packet {
        /// `Some` for [`P_PACKET_ACK`] frames, `None` for [`P_PACKET_NO_ACK`].
        seq: Option<u8>,
        /// Dispatch byte, header and payload.
        packet: Vec<u8>,
    },
    /// Any other protocol byte. The body is kept for diagnostics.
    Unknown {
        /// The protocol byte.
        protocol: u8,
        /// Everything between the protocol byte and the CRC.
        body: Vec<u8>,
    },
}

impl Frame {
    /// Returns the protocol byte this frame is sent with.
    pub fn protocol(&self) -> u8 {
        match self {
            Frame::Ack { .. } => P_ACK,
            Frame::Packet { seq: Some(_), .. } => P_PACKET_ACK,
            Frame::Packet { seq: None, .. } => P_PACKET_NO_ACK,
            Frame::Unknown { protocol, .. } => *protocol,
        }
    }

    /// Encodes the frame including both sync bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut raw = vec![self.protocol()];
        match self {
            Frame::Ack { seq } => raw.push(*seq),
            Frame::Packet { seq, packet } => {
                raw.extend(seq);
                raw.extend_from_slice(packet);
            }
            Frame::Unknown { body, .. } => raw.extend_from_slice(body),
        }
        let crc = crc16(&raw);
        raw.extend_from_slice(&crc.to_le_bytes());

        let mut framed = Vec::with_capacity(raw.len() + 2);
        framed.push(SYNC_BYTE);
        for byte in raw {
            if byte == SYNC_BYTE || byte == ESCAPE_BYTE {
                framed.push(ESCAPE_BYTE);
                framed.push(byte ^ 0x20);
            } else {
                framed.push(byte);
            }
        }
        framed.push(SYNC_BYTE);
        framed
    }

    /// Parses an unescaped frame whose CRC has already been checked and stripped.
    fn parse(raw: &[u8]) -> Option<Frame> {
        let (&protocol, rest) = raw.split_first()?;
        match protocol {
            P_ACK => rest.first().map(|&seq| Frame::Ack { seq }),
            P_PACKET_ACK => {
                let (&seq, packet) = rest.split_first()?;
                Some(Frame::Packet {
                    seq: Some(seq),
                    packet: packet.to_vec(),
                })
            }
            P_PACKET_NO_ACK => Some(Frame::Packet {
                seq: None,
                packet: rest.to_vec(),
            }),
            protocol => Some(Frame::Unknown {
                protocol,
                body: rest.to_vec(),
            }),
        }
    }
}

/// Incremental frame decoder.
///
/// Bytes arriving before the first sync byte are discarded. Frames that are too short, exceed
/// the [`MTU`] or fail the CRC check are dropped and decoding resumes at the next sync byte.
#[derive(Debug, Default)]
pub struct Deframer {
    buf: Vec<u8>,
    in_sync: bool,
    escaped: bool,
    overflowed: bool,
}

impl Deframer {
    /// Creates a decoder waiting for the first sync byte.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one byte, returning a frame when `byte` completes one.
    pub fn push(&mut self, byte: u8) -> Option<Frame> {
        if !self.in_sync {
            if byte == SYNC_BYTE {
                self.in_sync = true;
                self.reset();
            } else {
                debug!("discarding 0x{:02x} outside of a frame", byte);
            }
            return None;
        }

        match byte {
            SYNC_BYTE => {
                let frame = self.finish();
                self.reset();
                frame
            }
            ESCAPE_BYTE => {
                self.escaped = true;
                None
            }
            _ => {
                let byte = if self.escaped { byte ^ 0x20 } else { byte };
                self.escaped = false;
                if self.buf.len() < MTU {
                    self.buf.push(byte);
                } else {
                    self.overflowed = true;
                }
                None
            }
        }
    }

    /// Feeds a slice, collecting every frame completed by it.
    pub fn extend(&mut self, bytes: &[u8]) -> Vec<Frame> {
        bytes.iter().filter_map(|&byte| self.push(byte)).collect()
    }

    fn finish(&mut self) -> Option<Frame> {
        if self.buf.is_empty() {
            // back-to-back sync bytes
            return None;
        }
        if self.overflowed {
            warn!("dropping frame longer than {} bytes", MTU);
            return None;
        }
        if self.buf.len() < 3 {
            warn!("dropping truncated frame of {} bytes", self.buf.len());
            return None;
        }

        let (raw, crc) = self.buf.split_at(self.buf.len() - 2);
        let received = u16::from_le_bytes([crc[0], crc[1]]);
        let computed = crc16(raw);
        if received != computed {
            warn!(
                "dropping frame with bad crc (received 0x{:04x}, computed 0x{:04x})",
                received, computed
            );
            return None;
        }

        let frame = Frame::parse(raw);
        if frame.is_none() {
            warn!("dropping malformed frame with protocol 0x{:02x}", raw[0]);
        }
        frame
    }

    fn reset(&mut self) {
        self.buf.clear();
        self.escaped = false;
        self.overflowed = false;
    }
}
