//! Active message packets and the probe's own message type.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, ErrorKind, Result};

/// Dispatch byte of a serial active message packet.
pub const SERIAL_AM_DISPATCH: u8 = 0x00;

/// Active message type the probe firmware uses for [`RssiMsg`].
pub const AM_RSSI_MSG: u8 = 10;

/// Command id requesting an RSSI reading on the first channel.
pub const CMD_RSSI: u8 = 20;
/// Command id requesting an RSSI reading on the second channel.
pub const CMD_RSSI_ALT: u8 = 21;
/// Command id requesting bit and packet error rates on both channels.
pub const CMD_ERROR_RATE: u8 = 22;

/// Calibration offset between the raw RSSI register value and dBm.
pub const RSSI_OFFSET: i16 = 45;

/// A message that travels as the payload of an active message packet.
pub trait Message: Sized + Send {
    /// Serializes the message into a packet payload.
    fn encode(&self) -> Vec<u8>;

    /// Parses a packet payload.
    fn decode(payload: &[u8]) -> Result<Self>;
}

/// Header of a serial active message packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AmHeader {
    /// Destination node address.
    pub dest: u16,
    /// Source node address.
    pub src: u16,
    /// Payload length in bytes.
    pub length: u8,
    /// Active message group.
    pub group: u8,
    /// Active message type, used to dispatch the payload to its listeners.
    pub am_type: u8,
}

impl AmHeader {
    /// Size of the encoded header.
    pub const SIZE: usize = 7;

    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.dest.to_be_bytes());
        buf.extend_from_slice(&self.src.to_be_bytes());
        buf.push(self.length);
        buf.push(self.group);
        buf.push(self.am_type);
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(Error::new(
                ErrorKind::Protocol,
                format!("active message header needs 7 bytes, got {}", bytes.len()),
            ));
        }
        Ok(AmHeader {
            dest: u16::from_be_bytes([bytes[0], bytes[1]]),
            src: u16::from_be_bytes([bytes[2], bytes[3]]),
            length: bytes[4],
            group: bytes[5],
            am_type: bytes[6],
        })
    }
}

/// A serial active message packet: dispatch byte, header and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialPacket {
    /// Packet header. `length` always matches the payload.
    pub header: AmHeader,
    /// Message bytes.
    pub payload: Vec<u8>,
}

impl SerialPacket {
    /// Wraps `payload` into a packet for `dest`.
    ///
    /// Fails if the payload does not fit the one byte length field.
    pub fn new(dest: u16, group: u8, am_type: u8, payload: Vec<u8>) -> Result<Self> {
        let length = u8::try_from(payload.len()).map_err(|_| {
            Error::new(
                ErrorKind::InvalidInput,
                format!("payload of {} bytes exceeds 255", payload.len()),
            )
        })?;
        Ok(SerialPacket {
            header: AmHeader {
                dest,
                src: 0,
                length,
                group,
                am_type,
            },
            payload,
        })
    }

    /// Serializes the packet, starting with the dispatch byte.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + AmHeader::SIZE + self.payload.len());
        buf.push(SERIAL_AM_DISPATCH);
        self.header.encode_into(&mut buf);
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Parses a packet as delivered by a transport.
    ///
    /// Bytes beyond the length announced in the header are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (&dispatch, rest) = bytes
            .split_first()
            .ok_or_else(|| Error::new(ErrorKind::Protocol, "empty packet"))?;
        if dispatch != SERIAL_AM_DISPATCH {
            return Err(Error::new(
                ErrorKind::Protocol,
                format!("unsupported dispatch byte 0x{:02x}", dispatch),
            ));
        }

        let header = AmHeader::decode(rest)?;
        let body = &rest[AmHeader::SIZE..];
        let length = usize::from(header.length);
        if body.len() < length {
            return Err(Error::new(
                ErrorKind::Protocol,
                format!(
                    "packet announces {} payload bytes but carries {}",
                    length,
                    body.len()
                ),
            ));
        }

        Ok(SerialPacket {
            header,
            payload: body[..length].to_vec(),
        })
    }
}

/// Command and reply message exchanged with the probe firmware.
///
/// ```text
/// cmd_id:u8  fields:[u8; 4]  crc:u8
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RssiMsg {
    /// Selects the measurement.
    pub cmd_id: u8,
    /// Measurement values, meaning depends on `cmd_id`.
    pub fields: [u8; 4],
    /// Checksum maintained by the firmware. Left at zero on outgoing commands.
    pub crc: u8,
}

impl RssiMsg {
    /// Size of the encoded message.
    pub const SIZE: usize = 6;

    /// Creates a command message for `cmd_id`.
    pub fn command(cmd_id: u8) -> Self {
        RssiMsg {
            cmd_id,
            ..Default::default()
        }
    }

    /// Sets the command id, keeping the other fields.
    pub fn set_cmd_id(&mut self, cmd_id: u8) {
        self.cmd_id = cmd_id;
    }
}

impl Message for RssiMsg {
    fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.push(self.cmd_id);
        buf.extend_from_slice(&self.fields);
        buf.push(self.crc);
        buf
    }

    fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < Self::SIZE {
            return Err(Error::new(
                ErrorKind::Protocol,
                format!("RssiMsg needs {} bytes, got {}", Self::SIZE, payload.len()),
            ));
        }
        Ok(RssiMsg {
            cmd_id: payload[0],
            fields: [payload[1], payload[2], payload[3], payload[4]],
            crc: payload[5],
        })
    }
}

/// A measurement decoded from a reply.
///
/// The `Display` form is what ends up in the output file: decimal numbers without separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Measurement {
    /// Received signal strength, calibrated to dBm.
    Rssi {
        /// Signal strength in dBm.
        dbm: i16,
    },
    /// Error counters in reply order: BER and AER of channel 20, then BER and AER of channel 21.
    ErrorRate([u8; 4]),
}

impl Measurement {
    /// Decodes the measurement carried by `reply`.
    ///
    /// Returns `None` for command ids without a measurement.
    pub fn from_reply(reply: &RssiMsg) -> Option<Self> {
        match reply.cmd_id {
            CMD_RSSI | CMD_RSSI_ALT => Some(Measurement::Rssi {
                dbm: i16::from(reply.fields[0]) - RSSI_OFFSET,
            }),
            CMD_ERROR_RATE => Some(Measurement::ErrorRate(reply.fields)),
            _ => None,
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measurement::Rssi { dbm } => write!(f, "{}", dbm),
            Measurement::ErrorRate(fields) => {
                for field in fields {
                    write!(f, "{}", field)?;
                }
                Ok(())
            }
        }
    }
}
